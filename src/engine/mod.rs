//! The event-driven loss-system engine.
//!
//! One loop drives both models: pop the earliest event, advance the logical
//! clock, and either admit/block an arrival (renewing its class's arrival
//! stream) or release the server of a departure. The admission rule comes
//! from an [`AdmissionPolicy`].
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`policy`] | [`AdmissionPolicy`], [`SingleClass`], [`ReservedCapacity`] |
//! | [`result`] | [`RunResult`] |

pub mod policy;
pub mod result;

use std::collections::BTreeMap;

use crate::config::ClassRates;
use crate::error::{SimError, SimResult};
use crate::event::{Event, EventId, EventIdGen, EventKind, TrafficClass};
use crate::queue::EventQueue;
use crate::server::{ServerId, ServerPool};
use crate::time::VirtualTime;
use crate::trace::{Checkpoint, RunTrace};
use crate::variate::VariateSource;

pub use policy::{AdmissionPolicy, ReservedCapacity, SingleClass};
pub use result::RunResult;

// ── Step outcome ──────────────────────────────────────────────────────

/// What happened to the event processed by one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Disposition {
    /// Arrival admitted onto the given server.
    Admitted(ServerId),
    /// Arrival refused.
    Blocked,
    /// Call finished and released the given server.
    Departed(ServerId),
}

/// Result of processing one event.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct StepOutcome {
    /// The processed event.
    pub event: EventId,
    /// Its traffic class.
    pub class: TrafficClass,
    /// Logical time it was processed at.
    pub time: VirtualTime,
    /// What happened to it.
    pub disposition: Disposition,
}

// ── Engine ────────────────────────────────────────────────────────────

/// A single run of a loss system.
///
/// Owns its pool, queue and variate stream exclusively; nothing is shared
/// between runs. Construct with [`Engine::new`], then call [`Engine::run`]
/// or drive it with [`Engine::step`].
#[derive(Debug)]
pub struct Engine<P, V> {
    policy: P,
    rates: ClassRates,
    variates: V,
    pool: ServerPool,
    queue: EventQueue,
    ids: EventIdGen,
    clock: VirtualTime,
    arrivals: BTreeMap<TrafficClass, u64>,
    arrivals_total: u64,
    arrival_target: u64,
    events_processed: u64,
    seeded: bool,
    handover_weight: Option<f64>,
    trace: Option<RunTrace>,
}

impl<P: AdmissionPolicy, V: VariateSource> Engine<P, V> {
    /// Create an engine for `server_count` servers that stops after
    /// `arrival_target` arrivals.
    ///
    /// Fails if the policy rejects the pool size or if a policy class has
    /// no configured arrival rate.
    pub fn new(
        policy: P,
        rates: ClassRates,
        server_count: u32,
        arrival_target: u64,
        variates: V,
    ) -> SimResult<Self> {
        policy.validate(server_count as usize)?;
        for class in policy.classes() {
            rates.arrival(*class)?;
        }
        let arrivals = policy.classes().iter().map(|c| (*c, 0)).collect();
        let handover_weight = policy.handover_weight();
        Ok(Engine {
            policy,
            rates,
            variates,
            pool: ServerPool::new(server_count),
            queue: EventQueue::new(),
            ids: EventIdGen::new(),
            clock: VirtualTime::ZERO,
            arrivals,
            arrivals_total: 0,
            arrival_target,
            events_processed: 0,
            seeded: false,
            handover_weight,
            trace: None,
        })
    }

    /// Record every processed event.
    pub fn with_trace(mut self) -> Self {
        self.trace = Some(RunTrace::new());
        self
    }

    /// Record every processed event and snapshot every `n` events.
    pub fn with_checkpoints(mut self, n: u64) -> Self {
        self.trace = Some(RunTrace::with_checkpoint_interval(n));
        self
    }

    /// Current logical time.
    pub fn clock(&self) -> VirtualTime {
        self.clock
    }

    /// Arrivals processed so far across every class.
    pub fn arrivals_total(&self) -> u64 {
        self.arrivals_total
    }

    /// Total events processed so far.
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// The server pool.
    pub fn pool(&self) -> &ServerPool {
        &self.pool
    }

    /// The event queue and its terminal buckets.
    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// The recorded trace, if tracing is enabled.
    pub fn trace(&self) -> Option<&RunTrace> {
        self.trace.as_ref()
    }

    /// Take the recorded trace out of the engine.
    pub fn take_trace(&mut self) -> Option<RunTrace> {
        self.trace.take()
    }

    /// Returns `true` once the arrival target has been reached.
    pub fn is_finished(&self) -> bool {
        self.arrivals_total >= self.arrival_target
    }

    /// Draw a fresh arrival of `class` after `at`.
    fn draw_arrival(&mut self, class: TrafficClass, at: VirtualTime) -> SimResult<Event> {
        let arrival_rate = self.rates.arrival(class)?;
        let id = self.ids.next_id();
        Ok(Event::create(
            id,
            class,
            at,
            arrival_rate,
            self.rates.departure(),
            &mut self.variates,
        ))
    }

    /// Seed one arrival per class, shifted so the earliest lands on 0.
    fn seed(&mut self) -> SimResult<()> {
        let classes = self.policy.classes().to_vec();
        let mut seeds = Vec::with_capacity(classes.len());
        for class in classes {
            seeds.push(self.draw_arrival(class, VirtualTime::ZERO)?);
        }
        let start = seeds
            .iter()
            .map(Event::arrival_time)
            .min()
            .ok_or(SimError::EmptyClassSet)?;
        for mut event in seeds {
            event.rebase(start.as_f64());
            self.queue.insert(event);
        }
        self.seeded = true;
        tracing::debug!(
            servers = self.pool.capacity(),
            reserved = self.policy.reserved(),
            target = self.arrival_target,
            "seeded run"
        );
        Ok(())
    }

    /// Process one event.
    ///
    /// Returns `Ok(None)` once the arrival target has been reached; the
    /// queue is left as it was at that moment.
    pub fn step(&mut self) -> SimResult<Option<StepOutcome>> {
        if self.is_finished() {
            return Ok(None);
        }
        if !self.seeded {
            self.seed()?;
        }

        let mut event = self.queue.pop_earliest()?;
        let now = event.current_time();
        if !now.as_f64().is_finite() {
            return Err(SimError::NonFiniteTime(event.id()));
        }
        debug_assert!(now >= self.clock, "time went backward: {} -> {}", self.clock, now);
        self.clock = now;
        self.events_processed += 1;

        let class = event.class();
        let id = event.id();
        let disposition = match event.kind() {
            EventKind::Arrival => {
                self.arrivals_total += 1;
                *self.arrivals.entry(class).or_insert(0) += 1;

                let next = self.draw_arrival(class, now)?;
                self.queue.insert(next);

                if self.policy.should_admit(&event, &self.pool) {
                    let server = self.pool.allocate()?;
                    event.promote_to_departure(server)?;
                    self.queue.insert(event);
                    Disposition::Admitted(server)
                } else {
                    self.queue.record_blocked(event);
                    Disposition::Blocked
                }
            }
            EventKind::Departure => {
                let server = event.assigned_server()?;
                self.pool.deallocate(server)?;
                self.queue.record_departed(event);
                Disposition::Departed(server)
            }
        };

        let outcome = StepOutcome {
            event: id,
            class,
            time: now,
            disposition,
        };
        tracing::trace!(
            event = %id,
            %class,
            time = now.as_f64(),
            ?disposition,
            busy = self.pool.busy_count(),
            "processed event"
        );

        if let Some(trace) = self.trace.as_mut() {
            trace.record(outcome.clone());
            if trace.should_checkpoint(self.events_processed) {
                trace.add_checkpoint(Checkpoint::new(
                    self.events_processed,
                    now,
                    self.pool.busy_count() as u64,
                    self.queue.blocked_total() as u64,
                ));
            }
        }

        Ok(Some(outcome))
    }

    /// Run until the arrival target is reached.
    pub fn run(&mut self) -> SimResult<RunResult> {
        while self.step()?.is_some() {}
        let result = self.result();
        tracing::info!(
            arrivals = result.arrivals_total(),
            blocked = result.blocked_total(),
            departed = result.departed,
            in_service = result.in_service,
            final_time = result.final_time.as_f64(),
            "run finished"
        );
        Ok(result)
    }

    /// Snapshot the counters into a [`RunResult`].
    pub fn result(&self) -> RunResult {
        let blocked = self
            .arrivals
            .keys()
            .map(|class| (*class, self.queue.blocked(*class).len() as u64))
            .collect();
        RunResult {
            server_count: self.pool.capacity(),
            threshold: self.policy.reserved(),
            arrivals: self.arrivals.clone(),
            blocked,
            departed: self.queue.departed().len() as u64,
            in_service: self.queue.in_service() as u64,
            final_time: self.clock,
            busy_time: self.queue.departed_service_time(),
            handover_weight: self.handover_weight,
        }
    }
}
