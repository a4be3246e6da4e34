/// Time-ordered event queue with terminal outcome buckets.
///
/// Pending events sit in a `BinaryHeap` keyed by `(current_time, seq)`,
/// where `seq` is the insertion sequence number. The reversed `Ord` turns
/// the max-heap into a min-heap, and `seq` makes ties pop in insertion
/// order so two runs with the same inputs always dispatch identically.
///
/// Events leave the heap exactly once, into either the departed list or
/// the blocked bucket of their traffic class.
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use crate::error::{SimError, SimResult};
use crate::event::{Event, EventKind, TrafficClass};
use crate::time::VirtualTime;

/// Heap entry: an event plus its insertion sequence number.
#[derive(Debug)]
struct Pending {
    at: VirtualTime,
    seq: u64,
    event: Event,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Ordering: smallest `(at, seq)` first.
impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse so that BinaryHeap pops the *smallest* key first.
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Pending events plus the departed and blocked buckets of one run.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: BinaryHeap<Pending>,
    next_seq: u64,
    departed: Vec<Event>,
    blocked: BTreeMap<TrafficClass, Vec<Event>>,
}

impl EventQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        EventQueue::default()
    }

    /// Insert an event keyed by its `current_time()`.
    pub fn insert(&mut self, event: Event) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Pending {
            at: event.current_time(),
            seq,
            event,
        });
    }

    /// Remove and return the earliest pending event.
    pub fn pop_earliest(&mut self) -> SimResult<Event> {
        self.pending
            .pop()
            .map(|p| p.event)
            .ok_or(SimError::QueueEmpty)
    }

    /// Append a finished event to the departed bucket.
    pub fn record_departed(&mut self, event: Event) {
        self.departed.push(event);
    }

    /// Append a refused event to the blocked bucket of its class.
    pub fn record_blocked(&mut self, event: Event) {
        self.blocked.entry(event.class()).or_default().push(event);
    }

    /// Number of pending events.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending events that are admitted calls still in service.
    pub fn in_service(&self) -> usize {
        self.pending
            .iter()
            .filter(|p| p.event.kind() == EventKind::Departure)
            .count()
    }

    /// Events that completed service.
    pub fn departed(&self) -> &[Event] {
        &self.departed
    }

    /// Blocked events of one class.
    pub fn blocked(&self, class: TrafficClass) -> &[Event] {
        self.blocked.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Blocked events across every class.
    pub fn blocked_total(&self) -> usize {
        self.blocked.values().map(Vec::len).sum()
    }

    /// Sum of service durations of every departed event.
    pub fn departed_service_time(&self) -> f64 {
        self.departed.iter().map(Event::service_duration).sum()
    }

    /// Drain all pending events in dispatch order.
    /// Terminal buckets are left untouched.
    pub fn drain_ordered(&mut self) -> Vec<Event> {
        let mut events = Vec::with_capacity(self.pending.len());
        while let Some(p) = self.pending.pop() {
            events.push(p.event);
        }
        events
    }
}
