//! Admission policies.
//!
//! The engine is one loop parameterised by an [`AdmissionPolicy`]; the
//! single-class and handover-priority models differ only in which traffic
//! classes they seed and in how they answer `should_admit`.

use crate::config::DEFAULT_HANDOVER_WEIGHT;
use crate::error::{SimError, SimResult};
use crate::event::{Event, TrafficClass};
use crate::server::ServerPool;

/// Decides whether an arriving call gets a server.
///
/// # Contract
///
/// Implementations **must**:
/// - Be pure functions of the event and the pool state.
/// - Only return `true` when `pool.is_free()`.
/// - Declare at least one class in `classes`, each with a configured rate.
pub trait AdmissionPolicy {
    /// Traffic classes seeded at run start, in seeding order.
    fn classes(&self) -> &[TrafficClass];

    /// Whether `event` may take a server from `pool` right now.
    fn should_admit(&self, event: &Event, pool: &ServerPool) -> bool;

    /// Servers held back for priority traffic. Defaults to none.
    fn reserved(&self) -> usize {
        0
    }

    /// Weight of handover failures in the aggregated blocking probability,
    /// for policies that distinguish handovers.
    fn handover_weight(&self) -> Option<f64> {
        None
    }

    /// Reject pool sizes this policy cannot work with.
    fn validate(&self, _servers: usize) -> SimResult<()> {
        if self.classes().is_empty() {
            return Err(SimError::EmptyClassSet);
        }
        Ok(())
    }
}

// ── Single class ──────────────────────────────────────────────────────

/// M/M/C/C admission: admit whenever a server is free.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SingleClass;

impl AdmissionPolicy for SingleClass {
    fn classes(&self) -> &[TrafficClass] {
        &[TrafficClass::Single]
    }

    fn should_admit(&self, _event: &Event, pool: &ServerPool) -> bool {
        pool.is_free()
    }
}

// ── Reserved capacity ────────────────────────────────────────────────

/// M1/M2/M/C/C admission with `threshold` servers reserved for handovers.
///
/// Any call is admitted while `busy < capacity - threshold`. Past that
/// point only handovers are admitted, and only while a server is free.
/// Runs report `CBP + weight × HFP`, with the weight defaulting to
/// [`DEFAULT_HANDOVER_WEIGHT`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReservedCapacity {
    threshold: usize,
    weight: f64,
}

impl ReservedCapacity {
    /// Reserve `threshold` servers for handover traffic.
    pub fn new(threshold: usize) -> Self {
        ReservedCapacity {
            threshold,
            weight: DEFAULT_HANDOVER_WEIGHT,
        }
    }

    /// Sets the handover weight.
    pub fn with_handover_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Number of reserved servers.
    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

impl AdmissionPolicy for ReservedCapacity {
    fn classes(&self) -> &[TrafficClass] {
        &[TrafficClass::Handover, TrafficClass::NewCall]
    }

    fn should_admit(&self, event: &Event, pool: &ServerPool) -> bool {
        let general = pool.capacity().saturating_sub(self.threshold);
        if pool.busy_count() < general && pool.is_free() {
            return true;
        }
        event.class() == TrafficClass::Handover && pool.is_free()
    }

    fn reserved(&self) -> usize {
        self.threshold
    }

    fn handover_weight(&self) -> Option<f64> {
        Some(self.weight)
    }

    fn validate(&self, servers: usize) -> SimResult<()> {
        if !(self.weight.is_finite() && self.weight >= 0.0) {
            return Err(SimError::NegativeWeight(self.weight));
        }
        if self.threshold >= servers {
            return Err(SimError::ThresholdTooLarge {
                threshold: self.threshold,
                servers,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventId;
    use crate::time::VirtualTime;

    fn call(class: TrafficClass) -> Event {
        Event::with_times(EventId::new(0), class, VirtualTime::ZERO, VirtualTime::new(1.0))
    }

    fn pool_with_busy(capacity: u32, busy: usize) -> ServerPool {
        let mut pool = ServerPool::new(capacity);
        for _ in 0..busy {
            pool.allocate().unwrap();
        }
        pool
    }

    #[test]
    fn test_single_class_admits_while_free() {
        let policy = SingleClass;
        let single = call(TrafficClass::Single);
        assert!(policy.should_admit(&single, &pool_with_busy(2, 1)));
        assert!(!policy.should_admit(&single, &pool_with_busy(2, 2)));
        assert!(!policy.should_admit(&single, &ServerPool::new(0)));
    }

    #[test]
    fn test_reserved_capacity_carve_out() {
        // N = 4, threshold = 1, 3 busy: general capacity is used up.
        let policy = ReservedCapacity::new(1);
        let pool = pool_with_busy(4, 3);
        assert_eq!(pool.free_count(), 1);
        assert!(!policy.should_admit(&call(TrafficClass::NewCall), &pool));
        assert!(policy.should_admit(&call(TrafficClass::Handover), &pool));
    }

    #[test]
    fn test_reserved_capacity_general_phase() {
        let policy = ReservedCapacity::new(1);
        let pool = pool_with_busy(4, 2);
        assert!(policy.should_admit(&call(TrafficClass::NewCall), &pool));
        assert!(policy.should_admit(&call(TrafficClass::Handover), &pool));
    }

    #[test]
    fn test_reserved_capacity_full_pool() {
        let policy = ReservedCapacity::new(1);
        let pool = pool_with_busy(4, 4);
        assert!(!policy.should_admit(&call(TrafficClass::NewCall), &pool));
        assert!(!policy.should_admit(&call(TrafficClass::Handover), &pool));
    }

    #[test]
    fn test_zero_threshold_matches_single_class() {
        let reserved = ReservedCapacity::new(0);
        for busy in 0..=3 {
            let pool = pool_with_busy(3, busy);
            let expect = SingleClass.should_admit(&call(TrafficClass::Single), &pool);
            assert_eq!(reserved.should_admit(&call(TrafficClass::NewCall), &pool), expect);
            assert_eq!(reserved.should_admit(&call(TrafficClass::Handover), &pool), expect);
        }
    }

    #[test]
    fn test_threshold_validation() {
        assert_eq!(
            ReservedCapacity::new(4).validate(4),
            Err(SimError::ThresholdTooLarge { threshold: 4, servers: 4 })
        );
        assert!(ReservedCapacity::new(3).validate(4).is_ok());
        assert!(ReservedCapacity::new(0).validate(0).is_err());
        assert!(SingleClass.validate(0).is_ok());
    }

    #[test]
    fn test_policy_classes() {
        assert_eq!(SingleClass.classes(), &[TrafficClass::Single]);
        assert_eq!(
            ReservedCapacity::new(2).classes(),
            &[TrafficClass::Handover, TrafficClass::NewCall]
        );
        assert_eq!(ReservedCapacity::new(2).reserved(), 2);
        assert_eq!(SingleClass.reserved(), 0);
    }

    #[test]
    fn test_handover_weight_defaults() {
        assert_eq!(SingleClass.handover_weight(), None);
        assert_eq!(
            ReservedCapacity::new(1).handover_weight(),
            Some(DEFAULT_HANDOVER_WEIGHT)
        );
        let weighted = ReservedCapacity::new(1).with_handover_weight(3.0);
        assert_eq!(weighted.handover_weight(), Some(3.0));
        assert_eq!(
            ReservedCapacity::new(1).with_handover_weight(-2.0).validate(4),
            Err(SimError::NegativeWeight(-2.0))
        );
    }
}
