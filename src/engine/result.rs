//! Aggregate counters and metrics of a finished run.

use std::collections::BTreeMap;

use crate::event::TrafficClass;
use crate::time::VirtualTime;

/// Frozen statistics of one run.
///
/// Built from the engine's terminal buckets once the arrival target is
/// reached. Ratios over empty denominators are reported as `0.0`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct RunResult {
    /// Pool capacity.
    pub server_count: usize,
    /// Servers reserved for handovers (0 for single-class runs).
    pub threshold: usize,
    /// Arrivals processed, per class.
    pub arrivals: BTreeMap<TrafficClass, u64>,
    /// Blocked arrivals, per class.
    pub blocked: BTreeMap<TrafficClass, u64>,
    /// Calls that completed service.
    pub departed: u64,
    /// Admitted calls still in service when the run stopped.
    pub in_service: u64,
    /// Logical clock at the last processed event.
    pub final_time: VirtualTime,
    /// Sum of service durations of departed calls.
    pub busy_time: f64,
    /// Handover weight of the aggregated blocking probability, if the run
    /// distinguishes handovers.
    pub handover_weight: Option<f64>,
}

impl RunResult {
    /// Arrivals processed across every class.
    pub fn arrivals_total(&self) -> u64 {
        self.arrivals.values().sum()
    }

    /// Arrivals processed for one class.
    pub fn arrivals_of(&self, class: TrafficClass) -> u64 {
        self.arrivals.get(&class).copied().unwrap_or(0)
    }

    /// Blocked arrivals across every class.
    pub fn blocked_total(&self) -> u64 {
        self.blocked.values().sum()
    }

    /// Blocked arrivals for one class.
    pub fn blocked_of(&self, class: TrafficClass) -> u64 {
        self.blocked.get(&class).copied().unwrap_or(0)
    }

    /// Fraction of `class` arrivals that were blocked.
    pub fn blocking_probability_for(&self, class: TrafficClass) -> f64 {
        ratio(self.blocked_of(class), self.arrivals_of(class))
    }

    /// Fraction of all arrivals that were blocked, ignoring class.
    pub fn overall_blocking_probability(&self) -> f64 {
        ratio(self.blocked_total(), self.arrivals_total())
    }

    /// New-call blocking probability (CBP).
    pub fn call_blocking_probability(&self) -> f64 {
        self.blocking_probability_for(TrafficClass::NewCall)
    }

    /// Handover failure probability (HFP).
    pub fn handover_failure_probability(&self) -> f64 {
        self.blocking_probability_for(TrafficClass::Handover)
    }

    /// The run's headline blocking probability.
    ///
    /// Single-class runs report `blocked / arrivals`. Handover-priority runs
    /// report the aggregated `ABP = CBP + weight × HFP`.
    pub fn blocking_probability(&self) -> f64 {
        match self.handover_weight {
            Some(weight) => {
                self.call_blocking_probability() + weight * self.handover_failure_probability()
            }
            None => self.overall_blocking_probability(),
        }
    }

    /// Summed service time of departed calls over elapsed logical time.
    ///
    /// Not divided by the server count: this is the mean number of busy
    /// servers, comparable with the offered load `λ/μ`.
    pub fn server_utilisation(&self) -> f64 {
        let elapsed = self.final_time.as_f64();
        if elapsed > 0.0 {
            self.busy_time / elapsed
        } else {
            0.0
        }
    }

    /// `arrivals == departed + blocked + in_service`.
    pub fn is_conserved(&self) -> bool {
        self.arrivals_total() == self.departed + self.blocked_total() + self.in_service
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(
        arrivals: &[(TrafficClass, u64)],
        blocked: &[(TrafficClass, u64)],
        weight: Option<f64>,
    ) -> RunResult {
        RunResult {
            server_count: 4,
            threshold: 1,
            arrivals: arrivals.iter().copied().collect(),
            blocked: blocked.iter().copied().collect(),
            departed: 0,
            in_service: 0,
            final_time: VirtualTime::new(100.0),
            busy_time: 250.0,
            handover_weight: weight,
        }
    }

    #[test]
    fn test_single_class_blocking() {
        let r = result(&[(TrafficClass::Single, 10)], &[(TrafficClass::Single, 2)], None);
        assert_eq!(r.blocking_probability(), 0.2);
        assert_eq!(r.blocking_probability_for(TrafficClass::Single), 0.2);
    }

    #[test]
    fn test_weighted_blocking() {
        let r = result(
            &[(TrafficClass::Handover, 10), (TrafficClass::NewCall, 20)],
            &[(TrafficClass::Handover, 1), (TrafficClass::NewCall, 4)],
            Some(10.0),
        );
        assert_eq!(r.call_blocking_probability(), 0.2);
        assert_eq!(r.handover_failure_probability(), 0.1);
        assert!((r.blocking_probability() - 1.2).abs() < 1e-12);
        assert!((r.overall_blocking_probability() - 5.0 / 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_arrival_class_is_zero() {
        let r = result(&[(TrafficClass::NewCall, 20)], &[(TrafficClass::NewCall, 4)], Some(10.0));
        assert_eq!(r.handover_failure_probability(), 0.0);
        assert_eq!(r.blocking_probability(), 0.2);

        let empty = result(&[], &[], None);
        assert_eq!(empty.blocking_probability(), 0.0);
    }

    #[test]
    fn test_utilisation() {
        let r = result(&[], &[], None);
        assert_eq!(r.server_utilisation(), 2.5);

        let mut idle = r.clone();
        idle.final_time = VirtualTime::ZERO;
        assert_eq!(idle.server_utilisation(), 0.0);
    }
}
