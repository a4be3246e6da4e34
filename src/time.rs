/// Logical time for the loss-system simulation.
///
/// Represents a point on the simulated time axis with no dependency on
/// `std::time`. Time advances only when the engine pops an event from the
/// queue, never from wall-clock observation.
use std::cmp::Ordering;

/// A logical instant in simulation time.
///
/// Wraps an `f64` but provides a total order (via `f64::total_cmp`) so it can
/// key the event heap. Only finite, non-negative values are produced by the
/// engine.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualTime(f64);

impl VirtualTime {
    /// The zero-point of simulation time.
    pub const ZERO: VirtualTime = VirtualTime(0.0);

    /// Create a new `VirtualTime` from a raw value.
    #[inline]
    pub fn new(t: f64) -> Self {
        VirtualTime(t)
    }

    /// Return the raw value.
    #[inline]
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// The instant `delta` after `self`.
    #[inline]
    pub fn plus(self, delta: f64) -> VirtualTime {
        VirtualTime(self.0 + delta)
    }

    /// The instant `delta` before `self`. Used to rebase seed events.
    #[inline]
    pub fn minus(self, delta: f64) -> VirtualTime {
        VirtualTime(self.0 - delta)
    }

    /// The smallest representable instant strictly after `self`.
    #[inline]
    pub fn next_after(self) -> VirtualTime {
        VirtualTime(self.0.next_up())
    }
}

impl PartialEq for VirtualTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VirtualTime {}

impl PartialOrd for VirtualTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VirtualTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T={:.6}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero() {
        assert_eq!(VirtualTime::ZERO.as_f64(), 0.0);
    }

    #[test]
    fn test_ordering() {
        let t1 = VirtualTime::new(1.5);
        let t2 = VirtualTime::new(2.25);
        assert!(t1 < t2);
        assert!(t2 > t1);
    }

    #[test]
    fn test_plus_and_minus() {
        let t = VirtualTime::new(10.0);
        assert_eq!(t.plus(2.5), VirtualTime::new(12.5));
        assert_eq!(t.minus(10.0), VirtualTime::ZERO);
    }

    #[test]
    fn test_next_after_is_strictly_later() {
        let t = VirtualTime::new(1e12);
        assert!(t < t.next_after());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", VirtualTime::new(0.5)), "T=0.500000");
    }
}
