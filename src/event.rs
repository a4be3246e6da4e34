/// Call events for the loss-system simulation.
///
/// Each `Event` is one customer: it carries both its arrival instant and its
/// (pre-drawn) departure instant. An event starts life as an `Arrival` and is
/// promoted exactly once to a `Departure` when a server is assigned to it.
use crate::error::{SimError, SimResult};
use crate::server::ServerId;
use crate::time::VirtualTime;
use crate::variate::VariateSource;

// ── Event ID ──────────────────────────────────────────────────────────

/// A per-run unique, strictly increasing event identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EventId(u64);

impl EventId {
    /// Wrap a raw u64 into an `EventId`.
    #[inline]
    pub fn new(raw: u64) -> Self {
        EventId(raw)
    }

    /// Return the raw value.
    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

// ── Event ID Generator ───────────────────────────────────────────────

/// Deterministic, strictly increasing event-ID generator.
///
/// Each engine owns exactly one of these.
#[derive(Debug, Clone, Default)]
pub struct EventIdGen {
    next: u64,
}

impl EventIdGen {
    /// Create a generator starting at 0.
    pub fn new() -> Self {
        EventIdGen { next: 0 }
    }

    /// Mint the next event ID.
    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next);
        self.next += 1;
        id
    }
}

// ── Traffic class ────────────────────────────────────────────────────

/// The traffic stream an event belongs to.
///
/// Single-class runs use [`TrafficClass::Single`] for every event; the
/// priority model splits traffic into handovers and new calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum TrafficClass {
    /// The one undifferentiated class of an M/M/C/C run.
    Single,
    /// High-priority calls that may use reserved capacity.
    Handover,
    /// Ordinary new calls, limited to general capacity.
    NewCall,
}

impl TrafficClass {
    /// Stable lowercase name, used in traces and CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            TrafficClass::Single => "single",
            TrafficClass::Handover => "handover",
            TrafficClass::NewCall => "newcall",
        }
    }
}

impl std::fmt::Display for TrafficClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Event kind ────────────────────────────────────────────────────────

/// Which instant of the event is currently relevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    /// Waiting to arrive; keyed by `arrival_time`.
    Arrival,
    /// Admitted and in service; keyed by `departure_time`.
    Departure,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Arrival => write!(f, "arrival"),
            EventKind::Departure => write!(f, "departure"),
        }
    }
}

// ── Event ─────────────────────────────────────────────────────────────

/// One customer moving through the system.
///
/// Invariant: `departure_time > arrival_time`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    id: EventId,
    class: TrafficClass,
    kind: EventKind,
    arrival_time: VirtualTime,
    departure_time: VirtualTime,
    assigned_server: Option<ServerId>,
}

impl Event {
    /// Draw a new arrival of `class` after logical time `at`.
    ///
    /// `arrival_time = at + Exp(arrival_rate)` and
    /// `departure_time = arrival_time + Exp(departure_rate)`.
    pub fn create<V: VariateSource + ?Sized>(
        id: EventId,
        class: TrafficClass,
        at: VirtualTime,
        arrival_rate: f64,
        departure_rate: f64,
        variates: &mut V,
    ) -> Self {
        let arrival_time = at.plus(variates.exponential(arrival_rate));
        let service = variates.exponential(departure_rate);
        Event::with_times(id, class, arrival_time, arrival_time.plus(service))
    }

    /// Build an arrival with explicit instants.
    ///
    /// A departure that does not fall strictly after the arrival (a zero
    /// draw, or one lost to rounding) is nudged to the next representable
    /// instant.
    pub fn with_times(
        id: EventId,
        class: TrafficClass,
        arrival_time: VirtualTime,
        departure_time: VirtualTime,
    ) -> Self {
        let departure_time = if departure_time > arrival_time {
            departure_time
        } else {
            arrival_time.next_after()
        };
        Event {
            id,
            class,
            kind: EventKind::Arrival,
            arrival_time,
            departure_time,
            assigned_server: None,
        }
    }

    /// Unique identifier within the run.
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Traffic class of this event.
    pub fn class(&self) -> TrafficClass {
        self.class
    }

    /// Current kind.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Instant the customer arrives.
    pub fn arrival_time(&self) -> VirtualTime {
        self.arrival_time
    }

    /// Instant the customer would leave if admitted.
    pub fn departure_time(&self) -> VirtualTime {
        self.departure_time
    }

    /// The instant relevant to the current kind.
    pub fn current_time(&self) -> VirtualTime {
        match self.kind {
            EventKind::Arrival => self.arrival_time,
            EventKind::Departure => self.departure_time,
        }
    }

    /// `departure_time - arrival_time`; always positive.
    pub fn service_duration(&self) -> f64 {
        self.departure_time.as_f64() - self.arrival_time.as_f64()
    }

    /// Turn this arrival into a departure served by `server`.
    pub fn promote_to_departure(&mut self, server: ServerId) -> SimResult<()> {
        if self.kind == EventKind::Departure || self.assigned_server.is_some() {
            return Err(SimError::AlreadyPromoted(self.id));
        }
        self.kind = EventKind::Departure;
        self.assigned_server = Some(server);
        Ok(())
    }

    /// The server recorded at promotion.
    pub fn assigned_server(&self) -> SimResult<ServerId> {
        self.assigned_server.ok_or(SimError::NotPromoted(self.id))
    }

    /// Shift both instants back by `offset`. Only used on seed arrivals,
    /// before they enter the queue.
    pub(crate) fn rebase(&mut self, offset: f64) {
        let service = self.service_duration();
        self.arrival_time = self.arrival_time.minus(offset);
        self.departure_time = self.arrival_time.plus(service);
        if self.departure_time <= self.arrival_time {
            self.departure_time = self.arrival_time.next_after();
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {} at {}",
            self.id,
            self.class,
            self.kind,
            self.current_time()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variate::{FixedVariate, ScriptedVariate, SeededExponential};

    fn arrival(id: u64, at: f64, dep: f64) -> Event {
        Event::with_times(
            EventId::new(id),
            TrafficClass::Single,
            VirtualTime::new(at),
            VirtualTime::new(dep),
        )
    }

    #[test]
    fn test_event_id_monotonic() {
        let mut gen = EventIdGen::new();
        let a = gen.next_id();
        let b = gen.next_id();
        assert_eq!(a.raw(), 0);
        assert_eq!(b.raw(), 1);
        assert!(a < b);
    }

    #[test]
    fn test_create_draws_both_instants() {
        let mut src = ScriptedVariate::new(vec![2.0, 5.0]);
        let e = Event::create(
            EventId::new(0),
            TrafficClass::Handover,
            VirtualTime::new(10.0),
            0.1,
            0.01,
            &mut src,
        );
        assert_eq!(e.arrival_time(), VirtualTime::new(12.0));
        assert_eq!(e.departure_time(), VirtualTime::new(17.0));
        assert_eq!(e.kind(), EventKind::Arrival);
        assert_eq!(e.class(), TrafficClass::Handover);
        assert_eq!(e.service_duration(), 5.0);
    }

    #[test]
    fn test_current_time_follows_kind() {
        let mut e = arrival(0, 1.0, 4.0);
        assert_eq!(e.current_time(), VirtualTime::new(1.0));
        e.promote_to_departure(ServerId::new(1)).unwrap();
        assert_eq!(e.current_time(), VirtualTime::new(4.0));
        assert_eq!(e.kind(), EventKind::Departure);
        assert_eq!(e.assigned_server().unwrap(), ServerId::new(1));
    }

    #[test]
    fn test_double_promotion_fails() {
        let mut e = arrival(3, 1.0, 2.0);
        e.promote_to_departure(ServerId::new(1)).unwrap();
        let err = e.promote_to_departure(ServerId::new(2)).unwrap_err();
        assert_eq!(err, SimError::AlreadyPromoted(EventId::new(3)));
        assert_eq!(e.assigned_server().unwrap(), ServerId::new(1));
    }

    #[test]
    fn test_assigned_server_before_promotion_fails() {
        let e = arrival(9, 1.0, 2.0);
        assert_eq!(e.assigned_server(), Err(SimError::NotPromoted(EventId::new(9))));
    }

    #[test]
    fn test_zero_service_is_nudged_positive() {
        let mut src = FixedVariate(0.0);
        let e = Event::create(
            EventId::new(0),
            TrafficClass::Single,
            VirtualTime::new(3.0),
            1.0,
            1.0,
            &mut src,
        );
        assert!(e.departure_time() > e.arrival_time());
        assert!(e.service_duration() > 0.0);
    }

    #[test]
    fn test_service_positive_for_random_draws() {
        let mut src = SeededExponential::new(11);
        let mut gen = EventIdGen::new();
        let mut at = VirtualTime::ZERO;
        for _ in 0..5_000 {
            let e = Event::create(gen.next_id(), TrafficClass::Single, at, 0.1, 0.01, &mut src);
            assert!(e.departure_time() > e.arrival_time());
            at = e.arrival_time();
        }
    }

    #[test]
    fn test_rebase_preserves_service() {
        let mut e = arrival(0, 7.5, 10.0);
        e.rebase(7.5);
        assert_eq!(e.arrival_time(), VirtualTime::ZERO);
        assert_eq!(e.departure_time(), VirtualTime::new(2.5));
    }

    #[test]
    fn test_display() {
        let e = arrival(42, 0.5, 1.0);
        assert_eq!(format!("{}", e), "E#42 single arrival at T=0.500000");
    }
}
