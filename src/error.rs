//! Structured error types for the loss-system simulator.
//!
//! All fallible public APIs return `Result<T, SimError>`. Configuration
//! errors are reported before a run starts; invariant violations abort the
//! run they occur in and are never absorbed by the engine.

use crate::event::{EventId, TrafficClass};
use crate::server::ServerId;

/// The top-level error type for the simulator.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SimError {
    // ── Configuration errors ──────────────────────────────

    /// A rate parameter was zero, negative, or not finite.
    #[error("{name} must be a positive finite rate, got {value}")]
    NonPositiveRate {
        /// Which rate was rejected.
        name: &'static str,
        /// The offending value.
        value: f64,
    },

    /// A positive rate so small that its mean duration overflows logical
    /// time.
    #[error("{name} of {value} is too small: mean duration exceeds {max_mean:e}")]
    RateOutOfRange {
        /// Which rate was rejected.
        name: &'static str,
        /// The offending value.
        value: f64,
        /// Largest accepted mean duration `1 / rate`.
        max_mean: f64,
    },

    /// The reserved threshold leaves no general capacity.
    #[error("threshold {threshold} must be smaller than the server count {servers}")]
    ThresholdTooLarge {
        /// Servers requested for handover-only use.
        threshold: usize,
        /// Total pool capacity.
        servers: usize,
    },

    /// The handover loss weight was negative or not finite.
    #[error("handover weight must be a non-negative finite number, got {0}")]
    NegativeWeight(f64),

    /// An admission policy declared no traffic classes to seed.
    #[error("admission policy declares no traffic classes")]
    EmptyClassSet,

    /// A sweep grid could not be built.
    #[error("invalid sweep: {0}")]
    InvalidSweep(String),

    // ── Invariant violations ──────────────────────────────

    /// `allocate` was called with no free server.
    #[error("no free server to allocate")]
    CapacityExhausted,

    /// `deallocate` was called for a server that is not busy.
    #[error("server {0} is not currently busy")]
    UnknownServer(ServerId),

    /// An event was promoted to a departure twice.
    #[error("event {0} has already been promoted to a departure")]
    AlreadyPromoted(EventId),

    /// The assigned server was read before promotion.
    #[error("event {0} has no assigned server")]
    NotPromoted(EventId),

    /// The event queue ran dry while arrivals were still expected.
    #[error("event queue is empty")]
    QueueEmpty,

    /// No arrival rate is configured for a traffic class.
    #[error("no arrival rate configured for class {0}")]
    UnknownClass(TrafficClass),

    /// An event reached the head of the queue with a non-finite time.
    #[error("event {0} has a non-finite time")]
    NonFiniteTime(EventId),
}

impl SimError {
    /// Returns `true` for errors that indicate a broken engine invariant
    /// rather than a bad configuration.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            SimError::CapacityExhausted
                | SimError::UnknownServer(_)
                | SimError::AlreadyPromoted(_)
                | SimError::NotPromoted(_)
                | SimError::QueueEmpty
                | SimError::UnknownClass(_)
                | SimError::NonFiniteTime(_)
        )
    }
}

/// Convenience alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;
