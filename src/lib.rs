//! # Callsim: Deterministic Loss-System Simulator
//!
//! A discrete-event simulator for the M/M/C/C loss system and its
//! two-class M1/M2/M/C/C variant, where a few servers are reserved for
//! handover calls. No threads, no wall-clock time: every run is a pure
//! function of its configuration and seed.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────┐
//! │   Mmcc / PriorityMmcc          │ ← validated config, one run per call
//! │  ┌──────────────────────────┐  │
//! │  │       Engine             │  │ ← event loop + AdmissionPolicy
//! │  │  ┌────────────────────┐  │  │
//! │  │  │  EventQueue        │  │  │ ← min-heap + departed/blocked buckets
//! │  │  └────────────────────┘  │  │
//! │  │  ┌────────────────────┐  │  │
//! │  │  │  ServerPool        │  │  │ ← free/busy server ids
//! │  │  └────────────────────┘  │  │
//! │  │  ┌────────────────────┐  │  │
//! │  │  │  Event             │  │  │ ← arrival → departure record
//! │  │  └────────────────────┘  │  │
//! │  │  ┌────────────────────┐  │  │
//! │  │  │  VariateSource     │  │  │ ← seeded exponential draws
//! │  │  └────────────────────┘  │  │
//! │  └──────────────────────────┘  │
//! └────────────────────────────────┘
//! ```
//!
//! [`analytic`] holds the closed-form expectations and [`sweep`] runs a
//! model over a grid of rates.

pub mod analytic;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod model;
pub mod queue;
pub mod server;
pub mod sweep;
pub mod time;
pub mod trace;
pub mod variate;

// Re-exports for convenience.
pub use config::{ClassRates, MmccConfig, PriorityConfig};
pub use engine::{
    AdmissionPolicy, Disposition, Engine, ReservedCapacity, RunResult, SingleClass, StepOutcome,
};
pub use error::{SimError, SimResult};
pub use event::{Event, EventId, EventIdGen, EventKind, TrafficClass};
pub use model::{Mmcc, PriorityMmcc};
pub use queue::EventQueue;
pub use server::{ServerId, ServerPool};
pub use sweep::SweepPoint;
pub use time::VirtualTime;
pub use trace::RunTrace;
pub use variate::{FixedVariate, ScriptedVariate, SeededExponential, VariateSource};
