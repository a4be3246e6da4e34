//! Run entry points for the two loss systems.
//!
//! [`Mmcc`] and [`PriorityMmcc`] pair a validated configuration with the
//! matching admission policy and hand each run a fresh pool, queue and
//! variate stream.

use crate::config::{MmccConfig, PriorityConfig};
use crate::engine::{Engine, ReservedCapacity, RunResult, SingleClass};
use crate::error::SimResult;
use crate::variate::{SeededExponential, VariateSource};

// ── M/M/C/C ───────────────────────────────────────────────────────────

/// Single-class M/M/C/C loss system.
///
/// # Example
/// ```rust
/// use callsim::{Mmcc, MmccConfig};
///
/// let model = Mmcc::new(MmccConfig::default().with_seed(1)).unwrap();
/// let result = model.run(16, 1_000).unwrap();
/// assert_eq!(result.arrivals_total(), 1_000);
/// ```
#[derive(Debug, Clone)]
pub struct Mmcc {
    config: MmccConfig,
}

impl Mmcc {
    /// Validate `config` and build the model.
    pub fn new(config: MmccConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Mmcc { config })
    }

    /// The model's configuration.
    pub fn config(&self) -> &MmccConfig {
        &self.config
    }

    /// Build an engine over a caller-supplied variate source.
    pub fn engine<V: VariateSource>(
        &self,
        server_count: u32,
        arrival_target: u64,
        variates: V,
    ) -> SimResult<Engine<SingleClass, V>> {
        Engine::new(
            SingleClass,
            self.config.rates()?,
            server_count,
            arrival_target,
            variates,
        )
    }

    /// Run with the configured seed.
    pub fn run(&self, server_count: u32, arrival_target: u64) -> SimResult<RunResult> {
        self.run_with(
            server_count,
            arrival_target,
            SeededExponential::new(self.config.seed),
        )
    }

    /// Run over a caller-supplied variate source.
    pub fn run_with<V: VariateSource>(
        &self,
        server_count: u32,
        arrival_target: u64,
        variates: V,
    ) -> SimResult<RunResult> {
        self.engine(server_count, arrival_target, variates)?.run()
    }
}

// ── M1/M2/M/C/C ───────────────────────────────────────────────────────

/// Two-class loss system with capacity reserved for handovers.
#[derive(Debug, Clone)]
pub struct PriorityMmcc {
    config: PriorityConfig,
}

impl PriorityMmcc {
    /// Validate `config` and build the model.
    pub fn new(config: PriorityConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(PriorityMmcc { config })
    }

    /// The model's configuration.
    pub fn config(&self) -> &PriorityConfig {
        &self.config
    }

    /// Build an engine over a caller-supplied variate source.
    pub fn engine<V: VariateSource>(
        &self,
        server_count: u32,
        arrival_target: u64,
        threshold: usize,
        variates: V,
    ) -> SimResult<Engine<ReservedCapacity, V>> {
        let policy = ReservedCapacity::new(threshold).with_handover_weight(self.config.weight()?);
        Engine::new(
            policy,
            self.config.rates()?,
            server_count,
            arrival_target,
            variates,
        )
    }

    /// Run with the configured seed.
    pub fn run(
        &self,
        server_count: u32,
        arrival_target: u64,
        threshold: usize,
    ) -> SimResult<RunResult> {
        self.run_with(
            server_count,
            arrival_target,
            threshold,
            SeededExponential::new(self.config.seed),
        )
    }

    /// Run over a caller-supplied variate source.
    pub fn run_with<V: VariateSource>(
        &self,
        server_count: u32,
        arrival_target: u64,
        threshold: usize,
        variates: V,
    ) -> SimResult<RunResult> {
        self.engine(server_count, arrival_target, threshold, variates)?
            .run()
    }
}
