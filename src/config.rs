//! Run configuration.
//!
//! Rates live in explicit configuration structs handed to each model; there
//! are no process-wide mutable parameters. Every struct validates itself
//! before a run starts and never clamps a bad value.

use std::collections::BTreeMap;

use crate::error::{SimError, SimResult};
use crate::event::TrafficClass;

/// Default single-class and per-class arrival rate.
pub const DEFAULT_ARRIVAL_RATE: f64 = 0.1;
/// Default service (departure) rate.
pub const DEFAULT_DEPARTURE_RATE: f64 = 0.01;
/// Default cost of a dropped handover relative to a blocked new call.
pub const DEFAULT_HANDOVER_WEIGHT: f64 = 10.0;

/// Largest accepted mean duration `1 / rate`. Keeps exponential draws and
/// their running sums far from `f64` overflow.
pub const MAX_MEAN_DURATION: f64 = 1e100;

fn check_rate(name: &'static str, value: f64) -> SimResult<f64> {
    if !(value.is_finite() && value > 0.0) {
        tracing::debug!(name, value, "rejecting rate");
        return Err(SimError::NonPositiveRate { name, value });
    }
    if 1.0 / value > MAX_MEAN_DURATION {
        tracing::debug!(name, value, "rejecting rate");
        return Err(SimError::RateOutOfRange {
            name,
            value,
            max_mean: MAX_MEAN_DURATION,
        });
    }
    Ok(value)
}

// ── Class rates ───────────────────────────────────────────────────────

/// Validated arrival rate per traffic class plus the shared departure rate.
///
/// Deserialization goes through [`RawClassRates`] and the same checks as
/// [`ClassRates::new`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(try_from = "RawClassRates"))]
pub struct ClassRates {
    arrival: BTreeMap<TrafficClass, f64>,
    departure: f64,
}

impl ClassRates {
    /// Build rates from `(class, arrival_rate)` pairs.
    pub fn new(
        arrivals: impl IntoIterator<Item = (TrafficClass, f64)>,
        departure_rate: f64,
    ) -> SimResult<Self> {
        let departure = check_rate("departure_rate", departure_rate)?;
        let mut arrival = BTreeMap::new();
        for (class, rate) in arrivals {
            arrival.insert(class, check_rate("arrival_rate", rate)?);
        }
        Ok(ClassRates { arrival, departure })
    }

    /// Arrival rate of `class`.
    pub fn arrival(&self, class: TrafficClass) -> SimResult<f64> {
        self.arrival
            .get(&class)
            .copied()
            .ok_or(SimError::UnknownClass(class))
    }

    /// Departure rate shared by every class.
    pub fn departure(&self) -> f64 {
        self.departure
    }
}

/// Unchecked class rates, as read from a configuration file.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Deserialize))]
pub struct RawClassRates {
    /// Arrival rate per class.
    pub arrival: BTreeMap<TrafficClass, f64>,
    /// Shared departure rate.
    pub departure: f64,
}

impl TryFrom<RawClassRates> for ClassRates {
    type Error = SimError;

    fn try_from(raw: RawClassRates) -> SimResult<Self> {
        ClassRates::new(raw.arrival, raw.departure)
    }
}

// ── M/M/C/C ───────────────────────────────────────────────────────────

/// Configuration for a single-class M/M/C/C run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct MmccConfig {
    /// Rate of the arrival stream.
    pub arrival_rate: f64,
    /// Service completion rate per busy server.
    pub departure_rate: f64,
    /// Seed for the variate stream.
    pub seed: u64,
}

impl Default for MmccConfig {
    fn default() -> Self {
        MmccConfig {
            arrival_rate: DEFAULT_ARRIVAL_RATE,
            departure_rate: DEFAULT_DEPARTURE_RATE,
            seed: 0,
        }
    }
}

impl MmccConfig {
    /// Sets the arrival rate.
    pub fn with_arrival_rate(mut self, rate: f64) -> Self {
        self.arrival_rate = rate;
        self
    }

    /// Sets the departure rate.
    pub fn with_departure_rate(mut self, rate: f64) -> Self {
        self.departure_rate = rate;
        self
    }

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check every rate.
    pub fn validate(&self) -> SimResult<()> {
        self.rates().map(|_| ())
    }

    /// Validated class rates for the engine.
    pub fn rates(&self) -> SimResult<ClassRates> {
        ClassRates::new([(TrafficClass::Single, self.arrival_rate)], self.departure_rate)
    }
}

// ── M1/M2/M/C/C ───────────────────────────────────────────────────────

/// Configuration for a two-class handover-priority run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct PriorityConfig {
    /// Rate of the handover stream.
    pub handover_rate: f64,
    /// Rate of the new-call stream.
    pub newcall_rate: f64,
    /// Service completion rate per busy server.
    pub departure_rate: f64,
    /// Weight of handover failure in the aggregated blocking probability.
    pub handover_weight: f64,
    /// Seed for the variate stream.
    pub seed: u64,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        PriorityConfig {
            handover_rate: DEFAULT_ARRIVAL_RATE,
            newcall_rate: DEFAULT_ARRIVAL_RATE,
            departure_rate: DEFAULT_DEPARTURE_RATE,
            handover_weight: DEFAULT_HANDOVER_WEIGHT,
            seed: 0,
        }
    }
}

impl PriorityConfig {
    /// Sets the handover arrival rate.
    pub fn with_handover_rate(mut self, rate: f64) -> Self {
        self.handover_rate = rate;
        self
    }

    /// Sets the new-call arrival rate.
    pub fn with_newcall_rate(mut self, rate: f64) -> Self {
        self.newcall_rate = rate;
        self
    }

    /// Sets the departure rate.
    pub fn with_departure_rate(mut self, rate: f64) -> Self {
        self.departure_rate = rate;
        self
    }

    /// Sets the handover weight used by the aggregated blocking probability.
    pub fn with_handover_weight(mut self, weight: f64) -> Self {
        self.handover_weight = weight;
        self
    }

    /// Sets the seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check every rate and the weight.
    pub fn validate(&self) -> SimResult<()> {
        self.rates()?;
        self.weight().map(|_| ())
    }

    /// Validated handover weight.
    pub fn weight(&self) -> SimResult<f64> {
        if self.handover_weight.is_finite() && self.handover_weight >= 0.0 {
            Ok(self.handover_weight)
        } else {
            Err(SimError::NegativeWeight(self.handover_weight))
        }
    }

    /// Validated class rates for the engine.
    pub fn rates(&self) -> SimResult<ClassRates> {
        let handover = check_rate("handover_rate", self.handover_rate)?;
        let newcall = check_rate("newcall_rate", self.newcall_rate)?;
        ClassRates::new(
            [
                (TrafficClass::Handover, handover),
                (TrafficClass::NewCall, newcall),
            ],
            self.departure_rate,
        )
    }
}
