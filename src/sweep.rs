//! Parameter sweeps over arrival rates.
//!
//! Each point gets a fresh model and a seed offset by its index, so points
//! are independent of one another yet the whole sweep is reproducible.

use crate::analytic;
use crate::config::{MmccConfig, PriorityConfig};
use crate::engine::RunResult;
use crate::error::{SimError, SimResult};
use crate::model::{Mmcc, PriorityMmcc};

/// `points` evenly spaced rates from `from` to `to` inclusive.
pub fn linspace(from: f64, to: f64, points: usize) -> SimResult<Vec<f64>> {
    check_grid(from, to, points)?;
    if points == 1 {
        return Ok(vec![from]);
    }
    let step = (to - from) / (points - 1) as f64;
    Ok((0..points).map(|i| from + step * i as f64).collect())
}

/// `points` geometrically spaced rates from `from` to `to` inclusive.
pub fn geomspace(from: f64, to: f64, points: usize) -> SimResult<Vec<f64>> {
    check_grid(from, to, points)?;
    if points == 1 {
        return Ok(vec![from]);
    }
    let ratio = (to / from).powf(1.0 / (points - 1) as f64);
    Ok((0..points).map(|i| from * ratio.powi(i as i32)).collect())
}

fn check_grid(from: f64, to: f64, points: usize) -> SimResult<()> {
    if points == 0 {
        return Err(SimError::InvalidSweep("grid needs at least one point".into()));
    }
    if !(from.is_finite() && to.is_finite() && from > 0.0 && to > 0.0) {
        return Err(SimError::InvalidSweep(format!(
            "grid bounds must be positive, got {from}..{to}"
        )));
    }
    if from > to {
        return Err(SimError::InvalidSweep(format!(
            "grid runs backwards: {from} > {to}"
        )));
    }
    Ok(())
}

fn check_rates(rates: &[f64]) -> SimResult<()> {
    if rates.is_empty() {
        Err(SimError::InvalidSweep("no rates to sweep".into()))
    } else {
        Ok(())
    }
}

/// One simulated run of a sweep alongside its closed-form expectation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SweepPoint {
    /// The swept arrival rate.
    pub rate: f64,
    /// Simulated outcome.
    pub result: RunResult,
    /// Analytical blocking probability (Erlang-B or ABP).
    pub expected_blocking: f64,
    /// Offered load of the swept class set.
    pub expected_utilisation: f64,
}

impl SweepPoint {
    /// Simulated minus expected blocking.
    pub fn blocking_error(&self) -> f64 {
        self.result.blocking_probability() - self.expected_blocking
    }
}

/// Sweep the single-class arrival rate.
pub fn mmcc_arrival_sweep(
    config: &MmccConfig,
    server_count: u32,
    arrival_target: u64,
    rates: &[f64],
) -> SimResult<Vec<SweepPoint>> {
    check_rates(rates)?;
    rates
        .iter()
        .enumerate()
        .map(|(i, &rate)| {
            let point_config = config
                .clone()
                .with_arrival_rate(rate)
                .with_seed(config.seed.wrapping_add(i as u64));
            let result = Mmcc::new(point_config)?.run(server_count, arrival_target)?;
            let load = analytic::offered_load(rate, config.departure_rate);
            tracing::debug!(rate, blocking = result.blocking_probability(), "sweep point");
            Ok(SweepPoint {
                rate,
                result,
                expected_blocking: analytic::erlang_b(server_count as usize, load),
                expected_utilisation: analytic::expected_utilisation(rate, config.departure_rate),
            })
        })
        .collect()
}

/// Sweep the new-call arrival rate of the handover-priority model.
pub fn priority_newcall_sweep(
    config: &PriorityConfig,
    server_count: u32,
    arrival_target: u64,
    threshold: usize,
    rates: &[f64],
) -> SimResult<Vec<SweepPoint>> {
    priority_sweep(config, server_count, arrival_target, threshold, rates, |c, r| {
        c.with_newcall_rate(r)
    })
}

/// Sweep the handover arrival rate of the handover-priority model.
pub fn priority_handover_sweep(
    config: &PriorityConfig,
    server_count: u32,
    arrival_target: u64,
    threshold: usize,
    rates: &[f64],
) -> SimResult<Vec<SweepPoint>> {
    priority_sweep(config, server_count, arrival_target, threshold, rates, |c, r| {
        c.with_handover_rate(r)
    })
}

fn priority_sweep(
    config: &PriorityConfig,
    server_count: u32,
    arrival_target: u64,
    threshold: usize,
    rates: &[f64],
    set_rate: impl Fn(PriorityConfig, f64) -> PriorityConfig,
) -> SimResult<Vec<SweepPoint>> {
    check_rates(rates)?;
    let weight = config.weight()?;
    rates
        .iter()
        .enumerate()
        .map(|(i, &rate)| {
            let point_config = set_rate(config.clone(), rate)
                .with_seed(config.seed.wrapping_add(i as u64));
            let (h, n, mu) = (
                point_config.handover_rate,
                point_config.newcall_rate,
                point_config.departure_rate,
            );
            let result =
                PriorityMmcc::new(point_config)?.run(server_count, arrival_target, threshold)?;
            tracing::debug!(rate, abp = result.blocking_probability(), "sweep point");
            Ok(SweepPoint {
                rate,
                result,
                expected_blocking: analytic::expected_abp(
                    server_count as usize,
                    threshold,
                    h,
                    n,
                    mu,
                    weight,
                ),
                expected_utilisation: analytic::expected_utilisation(h + n, mu),
            })
        })
        .collect()
}

/// The last point whose simulated blocking is strictly below `limit`.
///
/// With an increasing rate grid this is the highest rate the system can
/// carry within the blocking budget.
pub fn best_under(points: &[SweepPoint], limit: f64) -> Option<&SweepPoint> {
    points
        .iter()
        .rev()
        .find(|p| p.result.blocking_probability() < limit)
}

/// Mean signed difference between simulated and expected blocking.
///
/// Positive when the simulation blocks more often than predicted.
pub fn mean_bias(points: &[SweepPoint]) -> f64 {
    mean_of(points, SweepPoint::blocking_error)
}

/// Mean absolute difference between simulated and expected blocking.
pub fn mean_absolute_error(points: &[SweepPoint]) -> f64 {
    mean_of(points, |p| p.blocking_error().abs())
}

fn mean_of(points: &[SweepPoint], f: impl Fn(&SweepPoint) -> f64) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    points.iter().map(f).sum::<f64>() / points.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TrafficClass;
    use crate::time::VirtualTime;

    fn point(rate: f64, blocked: u64) -> SweepPoint {
        SweepPoint {
            rate,
            result: RunResult {
                server_count: 4,
                threshold: 0,
                arrivals: [(TrafficClass::Single, 100)].into_iter().collect(),
                blocked: [(TrafficClass::Single, blocked)].into_iter().collect(),
                departed: 100 - blocked,
                in_service: 0,
                final_time: VirtualTime::new(10.0),
                busy_time: 5.0,
                handover_weight: None,
            },
            expected_blocking: 0.05,
            expected_utilisation: 1.0,
        }
    }

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(0.1, 0.5, 5).unwrap().len(), 5);
        let grid = linspace(1.0, 3.0, 3).unwrap();
        assert_eq!(grid, vec![1.0, 2.0, 3.0]);
        assert_eq!(linspace(0.2, 0.9, 1).unwrap(), vec![0.2]);
    }

    #[test]
    fn test_geomspace() {
        let grid = geomspace(1.0, 100.0, 3).unwrap();
        assert!((grid[1] - 10.0).abs() < 1e-9);
        assert!((grid[2] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_bad_grids_rejected() {
        assert!(matches!(linspace(0.1, 0.2, 0), Err(SimError::InvalidSweep(_))));
        assert!(matches!(linspace(0.0, 0.2, 4), Err(SimError::InvalidSweep(_))));
        assert!(matches!(geomspace(0.5, 0.2, 4), Err(SimError::InvalidSweep(_))));
        assert!(matches!(
            mmcc_arrival_sweep(&MmccConfig::default(), 4, 10, &[]),
            Err(SimError::InvalidSweep(_))
        ));
    }

    #[test]
    fn test_best_under_picks_last_qualifying() {
        let points = vec![point(0.1, 0), point(0.2, 1), point(0.3, 5), point(0.4, 20)];
        let best = best_under(&points, 0.02).unwrap();
        assert_eq!(best.rate, 0.2);
        assert!(best_under(&points, 0.0).is_none());
    }

    #[test]
    fn test_bias_and_absolute_error() {
        // Errors of -0.05 and +0.10 against an expected 0.05.
        let points = vec![point(0.1, 0), point(0.2, 15)];
        assert!((mean_bias(&points) - 0.025).abs() < 1e-12);
        assert!((mean_absolute_error(&points) - 0.075).abs() < 1e-12);
        assert_eq!(mean_bias(&[]), 0.0);
        assert_eq!(mean_absolute_error(&[]), 0.0);
    }

    #[test]
    fn test_mmcc_sweep_runs_each_rate() {
        let rates = linspace(0.01, 0.05, 3).unwrap();
        let points = mmcc_arrival_sweep(&MmccConfig::default(), 4, 500, &rates).unwrap();
        assert_eq!(points.len(), 3);
        for (p, r) in points.iter().zip(&rates) {
            assert_eq!(p.rate, *r);
            assert_eq!(p.result.arrivals_total(), 500);
            assert!(p.result.is_conserved());
            assert!((p.expected_blocking - analytic::erlang_b(4, r / 0.01)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_priority_sweep_carries_weight() {
        let config = PriorityConfig::default().with_handover_weight(2.0);
        let points = priority_newcall_sweep(&config, 6, 800, 1, &[0.02, 0.04]).unwrap();
        assert_eq!(points.len(), 2);
        for p in &points {
            assert_eq!(p.result.handover_weight, Some(2.0));
            assert_eq!(p.result.threshold, 1);
        }
        let expected = analytic::expected_abp(6, 1, config.handover_rate, 0.04, 0.01, 2.0);
        assert!((points[1].expected_blocking - expected).abs() < 1e-12);

        let handover = priority_handover_sweep(&config, 6, 800, 1, &[0.01]).unwrap();
        assert_eq!(handover[0].rate, 0.01);
    }
}
