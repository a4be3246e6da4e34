//! Closed-form results for the two loss systems.
//!
//! Used to sanity-check simulated runs: the Erlang-B formula for M/M/C/C
//! and the stationary distribution of the birth-death chain behind the
//! handover-reservation scheme.

/// Offered load `λ/μ` in Erlangs.
pub fn offered_load(arrival_rate: f64, departure_rate: f64) -> f64 {
    arrival_rate / departure_rate
}

/// Mean number of busy servers of an infinite-server system, `λ/μ`.
///
/// Matches the simulated utilisation when blocking is negligible.
pub fn expected_utilisation(arrival_rate: f64, departure_rate: f64) -> f64 {
    offered_load(arrival_rate, departure_rate)
}

/// Erlang-B blocking probability of `servers` servers under `offered_load`.
///
/// Uses the recurrence `B(k) = a·B(k-1) / (k + a·B(k-1))`, which stays
/// finite for loads and pool sizes where the factorial form overflows.
pub fn erlang_b(servers: usize, offered_load: f64) -> f64 {
    let mut b = 1.0;
    for k in 1..=servers {
        let ab = offered_load * b;
        b = ab / (k as f64 + ab);
    }
    b
}

/// Stationary probabilities `p[0..=servers]` of the number of busy servers
/// when `threshold` servers are reserved for handovers.
///
/// Below `servers - threshold` busy servers both classes are admitted; at or
/// above it only handovers are.
pub fn threshold_state_probabilities(
    servers: usize,
    threshold: usize,
    handover_rate: f64,
    newcall_rate: f64,
    departure_rate: f64,
) -> Vec<f64> {
    let general = servers.saturating_sub(threshold);
    let combined = handover_rate + newcall_rate;

    // Log-weights keep large pools from overflowing.
    let mut log_w = Vec::with_capacity(servers + 1);
    log_w.push(0.0_f64);
    for k in 1..=servers {
        let birth = if k - 1 < general { combined } else { handover_rate };
        let prev = log_w[k - 1];
        log_w.push(prev + birth.ln() - (k as f64 * departure_rate).ln());
    }

    let max = log_w.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let weights: Vec<f64> = log_w.iter().map(|lw| (lw - max).exp()).collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Probability that a new call is blocked: the chain sits at or above the
/// general capacity.
pub fn newcall_loss(
    servers: usize,
    threshold: usize,
    handover_rate: f64,
    newcall_rate: f64,
    departure_rate: f64,
) -> f64 {
    let general = servers.saturating_sub(threshold);
    threshold_state_probabilities(servers, threshold, handover_rate, newcall_rate, departure_rate)
        [general..]
        .iter()
        .sum()
}

/// Probability that a handover is dropped: every server is busy.
pub fn handover_loss(
    servers: usize,
    threshold: usize,
    handover_rate: f64,
    newcall_rate: f64,
    departure_rate: f64,
) -> f64 {
    threshold_state_probabilities(servers, threshold, handover_rate, newcall_rate, departure_rate)
        .last()
        .copied()
        .unwrap_or(1.0)
}

/// Expected aggregated blocking probability `P_newcall + weight × P_handover`.
pub fn expected_abp(
    servers: usize,
    threshold: usize,
    handover_rate: f64,
    newcall_rate: f64,
    departure_rate: f64,
    weight: f64,
) -> f64 {
    let p = threshold_state_probabilities(
        servers,
        threshold,
        handover_rate,
        newcall_rate,
        departure_rate,
    );
    let general = servers.saturating_sub(threshold);
    let newcall: f64 = p[general..].iter().sum();
    let handover = p.last().copied().unwrap_or(1.0);
    newcall + weight * handover
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_erlang_b_known_values() {
        assert_eq!(erlang_b(0, 3.0), 1.0);
        assert!(close(erlang_b(1, 1.0), 0.5));
        assert!(close(erlang_b(2, 1.0), 0.2));
        // a^2/2 / (1 + a + a^2/2) with a = 2.
        assert!(close(erlang_b(2, 2.0), 2.0 / 5.0));
    }

    #[test]
    fn test_erlang_b_large_pool_stays_finite() {
        let b = erlang_b(500, 450.0);
        assert!(b.is_finite());
        assert!(b > 0.0 && b < 1.0);
    }

    #[test]
    fn test_erlang_b_decreases_with_servers() {
        let loads = [erlang_b(4, 3.0), erlang_b(8, 3.0), erlang_b(16, 3.0)];
        assert!(loads[0] > loads[1] && loads[1] > loads[2]);
    }

    #[test]
    fn test_utilisation_is_offered_load() {
        assert!(close(expected_utilisation(0.1, 0.01), 10.0));
    }

    #[test]
    fn test_state_probabilities_sum_to_one() {
        let p = threshold_state_probabilities(16, 2, 0.03, 0.1, 0.01);
        assert_eq!(p.len(), 17);
        assert!(close(p.iter().sum::<f64>(), 1.0));
        assert!(p.iter().all(|x| *x >= 0.0));
    }

    #[test]
    fn test_zero_threshold_reduces_to_erlang_b() {
        let (h, n, mu) = (0.03, 0.1, 0.01);
        let b = erlang_b(16, offered_load(h + n, mu));
        assert!((newcall_loss(16, 0, h, n, mu) - b).abs() < 1e-9);
        assert!((handover_loss(16, 0, h, n, mu) - b).abs() < 1e-9);
    }

    #[test]
    fn test_reservation_favours_handovers() {
        let (h, n, mu) = (0.03, 0.1, 0.01);
        let cbp = newcall_loss(16, 3, h, n, mu);
        let hfp = handover_loss(16, 3, h, n, mu);
        assert!(hfp < cbp);
        assert!(hfp < handover_loss(16, 0, h, n, mu));
    }

    #[test]
    fn test_two_server_threshold_chain() {
        // N = 2, T = 1, all rates 1: weights 1, 2, 1.
        let p = threshold_state_probabilities(2, 1, 1.0, 1.0, 1.0);
        assert!(close(p[0], 0.25));
        assert!(close(p[1], 0.5));
        assert!(close(p[2], 0.25));
        assert!(close(newcall_loss(2, 1, 1.0, 1.0, 1.0), 0.75));
        assert!(close(expected_abp(2, 1, 1.0, 1.0, 1.0, 10.0), 3.25));
    }
}
