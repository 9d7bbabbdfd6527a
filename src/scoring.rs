//! Improved D-score computation
//!
//! Implements the improved scoring algorithm (Greenwald, Nosek & Banaji):
//! error-penalized latencies, per-block-pair pooled standard deviations, and
//! the mean of the two standardized differences. The function is pure and
//! never fails: degenerate input yields the defined fallback score of 0 with
//! the validity flag set.

use crate::types::{DScoreResult, Response};

/// Responses slower than this are discarded as extreme outliers (seconds)
pub const MAX_LATENCY_S: f64 = 10.0;

/// Responses faster than this count toward the fast-response ratio (seconds)
pub const FAST_LATENCY_S: f64 = 0.3;

/// If more than this fraction of responses is fast, the score is flagged
pub const FAST_RATIO_LIMIT: f64 = 0.10;

/// Penalty added to the latency of an incorrect response (seconds)
pub const ERROR_PENALTY_S: f64 = 0.6;

/// Compute the improved D-score from a session's response log.
///
/// Blocks 1, 2, and 5 are practice/transition blocks and are excluded; the
/// four critical blocks 3, 4, 6, 7 feed the score. Positive values indicate
/// a faster disorder-with-negative association.
pub fn compute_d_score(responses: &[Response]) -> DScoreResult {
    // Discard extreme outliers
    let retained: Vec<&Response> = responses
        .iter()
        .filter(|r| r.response_time_s <= MAX_LATENCY_S)
        .collect();

    if retained.is_empty() {
        return DScoreResult::invalid();
    }

    // Excess fast responses flag the score but never abort it
    let fast = retained
        .iter()
        .filter(|r| r.response_time_s < FAST_LATENCY_S)
        .count();
    let validity_warning = (fast as f64) / (retained.len() as f64) > FAST_RATIO_LIMIT;

    let block3 = scored_latencies(&retained, 3);
    let block4 = scored_latencies(&retained, 4);
    let block6 = scored_latencies(&retained, 6);
    let block7 = scored_latencies(&retained, 7);

    if block3.is_empty() || block4.is_empty() || block6.is_empty() || block7.is_empty() {
        return DScoreResult::invalid();
    }

    let sd1 = pooled_sd(&block3, &block6);
    let sd2 = pooled_sd(&block4, &block7);

    let d1 = (mean(&block6) - mean(&block3)) / sd1;
    let d2 = (mean(&block7) - mean(&block4)) / sd2;
    let value = (d1 + d2) / 2.0;

    if value.is_nan() || value.is_infinite() {
        return DScoreResult::invalid();
    }

    DScoreResult {
        value,
        validity_warning,
    }
}

/// Scored latency: raw latency for a correct response, latency plus the
/// standard 600 ms penalty for an incorrect one.
fn scored_latency(response: &Response) -> f64 {
    if response.correct {
        response.response_time_s
    } else {
        response.response_time_s + ERROR_PENALTY_S
    }
}

fn scored_latencies(retained: &[&Response], block: u8) -> Vec<f64> {
    retained
        .iter()
        .filter(|r| r.block == block)
        .map(|r| scored_latency(r))
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Pooled sample standard deviation of two blocks' scored latencies:
/// within-block sums of squares over the combined degrees of freedom
/// (Bessel's correction per block), so a shift between the block means does
/// not inflate the denominator. Floored at 1.0 when the pool is too small to
/// estimate spread.
fn pooled_sd(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() + b.len();
    if n <= 2 {
        return 1.0;
    }

    let sum_sq = |values: &[f64]| -> f64 {
        let m = mean(values);
        values.iter().map(|v| (v - m) * (v - m)).sum()
    };

    ((sum_sq(a) + sum_sq(b)) / (n - 2) as f64).sqrt()
}
