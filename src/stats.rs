//! Descriptive statistics over wall-clock samples.
//!
//! Only descriptive summaries are produced here. There is no outlier
//! rejection and no significance testing; the coefficient of variation is
//! reported so noisy cases can be spotted downstream.

use crate::error::BenchError;
use crate::model::SampleSummary;
use crate::util::round6;

/// Linearly interpolated percentile at rank `p` (0..=100).
///
/// `p` is clamped into range. Fails on an empty sample set instead of
/// inventing a value.
pub fn percentile(samples: &[f64], p: f64) -> Result<f64, BenchError> {
    if samples.is_empty() {
        return Err(BenchError::EmptyInput("percentile"));
    }

    let mut ordered = samples.to_vec();
    ordered.sort_by(f64::total_cmp);
    if ordered.len() == 1 {
        return Ok(ordered[0]);
    }

    let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) };
    let rank = (ordered.len() - 1) as f64 * (p / 100.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return Ok(ordered[lower]);
    }

    let weight = rank - lower as f64;
    Ok(ordered[lower] + (ordered[upper] - ordered[lower]) * weight)
}

/// Rank-based median: the middle sample, or the mean of the two middle
/// samples for an even count.
pub fn median(samples: &[f64]) -> Result<f64, BenchError> {
    if samples.is_empty() {
        return Err(BenchError::EmptyInput("median"));
    }

    let mut ordered = samples.to_vec();
    ordered.sort_by(f64::total_cmp);
    let mid = ordered.len() / 2;
    if ordered.len() % 2 == 1 {
        Ok(ordered[mid])
    } else {
        Ok((ordered[mid - 1] + ordered[mid]) / 2.0)
    }
}

/// Population coefficient of variation in percent.
///
/// A single sample has no spread, and a non-positive mean yields `0.0`.
pub fn coefficient_of_variation_pct(samples: &[f64]) -> Result<f64, BenchError> {
    if samples.is_empty() {
        return Err(BenchError::EmptyInput("coefficient of variation"));
    }
    if samples.len() == 1 {
        return Ok(0.0);
    }

    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return Ok(0.0);
    }

    let variance = samples
        .iter()
        .map(|sample| (sample - mean).powi(2))
        .sum::<f64>()
        / n;
    Ok(variance.sqrt() / mean * 100.0)
}

/// Summarize raw durations given in seconds.
///
/// An empty input is a normal state (unmeasured case) and produces the
/// all-absent summary.
pub fn summarize_samples(samples_s: &[f64]) -> SampleSummary {
    if samples_s.is_empty() {
        return SampleSummary::default();
    }

    // Non-empty from here, so none of the helpers can fail.
    let median_s = median(samples_s).ok();
    let p95_s = percentile(samples_s, 95.0).ok();
    let cv_pct = coefficient_of_variation_pct(samples_s).ok();

    SampleSummary {
        samples_ms: samples_s.iter().map(|value| to_ms(*value)).collect(),
        median_ms: median_s.map(to_ms),
        p95_ms: p95_s.map(to_ms),
        cv_pct: cv_pct.map(round6),
    }
}

fn to_ms(seconds: f64) -> f64 {
    round6(seconds * 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    #[test]
    fn percentile_bounds_are_min_and_max() {
        let samples = vec![7.0, 3.5, 9.25, 1.0, 4.0, 4.0];
        assert_eq!(percentile(&samples, 0.0).unwrap(), 1.0);
        assert_eq!(percentile(&samples, 100.0).unwrap(), 9.25);
    }

    #[test]
    fn percentile_interpolates_between_neighbours() {
        let samples = vec![10.0, 20.0, 30.0, 40.0];
        // rank = 3 * 0.5 = 1.5
        assert!(close(percentile(&samples, 50.0).unwrap(), 25.0));
        // rank = 3 * 0.95 = 2.85
        assert!(close(percentile(&samples, 95.0).unwrap(), 38.5));
    }

    #[test]
    fn percentile_on_exact_rank_returns_sample() {
        let samples = vec![5.0, 1.0, 3.0];
        assert_eq!(percentile(&samples, 50.0).unwrap(), 3.0);
    }

    #[test]
    fn percentile_clamps_out_of_range_rank() {
        let samples = vec![2.0, 4.0];
        assert_eq!(percentile(&samples, 150.0).unwrap(), 4.0);
        assert_eq!(percentile(&samples, -5.0).unwrap(), 2.0);
    }

    #[test]
    fn percentile_of_empty_set_is_an_error() {
        let err = percentile(&[], 95.0).unwrap_err();
        assert!(matches!(err, BenchError::EmptyInput("percentile")));
    }

    #[test]
    fn median_handles_even_and_odd_counts() {
        assert_eq!(median(&[3.0, 1.0, 2.0]).unwrap(), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]).unwrap(), 2.5);
        assert!(median(&[]).is_err());
    }

    #[test]
    fn cv_is_zero_for_constant_and_non_positive_mean() {
        assert_eq!(coefficient_of_variation_pct(&[0.5, 0.5, 0.5]).unwrap(), 0.0);
        assert_eq!(coefficient_of_variation_pct(&[-1.0, 1.0, -3.0]).unwrap(), 0.0);
    }

    #[test]
    fn cv_uses_population_deviation() {
        // mean 2, pstdev 1
        let cv = coefficient_of_variation_pct(&[1.0, 3.0]).unwrap();
        assert!(close(cv, 50.0));
    }

    #[test]
    fn summarize_empty_has_every_field_absent() {
        let summary = summarize_samples(&[]);
        assert!(summary.samples_ms.is_empty());
        assert!(summary.median_ms.is_none());
        assert!(summary.p95_ms.is_none());
        assert!(summary.cv_pct.is_none());
        assert_eq!(summary, SampleSummary::default());
    }

    #[test]
    fn summarize_single_sample_collapses_statistics() {
        let summary = summarize_samples(&[0.0123456789]);
        assert_eq!(summary.samples_ms, vec![12.345679]);
        assert_eq!(summary.median_ms, Some(12.345679));
        assert_eq!(summary.p95_ms, Some(12.345679));
        assert_eq!(summary.cv_pct, Some(0.0));
    }

    #[test]
    fn summarize_converts_to_rounded_milliseconds() {
        let summary = summarize_samples(&[0.001, 0.003, 0.002, 0.004]);
        assert_eq!(summary.samples_ms, vec![1.0, 3.0, 2.0, 4.0]);
        assert_eq!(summary.median_ms, Some(2.5));
        assert_eq!(summary.p95_ms, Some(3.85));
        let cv = summary.cv_pct.unwrap();
        assert!((cv - 44.72136).abs() < 1e-5);
    }
}
