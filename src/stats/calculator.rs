//! Statistics Calculator Module
//! Descriptive statistics used by the presenter: percentiles and box summaries.

use statrs::statistics::Statistics;

/// Min-max box summary for one group of values.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSummary {
    pub group_name: String,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
}

impl Default for BoxSummary {
    fn default() -> Self {
        Self {
            group_name: String::new(),
            count: 0,
            min: f64::NAN,
            q1: f64::NAN,
            median: f64::NAN,
            q3: f64::NAN,
            max: f64::NAN,
            mean: f64::NAN,
        }
    }
}

/// Handles statistical calculations over plain value slices.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Summarize values with whiskers at the extremes.
    pub fn box_summary(values: &[f64]) -> BoxSummary {
        let n = values.len();
        if n == 0 {
            return BoxSummary::default();
        }

        let sorted = Self::sorted(values);
        BoxSummary {
            group_name: String::new(),
            count: n,
            min: sorted[0],
            q1: Self::percentile(&sorted, 25.0),
            median: Self::percentile(&sorted, 50.0),
            q3: Self::percentile(&sorted, 75.0),
            max: sorted[n - 1],
            mean: Self::mean(values),
        }
    }

    /// Arithmetic mean; NaN for an empty slice.
    pub fn mean(values: &[f64]) -> f64 {
        values.mean()
    }

    /// Median with linear interpolation; NaN for an empty slice.
    pub fn median(values: &[f64]) -> f64 {
        Self::percentile(&Self::sorted(values), 50.0)
    }

    /// Percentile `p` (0-100) of unsorted values.
    pub fn quantile(values: &[f64], p: f64) -> f64 {
        Self::percentile(&Self::sorted(values), p)
    }

    fn sorted(values: &[f64]) -> Vec<f64> {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        sorted
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates_between_ranks() {
        let values = [8.0, 1.0, 7.0, 2.0, 6.0, 3.0, 5.0, 4.0];
        assert_eq!(StatsCalculator::quantile(&values, 75.0), 6.25);
        assert_eq!(StatsCalculator::median(&values), 4.5);
    }

    #[test]
    fn empty_input_is_nan() {
        assert!(StatsCalculator::median(&[]).is_nan());
        assert!(StatsCalculator::mean(&[]).is_nan());
        assert_eq!(StatsCalculator::box_summary(&[]).count, 0);
    }

    #[test]
    fn single_value_box_collapses() {
        let summary = StatsCalculator::box_summary(&[3.0]);
        assert_eq!(summary.min, 3.0);
        assert_eq!(summary.q1, 3.0);
        assert_eq!(summary.median, 3.0);
        assert_eq!(summary.max, 3.0);
        assert_eq!(summary.mean, 3.0);
    }

    #[test]
    fn box_summary_uses_extremes_for_whiskers() {
        let summary = StatsCalculator::box_summary(&[1.0, 2.0, 3.0, 4.0, 100.0]);
        assert_eq!(summary.count, 5);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.q1, 2.0);
        assert_eq!(summary.median, 3.0);
        assert_eq!(summary.q3, 4.0);
        assert_eq!(summary.max, 100.0);
        assert_eq!(summary.mean, 22.0);
    }
}
