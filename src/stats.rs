//! Order statistics used by the feature engine
//!
//! Quantiles use linear interpolation between closest ranks: for `n`
//! sorted values the `q`-quantile sits at fractional rank `q * (n - 1)`,
//! interpolated between the two neighbouring values. This is the default
//! estimator of most dataframe and numeric libraries, so results are
//! reproducible against them.

/// Sort a copy of `values` ascending
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Linear-interpolation quantile of already sorted values
///
/// `q` is clamped to `[0, 1]`. Returns `None` for an empty slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let q = q.clamp(0.0, 1.0);
    let rank = q * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    let low = sorted[lower];
    let high = sorted[upper.min(sorted.len() - 1)];

    Some(low + (high - low) * fraction)
}

/// Linear-interpolation quantile of unsorted values
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    quantile_sorted(&sorted(values), q)
}

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Equal-frequency bracketing of a value distribution
///
/// Edges are the `0/k, 1/k, ..., k/k` quantiles of the values. Brackets are
/// right-closed, except the first which also includes the lowest edge.
/// When values repeat, several edges may coincide and the later brackets
/// of a run simply stay empty.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantileBrackets {
    edges: Vec<f64>,
}

impl QuantileBrackets {
    /// Build `count` brackets over `values`; `None` when there is nothing to bracket
    pub fn new(values: &[f64], count: usize) -> Option<Self> {
        if values.is_empty() || count == 0 {
            return None;
        }

        let sorted = sorted(values);
        let edges = (0..=count)
            .map(|i| quantile_sorted(&sorted, i as f64 / count as f64))
            .collect::<Option<Vec<f64>>>()?;

        Some(Self { edges })
    }

    pub fn count(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Index of the bracket containing `value`
    ///
    /// Values outside the edge range are clamped to the first/last bracket.
    pub fn index_of(&self, value: f64) -> usize {
        let last = self.count() - 1;
        self.edges[1..]
            .iter()
            .position(|&upper| value <= upper)
            .unwrap_or(last)
            .min(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        // rank = 0.5 * 3 = 1.5 -> halfway between 2 and 3
        assert!((quantile(&values, 0.5).unwrap() - 2.5).abs() < 1e-12);
        // rank = 0.95 * 3 = 2.85
        assert!((quantile(&values, 0.95).unwrap() - 3.85).abs() < 1e-12);
        assert_eq!(quantile(&values, 0.0), Some(1.0));
        assert_eq!(quantile(&values, 1.0), Some(4.0));
    }

    #[test]
    fn test_quantile_unsorted_and_edge_cases() {
        assert_eq!(quantile(&[5.0, 1.0, 3.0], 0.5), Some(3.0));
        assert_eq!(quantile(&[7.0], 0.99), Some(7.0));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_brackets_equal_frequency() {
        let values: Vec<f64> = (1..=20).map(|v| v as f64).collect();
        let brackets = QuantileBrackets::new(&values, 10).unwrap();

        let mut counts = [0usize; 10];
        for v in &values {
            counts[brackets.index_of(*v)] += 1;
        }

        assert_eq!(counts, [2; 10]);
    }

    #[test]
    fn test_brackets_include_lowest_edge() {
        let brackets = QuantileBrackets::new(&[1.0, 2.0, 3.0], 10).unwrap();
        assert_eq!(brackets.index_of(1.0), 0);
        assert_eq!(brackets.index_of(3.0), 9);
    }

    #[test]
    fn test_brackets_degenerate_distribution() {
        // All prices identical: every edge coincides, everything lands in bracket 0
        let brackets = QuantileBrackets::new(&[5.0, 5.0, 5.0], 10).unwrap();
        assert_eq!(brackets.count(), 10);
        assert_eq!(brackets.index_of(5.0), 0);

        assert!(QuantileBrackets::new(&[], 10).is_none());
    }
}
