//! Shared statistical machinery: multiple-testing correction across a
//! family of gene sets and p-value combination rules for meta-analysis.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

use crate::error::{Error, Result};

/// Multiple-testing correction procedures.
///
/// `BenjaminiHochberg` and `BenjaminiYekutieli` control the false
/// discovery rate; `Bonferroni`, `Holm` and `Hochberg` control the
/// family-wise error rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentMethod {
    None,
    Bonferroni,
    Holm,
    Hochberg,
    BenjaminiHochberg,
    BenjaminiYekutieli,
}

/// P-value combination rules for meta-analysis across independent lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaAnalysisMethod {
    /// Inverse-normal (Stouffer's Z) combination.
    Stouffer,
    /// Fisher's combined probability test.
    Fisher,
}

// Extreme p-values are clamped before transformation so that the normal
// inverse CDF and the log stay finite.
const P_FLOOR: f64 = 1e-15;

fn validate_p_values(p_values: &[f64]) -> Result<()> {
    if p_values.is_empty() {
        return Err(Error::EmptyInput("empty p-value array".into()));
    }
    for (i, &p) in p_values.iter().enumerate() {
        if !(0.0..=1.0).contains(&p) {
            return Err(Error::InvalidInput(format!("invalid p-value at index {i}: {p}")));
        }
    }
    Ok(())
}

/// Indices that sort `p_values` ascending, ties resolved by position so
/// the permutation is stable.
fn ascending_order(p_values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..p_values.len()).collect();
    order.sort_by(|&a, &b| {
        p_values[a]
            .partial_cmp(&p_values[b])
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.cmp(&b))
    });
    order
}

/// Adjust raw p-values for multiple testing.
///
/// Fails with [`Error::EmptyInput`] for an empty slice and
/// [`Error::InvalidInput`] for values outside `[0, 1]`. The returned
/// vector is aligned with the input.
pub fn adjust(p_values: &[f64], method: AdjustmentMethod) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;
    let n = p_values.len();
    let adjusted = match method {
        AdjustmentMethod::None => p_values.to_vec(),
        AdjustmentMethod::Bonferroni => p_values
            .iter()
            .map(|&p| (p * n as f64).min(1.0))
            .collect(),
        AdjustmentMethod::Holm => {
            // Step-down: running max of p_(i) * (n - i) over ascending order.
            let order = ascending_order(p_values);
            let mut adjusted = vec![0.0; n];
            let mut running_max = 0.0_f64;
            for (rank, &original) in order.iter().enumerate() {
                let candidate = p_values[original] * (n - rank) as f64;
                running_max = running_max.max(candidate);
                adjusted[original] = running_max.min(1.0);
            }
            adjusted
        }
        AdjustmentMethod::Hochberg => step_up(p_values, |_, rank| (n - rank) as f64),
        AdjustmentMethod::BenjaminiHochberg => {
            step_up(p_values, |n, rank| n as f64 / (rank + 1) as f64)
        }
        AdjustmentMethod::BenjaminiYekutieli => {
            let c_n: f64 = (1..=n).map(|i| 1.0 / i as f64).sum();
            step_up(p_values, move |n, rank| c_n * n as f64 / (rank + 1) as f64)
        }
    };
    Ok(adjusted)
}

/// Step-up adjustment: multiply p_(rank) by `factor(n, rank)` and take
/// the running minimum from the largest p-value downwards.
fn step_up(p_values: &[f64], factor: impl Fn(usize, usize) -> f64) -> Vec<f64> {
    let n = p_values.len();
    let order = ascending_order(p_values);
    let mut adjusted = vec![0.0; n];
    let mut running_min = 1.0_f64;
    for rank in (0..n).rev() {
        let original = order[rank];
        let candidate = (p_values[original] * factor(n, rank)).min(1.0);
        running_min = running_min.min(candidate);
        adjusted[original] = running_min;
    }
    adjusted
}

/// Combine independent p-values for one gene set into a single p-value.
///
/// A single-element slice is returned unchanged, so an N=1 meta-analysis
/// reproduces the underlying result exactly.
pub fn combine_p_values(p_values: &[f64], method: MetaAnalysisMethod) -> Result<f64> {
    validate_p_values(p_values)?;
    if p_values.len() == 1 {
        return Ok(p_values[0]);
    }
    match method {
        MetaAnalysisMethod::Stouffer => stouffer(p_values),
        MetaAnalysisMethod::Fisher => fisher(p_values),
    }
}

fn stouffer(p_values: &[f64]) -> Result<f64> {
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| Error::Computation(format!("standard normal unavailable: {e}")))?;
    let z_sum: f64 = p_values
        .iter()
        .map(|&p| normal.inverse_cdf(1.0 - p.clamp(P_FLOOR, 1.0 - P_FLOOR)))
        .sum();
    let z = z_sum / (p_values.len() as f64).sqrt();
    Ok(normal.sf(z))
}

fn fisher(p_values: &[f64]) -> Result<f64> {
    let statistic: f64 = p_values
        .iter()
        .map(|&p| -2.0 * p.clamp(P_FLOOR, 1.0 - P_FLOOR).ln())
        .sum();
    let df = 2.0 * p_values.len() as f64;
    let chi = ChiSquared::new(df)
        .map_err(|e| Error::Computation(format!("chi-squared({df}) unavailable: {e}")))?;
    Ok(chi.sf(statistic))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn bonferroni_caps_at_one() {
        let p_values = vec![0.01, 0.02, 0.03, 0.1, 0.2];
        let adjusted = adjust(&p_values, AdjustmentMethod::Bonferroni).unwrap();
        let expected = [0.05, 0.1, 0.15, 0.5, 1.0];
        for (a, e) in adjusted.iter().zip(expected.iter()) {
            assert_relative_eq!(*a, *e, epsilon = 1e-10);
        }
    }

    #[test]
    fn benjamini_hochberg_unordered() {
        let p_values = vec![0.05, 0.01, 0.1, 0.04, 0.02];
        let adjusted = adjust(&p_values, AdjustmentMethod::BenjaminiHochberg).unwrap();
        let expected = [0.0625, 0.05, 0.1, 0.0625, 0.05];
        for (a, e) in adjusted.iter().zip(expected.iter()) {
            assert_relative_eq!(*a, *e, epsilon = 1e-10);
        }
    }

    #[test]
    fn benjamini_hochberg_preserves_raw_ordering() {
        let p_values = vec![0.001, 0.3, 0.04, 0.9, 0.04, 0.0002];
        let adjusted = adjust(&p_values, AdjustmentMethod::BenjaminiHochberg).unwrap();
        let mut pairs: Vec<(f64, f64)> = p_values.iter().copied().zip(adjusted).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        for window in pairs.windows(2) {
            assert!(
                window[0].1 <= window[1].1 + 1e-12,
                "adjusted values must be non-decreasing in raw order"
            );
        }
    }

    #[test]
    fn holm_dominates_bonferroni() {
        let p_values = vec![0.01, 0.02, 0.03];
        let holm = adjust(&p_values, AdjustmentMethod::Holm).unwrap();
        let bonferroni = adjust(&p_values, AdjustmentMethod::Bonferroni).unwrap();
        for (h, b) in holm.iter().zip(bonferroni.iter()) {
            assert!(h <= b);
        }
        assert_relative_eq!(holm[0], 0.03, epsilon = 1e-10);
    }

    #[test]
    fn hochberg_largest_is_unchanged() {
        let p_values = vec![0.01, 0.04, 0.9];
        let adjusted = adjust(&p_values, AdjustmentMethod::Hochberg).unwrap();
        assert_relative_eq!(adjusted[2], 0.9, epsilon = 1e-10);
    }

    #[test]
    fn adjust_rejects_bad_input() {
        assert!(matches!(
            adjust(&[], AdjustmentMethod::BenjaminiHochberg),
            Err(Error::EmptyInput(_))
        ));
        assert!(matches!(
            adjust(&[0.1, 1.5], AdjustmentMethod::BenjaminiHochberg),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            adjust(&[-0.1], AdjustmentMethod::Bonferroni),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn single_p_value_passes_through() {
        let p = combine_p_values(&[0.037], MetaAnalysisMethod::Stouffer).unwrap();
        assert_eq!(p, 0.037);
        let p = combine_p_values(&[0.037], MetaAnalysisMethod::Fisher).unwrap();
        assert_eq!(p, 0.037);
    }

    #[test]
    fn stouffer_sharpens_concordant_evidence() {
        let p = combine_p_values(&[0.05, 0.05, 0.05], MetaAnalysisMethod::Stouffer).unwrap();
        assert!(p < 0.05, "three concordant 0.05 results should combine below 0.05, got {p}");
        assert!(p > 0.0);
    }

    #[test]
    fn fisher_sharpens_concordant_evidence() {
        let p = combine_p_values(&[0.05, 0.05], MetaAnalysisMethod::Fisher).unwrap();
        assert!(p < 0.05);
    }

    #[test]
    fn stouffer_of_null_evidence_stays_null() {
        let p = combine_p_values(&[0.5, 0.5], MetaAnalysisMethod::Stouffer).unwrap();
        assert_relative_eq!(p, 0.5, epsilon = 1e-9);
    }
}
