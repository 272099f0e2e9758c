//! Gene-set enrichment analysis over a ranked list.
//!
//! The classic weighted Kolmogorov-Smirnov running sum: walking the
//! score-sorted list, set members push the sum up by their weighted
//! score, non-members pull it down by a constant, and the enrichment
//! score is the deviation of largest magnitude. Significance comes from
//! a permutation null built by scoring random same-size gene selections,
//! parallelized across permutations.

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::methods::EnrichmentRecord;
use crate::readers::utils::{GeneSetCollection, normalize_analyte};
use crate::stat::{self, AdjustmentMethod};

/// One entry of a ranked list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankListItem {
    pub analyte: String,
    pub score: f64,
}

/// Configuration for a single GSEA run.
#[derive(Debug, Clone)]
pub struct GSEAConfig {
    /// Number of permutations behind each set's null distribution.
    pub permutations: usize,
    /// Exponent applied to |score| when weighting hits.
    pub weight: f64,
    /// Minimum number of set members present in the ranked list.
    pub min_set_size: usize,
    /// Maximum number of set members present in the ranked list.
    pub max_set_size: usize,
    /// Multiple-testing correction applied across tested sets.
    pub adjustment: AdjustmentMethod,
    /// Seed for the permutation RNG. `None` draws one from the OS, so
    /// set it whenever runs must be reproducible.
    pub seed: Option<u64>,
}

impl Default for GSEAConfig {
    fn default() -> Self {
        GSEAConfig {
            permutations: 1000,
            weight: 1.0,
            min_set_size: 15,
            max_set_size: 500,
            adjustment: AdjustmentMethod::BenjaminiHochberg,
            seed: None,
        }
    }
}

/// Per-set GSEA record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GSEAResult {
    pub set: String,
    /// Sign-matched permutation p-value.
    pub p: f64,
    /// Adjusted p-value across all tested sets.
    pub fdr: f64,
    /// Enrichment score: the running-sum deviation of largest magnitude.
    pub es: f64,
    /// Enrichment score normalized by the same-sign permutation mean.
    pub nes: f64,
    /// Number of set members present in the ranked list.
    pub size: usize,
    /// Set members at or before (positive ES) / at or after (negative
    /// ES) the running-sum peak, in rank order.
    pub leading_edge: Vec<String>,
}

impl EnrichmentRecord for GSEAResult {
    fn set_id(&self) -> &str {
        &self.set
    }

    fn p_value(&self) -> f64 {
        self.p
    }
}

struct PartialGSEAResult {
    set: String,
    p: f64,
    es: f64,
    nes: f64,
    size: usize,
    leading_edge: Vec<String>,
}

/// Walk the ranked list for one hit-index set and return the signed
/// extremum of the running sum together with its position. `None` when
/// the hit weights sum to zero or the set spans the whole list, where
/// the statistic is undefined.
fn running_sum_extremum(weights: &[f64], hits: &[usize]) -> Option<(f64, usize)> {
    let n = weights.len();
    let n_hits = hits.len();
    if n_hits == 0 || n_hits == n {
        return None;
    }
    let hit_norm: f64 = hits.iter().map(|&position| weights[position]).sum();
    if hit_norm <= 0.0 {
        return None;
    }
    let miss_decrement = 1.0 / (n - n_hits) as f64;

    let mut sum = 0.0;
    let mut extremum: f64 = 0.0;
    let mut extremum_position = 0;
    let mut next_hit = 0;
    for position in 0..n {
        if next_hit < n_hits && hits[next_hit] == position {
            sum += weights[position] / hit_norm;
            next_hit += 1;
        } else {
            sum -= miss_decrement;
        }
        if sum.abs() > extremum.abs() {
            extremum = sum;
            extremum_position = position;
        }
    }
    Some((extremum, extremum_position))
}

/// Sample `size` distinct positions from `0..n`, sorted ascending.
fn sample_positions(rng: &mut StdRng, n: usize, size: usize) -> Vec<usize> {
    let mut positions = rand::seq::index::sample(rng, n, size).into_vec();
    positions.sort_unstable();
    positions
}

/// Run GSEA for every set in the collection against a ranked list.
///
/// The list is sorted by score descending (ties by analyte id, so equal
/// scores rank deterministically). Sets whose in-list size falls outside
/// the configured bounds are excluded and logged, as are sets whose hit
/// weights are all zero. Results are sorted by adjusted p-value
/// ascending, ties by set id.
pub fn gsea(
    rank_list: &[RankListItem],
    sets: &GeneSetCollection,
    config: &GSEAConfig,
) -> Result<Vec<GSEAResult>> {
    if rank_list.is_empty() {
        return Err(Error::EmptyInput("ranked list is empty".into()));
    }
    let mut sorted: Vec<RankListItem> = rank_list
        .iter()
        .map(|item| RankListItem {
            analyte: normalize_analyte(&item.analyte),
            score: item.score,
        })
        .collect();
    {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for item in &sorted {
            if !item.score.is_finite() {
                return Err(Error::InvalidInput(format!(
                    "non-finite score {} for analyte {}",
                    item.score, item.analyte
                )));
            }
            if !seen.insert(item.analyte.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "duplicate analyte {} in ranked list",
                    item.analyte
                )));
            }
        }
    }
    sorted.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.analyte.cmp(&b.analyte))
    });

    let n = sorted.len();
    let position_of: FxHashMap<&str, usize> = sorted
        .iter()
        .enumerate()
        .map(|(position, item)| (item.analyte.as_str(), position))
        .collect();
    let weights: Vec<f64> = sorted
        .iter()
        .map(|item| item.score.abs().powf(config.weight))
        .collect();

    let base_seed = config.seed.unwrap_or_else(|| rand::rng().random());

    let mut partials: Vec<PartialGSEAResult> = Vec::new();
    for set in sets.iter() {
        let mut hits: Vec<usize> = set
            .genes
            .iter()
            .filter_map(|gene| position_of.get(gene.as_str()).copied())
            .collect();
        hits.sort_unstable();
        let size = hits.len();
        if size < config.min_set_size || size > config.max_set_size {
            debug!("skipping {}: {} in-list genes outside size bounds", set.id, size);
            continue;
        }
        let Some((es, peak)) = running_sum_extremum(&weights, &hits) else {
            warn!("excluding {}: running-sum statistic undefined", set.id);
            continue;
        };

        let leading_edge: Vec<String> = if es >= 0.0 {
            hits.iter()
                .take_while(|&&position| position <= peak)
                .map(|&position| sorted[position].analyte.clone())
                .collect()
        } else {
            hits.iter()
                .skip_while(|&&position| position < peak)
                .map(|&position| sorted[position].analyte.clone())
                .collect()
        };

        // The dominant cost: one null score per permutation, each from a
        // deterministically seeded RNG so parallel order cannot matter.
        let null_scores: Vec<f64> = (0..config.permutations)
            .into_par_iter()
            .filter_map(|permutation| {
                let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(permutation as u64));
                let positions = sample_positions(&mut rng, n, size);
                running_sum_extremum(&weights, &positions).map(|(score, _)| score)
            })
            .collect();

        let same_sign: Vec<f64> = if es >= 0.0 {
            null_scores.iter().copied().filter(|&score| score >= 0.0).collect()
        } else {
            null_scores.iter().copied().filter(|&score| score < 0.0).collect()
        };
        if same_sign.is_empty() {
            warn!("excluding {}: no same-sign permutation scores for ES {es}", set.id);
            continue;
        }
        let more_extreme = same_sign
            .iter()
            .filter(|&&score| score.abs() >= es.abs())
            .count();
        let p = (more_extreme as f64 / same_sign.len() as f64).min(1.0);
        let null_mean = same_sign.iter().map(|score| score.abs()).sum::<f64>()
            / same_sign.len() as f64;
        if null_mean <= 0.0 {
            warn!("excluding {}: degenerate permutation null", set.id);
            continue;
        }
        let nes = es / null_mean;

        partials.push(PartialGSEAResult {
            set: set.id.clone(),
            p,
            es,
            nes,
            size,
            leading_edge,
        });
    }

    if partials.is_empty() {
        return Ok(Vec::new());
    }

    let p_values: Vec<f64> = partials.iter().map(|partial| partial.p).collect();
    let fdrs = stat::adjust(&p_values, config.adjustment)?;

    let mut results: Vec<GSEAResult> = partials
        .into_iter()
        .zip(fdrs)
        .map(|(partial, fdr)| GSEAResult {
            set: partial.set,
            p: partial.p,
            fdr,
            es: partial.es,
            nes: partial.nes,
            size: partial.size,
            leading_edge: partial.leading_edge,
        })
        .collect();
    results.sort_by(|a, b| a.fdr.total_cmp(&b.fdr).then_with(|| a.set.cmp(&b.set)));
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_sum_peaks_on_top_loaded_set() {
        // Uniform weights: hits at the top of the list drive the sum up
        // before the misses pull it back down.
        let weights = vec![1.0; 6];
        let (es, peak) = running_sum_extremum(&weights, &[0, 1]).unwrap();
        assert!(es > 0.0);
        assert_eq!(peak, 1);

        let (es, _) = running_sum_extremum(&weights, &[4, 5]).unwrap();
        assert!(es < 0.0);
    }

    #[test]
    fn running_sum_undefined_for_degenerate_sets() {
        let weights = vec![0.0; 4];
        assert!(running_sum_extremum(&weights, &[0, 1]).is_none());
        let weights = vec![1.0; 4];
        assert!(running_sum_extremum(&weights, &[0, 1, 2, 3]).is_none());
        assert!(running_sum_extremum(&weights, &[]).is_none());
    }
}
