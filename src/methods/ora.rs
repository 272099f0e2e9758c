//! Over-representation analysis.
//!
//! Tests each gene set for enrichment in an interest list against a
//! reference (background) universe using the hypergeometric upper tail,
//! then corrects across all tested sets.

use log::{debug, warn};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use statrs::distribution::{DiscreteCDF, Hypergeometric};

use crate::error::{Error, Result};
use crate::methods::EnrichmentRecord;
use crate::readers::utils::GeneSetCollection;
use crate::stat::{self, AdjustmentMethod};

/// Configuration for a single ORA run.
#[derive(Debug, Clone)]
pub struct ORAConfig {
    /// Minimum overlap between a set and the interest list for the set
    /// to be tested. Sets below this are excluded before correction.
    pub min_overlap: usize,
    /// Minimum set size, counted within the reference universe.
    pub min_set_size: usize,
    /// Maximum set size, counted within the reference universe.
    pub max_set_size: usize,
    /// Multiple-testing correction applied across tested sets.
    pub adjustment: AdjustmentMethod,
}

impl Default for ORAConfig {
    fn default() -> Self {
        ORAConfig {
            min_overlap: 5,
            min_set_size: 5,
            max_set_size: 2000,
            adjustment: AdjustmentMethod::BenjaminiHochberg,
        }
    }
}

/// Per-set ORA record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ORAResult {
    pub set: String,
    /// Hypergeometric upper-tail probability of seeing at least this
    /// much overlap by chance.
    pub p: f64,
    /// Adjusted p-value across all tested sets.
    pub fdr: f64,
    /// Genes shared by the set and the interest list (within the reference).
    pub overlap: usize,
    /// Overlap expected under the null.
    pub expected: f64,
    /// `overlap / expected`.
    pub enrichment_ratio: f64,
}

impl EnrichmentRecord for ORAResult {
    fn set_id(&self) -> &str {
        &self.set
    }

    fn p_value(&self) -> f64 {
        self.p
    }
}

struct PartialORAResult {
    set: String,
    p: f64,
    overlap: usize,
    expected: f64,
}

/// Run over-representation analysis for every set in the collection.
///
/// The interest list is restricted to the reference universe before
/// testing. Sets with no reference overlap, sets outside the configured
/// size bounds and sets below `min_overlap` are excluded and logged.
/// Results are sorted by adjusted p-value ascending, ties by set id.
pub fn get_ora(
    gene_list: &FxHashSet<String>,
    reference: &FxHashSet<String>,
    sets: &GeneSetCollection,
    config: &ORAConfig,
) -> Result<Vec<ORAResult>> {
    if reference.is_empty() {
        return Err(Error::EmptyInput("reference list is empty".into()));
    }
    if gene_list.is_empty() {
        return Err(Error::EmptyInput("interest list is empty".into()));
    }

    let interest: FxHashSet<&str> = gene_list
        .iter()
        .filter(|analyte| reference.contains(*analyte))
        .map(String::as_str)
        .collect();
    if interest.is_empty() {
        return Err(Error::EmptyInput(
            "no analytes from the interest list are present in the reference".into(),
        ));
    }

    let population = reference.len() as u64;
    let draws = interest.len() as u64;

    let mut partials: Vec<PartialORAResult> = sets
        .sets()
        .par_iter()
        .filter_map(|set| {
            let successes = set
                .genes
                .iter()
                .filter(|gene| reference.contains(*gene))
                .count();
            if successes == 0 {
                debug!("skipping {}: no overlap with the reference", set.id);
                return None;
            }
            if successes < config.min_set_size || successes > config.max_set_size {
                debug!("skipping {}: {} reference genes outside size bounds", set.id, successes);
                return None;
            }
            let overlap = set
                .genes
                .iter()
                .filter(|gene| interest.contains(gene.as_str()))
                .count();
            if overlap == 0 || overlap < config.min_overlap {
                debug!("skipping {}: overlap {} below threshold", set.id, overlap);
                return None;
            }
            let distribution = match Hypergeometric::new(population, successes as u64, draws) {
                Ok(distribution) => distribution,
                Err(e) => {
                    warn!("excluding {}: hypergeometric parameters rejected ({e})", set.id);
                    return None;
                }
            };
            // sf(k-1) gives P(X >= k), the probability of at least the
            // observed overlap.
            let p = distribution.sf(overlap as u64 - 1);
            let expected = draws as f64 * successes as f64 / population as f64;
            Some(PartialORAResult {
                set: set.id.clone(),
                p,
                overlap,
                expected,
            })
        })
        .collect();

    if partials.is_empty() {
        return Ok(Vec::new());
    }

    let p_values: Vec<f64> = partials.iter().map(|partial| partial.p).collect();
    let fdrs = stat::adjust(&p_values, config.adjustment)?;

    let mut results: Vec<ORAResult> = partials
        .drain(..)
        .zip(fdrs)
        .map(|(partial, fdr)| ORAResult {
            set: partial.set,
            p: partial.p,
            fdr,
            overlap: partial.overlap,
            expected: partial.expected,
            enrichment_ratio: partial.overlap as f64 / partial.expected,
        })
        .collect();
    results.sort_by(|a, b| a.fdr.total_cmp(&b.fdr).then_with(|| a.set.cmp(&b.set)));
    Ok(results)
}
