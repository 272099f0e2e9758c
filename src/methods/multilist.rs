//! Meta-analysis across multiple input lists.
//!
//! Runs N independent ORA or GSEA jobs against the same gene-set
//! collection and combines the per-set p-values into a single combined
//! record per set. With one job the combined results reproduce the
//! single-list run exactly.

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::methods::EnrichmentRecord;
use crate::methods::gsea::{self, GSEAConfig, GSEAResult, RankListItem};
use crate::methods::ora::{self, ORAConfig, ORAResult};
use crate::readers::utils::GeneSetCollection;
use crate::stat::{self, AdjustmentMethod, MetaAnalysisMethod};

/// One ORA input list with its own reference and configuration.
#[derive(Debug, Clone)]
pub struct ORAJob {
    pub gene_list: FxHashSet<String>,
    pub reference: FxHashSet<String>,
    pub sets: GeneSetCollection,
    pub config: ORAConfig,
}

/// One GSEA input list with its configuration.
#[derive(Debug, Clone)]
pub struct GSEAJob {
    pub rank_list: Vec<RankListItem>,
    pub sets: GeneSetCollection,
    pub config: GSEAConfig,
}

/// Combined record for one gene set across all input lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaResult {
    pub set: String,
    /// Combined p-value across lists.
    pub p: f64,
    /// Adjusted combined p-value across all combined sets.
    pub fdr: f64,
    /// The per-list raw p-values that were combined, in job order.
    pub individual_p: Vec<f64>,
}

/// Output of a multi-list run: the combined records plus each list's
/// own results, in job order.
#[derive(Debug, Clone)]
pub struct MetaAnalysis<R> {
    pub meta: Vec<MetaResult>,
    pub individual: Vec<Vec<R>>,
}

/// Run N ORA jobs and combine their per-set p-values.
///
/// All jobs must test the same gene-set collection; otherwise the call
/// fails with [`Error::DimensionMismatch`].
pub fn multilist_ora(
    jobs: &[ORAJob],
    method: MetaAnalysisMethod,
    adjustment: AdjustmentMethod,
) -> Result<MetaAnalysis<ORAResult>> {
    ensure_shared_collection(jobs.iter().map(|job| &job.sets))?;
    let individual: Vec<Vec<ORAResult>> = jobs
        .iter()
        .map(|job| ora::get_ora(&job.gene_list, &job.reference, &job.sets, &job.config))
        .collect::<Result<_>>()?;
    let meta = combine_records(&individual, method, adjustment)?;
    Ok(MetaAnalysis { meta, individual })
}

/// Run N GSEA jobs and combine their per-set p-values.
///
/// All jobs must test the same gene-set collection; otherwise the call
/// fails with [`Error::DimensionMismatch`].
pub fn multilist_gsea(
    jobs: &[GSEAJob],
    method: MetaAnalysisMethod,
    adjustment: AdjustmentMethod,
) -> Result<MetaAnalysis<GSEAResult>> {
    ensure_shared_collection(jobs.iter().map(|job| &job.sets))?;
    let individual: Vec<Vec<GSEAResult>> = jobs
        .iter()
        .map(|job| gsea::gsea(&job.rank_list, &job.sets, &job.config))
        .collect::<Result<_>>()?;
    let meta = combine_records(&individual, method, adjustment)?;
    Ok(MetaAnalysis { meta, individual })
}

fn ensure_shared_collection<'a>(
    mut collections: impl Iterator<Item = &'a GeneSetCollection>,
) -> Result<()> {
    let first = collections
        .next()
        .ok_or_else(|| Error::EmptyInput("no jobs supplied".into()))?;
    let reference_ids = first.sorted_ids();
    for (offset, collection) in collections.enumerate() {
        if collection.sorted_ids() != reference_ids {
            return Err(Error::DimensionMismatch(format!(
                "job {} does not share the gene-set collection of job 0",
                offset + 1
            )));
        }
    }
    Ok(())
}

/// Combine per-set p-values over the sets tested in every list. Sets
/// dropped by a per-list threshold in some list cannot be combined and
/// are skipped with a log entry.
fn combine_records<R: EnrichmentRecord>(
    individual: &[Vec<R>],
    method: MetaAnalysisMethod,
    adjustment: AdjustmentMethod,
) -> Result<Vec<MetaResult>> {
    let list_count = individual.len();
    let mut order: Vec<&str> = Vec::new();
    let mut per_set: FxHashMap<&str, Vec<f64>> = FxHashMap::default();
    for record in &individual[0] {
        order.push(record.set_id());
        per_set.insert(record.set_id(), vec![record.p_value()]);
    }
    for results in &individual[1..] {
        for record in results {
            if let Some(p_values) = per_set.get_mut(record.set_id()) {
                p_values.push(record.p_value());
            }
        }
    }

    let mut combined: Vec<(String, f64, Vec<f64>)> = Vec::new();
    for set in order {
        let p_values = &per_set[set];
        if p_values.len() < list_count {
            debug!("skipping {set} in meta-analysis: tested in {}/{list_count} lists", p_values.len());
            continue;
        }
        let p = stat::combine_p_values(p_values, method)?;
        combined.push((set.to_string(), p, p_values.clone()));
    }

    if combined.is_empty() {
        return Ok(Vec::new());
    }

    let combined_p: Vec<f64> = combined.iter().map(|(_, p, _)| *p).collect();
    let fdrs = stat::adjust(&combined_p, adjustment)?;

    let mut meta: Vec<MetaResult> = combined
        .into_iter()
        .zip(fdrs)
        .map(|((set, p, individual_p), fdr)| MetaResult {
            set,
            p,
            fdr,
            individual_p,
        })
        .collect();
    meta.sort_by(|a, b| a.fdr.total_cmp(&b.fdr).then_with(|| a.set.cmp(&b.set)));
    Ok(meta)
}
