//! Enrichment analysis methods.
//!
//! Each method is stateless per invocation: inputs are validated, the
//! per-set statistics are computed (in parallel where the work is
//! embarrassingly parallel), and an ordered result vector is returned.
//!
//! - **[`ora`]**: Over-Representation Analysis using hypergeometric testing
//! - **[`gsea`]**: Gene Set Enrichment Analysis over a ranked list with
//!   permutation significance
//! - **[`nta`]**: Network Topology-based Analysis via random walk with restart
//! - **[`multilist`]**: meta-analysis aggregation across multiple input lists

pub mod gsea;
pub mod multilist;
pub mod nta;
pub mod ora;

/// Common view over per-set enrichment records, the seam the
/// meta-analysis aggregator combines across result types.
pub trait EnrichmentRecord {
    fn set_id(&self) -> &str;
    fn p_value(&self) -> f64;
}
