//! # geneset-stats
//!
//! A specialized Rust library for gene-set enrichment statistics, the
//! computational core behind pathway-analysis toolchains.
//!
//! This crate provides statistical methods for testing gene lists against
//! curated gene-set collections: over-representation analysis against a
//! background universe, rank-based gene-set enrichment analysis with
//! permutation significance, network-topology analysis over interaction
//! networks, and meta-analysis aggregation across multiple input lists.
//! Per-set computations run on the rayon thread pool.
//!
//! ## Core Features
//!
//! - **ORA**: hypergeometric over-representation with configurable overlap
//!   thresholds and multiple-testing correction
//! - **GSEA**: weighted Kolmogorov-Smirnov enrichment scores, leading-edge
//!   extraction, and a seeded permutation null
//! - **NTA**: random-walk-with-restart prioritization and expansion over
//!   gene-gene interaction networks
//! - **Meta-Analysis**: Stouffer and Fisher p-value combination across
//!   independent lists
//!
//! ## Quick Start
//!
//! Parse a GMT file, an interest list and a reference list with the
//! [`readers`] module, then hand them to [`methods::ora::get_ora`]. The
//! other methods follow the same pattern: parsed inputs in, ordered
//! result records out.
//!
//! ## Module Organization
//!
//! - **[`readers`]**: file ingestion and the indexed gene-set store
//! - **[`methods`]**: the ORA, GSEA, NTA and multi-list engines
//! - **[`stat`]**: multiple-testing correction and p-value combination
//! - **[`error`]**: the crate-wide error type

pub mod error;
pub mod methods;
pub mod readers;
pub mod stat;
