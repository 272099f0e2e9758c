//! Network topology-based analysis.
//!
//! A random walk with restart over an undirected gene-gene interaction
//! network, started from a uniform distribution over the seed nodes.
//! The converged walk probabilities rank either the seeds themselves
//! (prioritization) or the rest of the network (expansion).

use log::debug;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use ndarray::Array1;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::readers::utils::normalize_analyte;

/// An undirected gene-gene interaction network. Nodes are interned in
/// insertion order; the adjacency is symmetric CSR with unit edge
/// weights.
#[derive(Debug, Clone)]
pub struct Network {
    nodes: Vec<String>,
    index: FxHashMap<String, usize>,
    adjacency: CsrMatrix<f64>,
    degrees: Vec<f64>,
}

impl Network {
    /// Build a network from an edge list. Identifiers are normalized,
    /// duplicate and reversed edges collapse into one, self-loops are
    /// dropped. Fails with [`Error::EmptyInput`] when no usable edge
    /// remains.
    pub fn from_edges(edges: &[(String, String)]) -> Result<Self> {
        fn intern(
            analyte: String,
            nodes: &mut Vec<String>,
            index: &mut FxHashMap<String, usize>,
        ) -> usize {
            *index.entry(analyte.clone()).or_insert_with(|| {
                nodes.push(analyte);
                nodes.len() - 1
            })
        }

        let mut nodes: Vec<String> = Vec::new();
        let mut index: FxHashMap<String, usize> = FxHashMap::default();
        let mut unique_edges: FxHashSet<(usize, usize)> = FxHashSet::default();

        for (source, target) in edges {
            let source = normalize_analyte(source);
            let target = normalize_analyte(target);
            if source.is_empty() || target.is_empty() {
                continue;
            }
            if source == target {
                debug!("dropping self-loop at {source}");
                continue;
            }
            let a = intern(source, &mut nodes, &mut index);
            let b = intern(target, &mut nodes, &mut index);
            unique_edges.insert((a.min(b), a.max(b)));
        }

        if unique_edges.is_empty() {
            return Err(Error::EmptyInput("no usable edges in the network".into()));
        }

        let n = nodes.len();
        let mut coo = CooMatrix::new(n, n);
        for &(a, b) in &unique_edges {
            coo.push(a, b, 1.0);
            coo.push(b, a, 1.0);
        }
        let adjacency = CsrMatrix::from(&coo);

        let mut degrees = vec![0.0; n];
        for (row, _, value) in adjacency.triplet_iter() {
            degrees[row] += value;
        }

        Ok(Network {
            nodes,
            index,
            adjacency,
            degrees,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, analyte: &str) -> bool {
        self.index.contains_key(analyte)
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// One step of the degree-normalized walk: `W p` with
    /// `W[i][j] = a_ij / degree(j)`.
    fn propagate(&self, p: &Array1<f64>) -> Array1<f64> {
        let mut next = Array1::zeros(self.nodes.len());
        for (row, column, value) in self.adjacency.triplet_iter() {
            next[row] += value * p[column] / self.degrees[column];
        }
        next
    }
}

/// What the analysis should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NTAMethod {
    /// The n seed nodes most likely to be visited by the walk.
    Prioritize(usize),
    /// The n non-seed nodes most likely to be visited by the walk.
    Expand(usize),
}

/// Configuration for a single NTA run.
#[derive(Debug, Clone)]
pub struct NTAConfig {
    pub method: NTAMethod,
    /// Fraction of probability mass that continues along network edges
    /// at each step; the remainder returns to the seed distribution. At
    /// `0.0` the walk never leaves the seeds and the scores reproduce
    /// the initial seed distribution.
    pub restart_probability: f64,
    /// L1 convergence threshold for the walk.
    pub tolerance: f64,
    /// Iteration cap; exceeding it is a computation error.
    pub max_iterations: usize,
}

impl Default for NTAConfig {
    fn default() -> Self {
        NTAConfig {
            method: NTAMethod::Prioritize(10),
            restart_probability: 0.5,
            tolerance: 1e-6,
            max_iterations: 100,
        }
    }
}

/// NTA output: the selected candidates with their walk probabilities,
/// and the neighborhood (in-network seeds plus candidates, sorted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NTAResult {
    pub candidates: Vec<String>,
    pub scores: Vec<f64>,
    pub neighborhood: Vec<String>,
}

/// Run a random walk with restart from the seed list and select
/// candidates according to the configured method.
///
/// Seeds absent from the network are dropped with a log entry; if none
/// remain the call fails with [`Error::EmptyInput`]. Candidate ties are
/// broken by node id so the ranking is deterministic.
pub fn get_nta(network: &Network, seeds: &[String], config: &NTAConfig) -> Result<NTAResult> {
    if !(0.0..=1.0).contains(&config.restart_probability) {
        return Err(Error::InvalidInput(format!(
            "restart probability must be within [0, 1], got {}",
            config.restart_probability
        )));
    }
    if config.tolerance <= 0.0 {
        return Err(Error::InvalidInput("tolerance must be positive".into()));
    }
    if seeds.is_empty() {
        return Err(Error::EmptyInput("seed list is empty".into()));
    }

    let mut seed_indices: FxHashSet<usize> = FxHashSet::default();
    for seed in seeds {
        let seed = normalize_analyte(seed);
        match network.index.get(&seed) {
            Some(&position) => {
                seed_indices.insert(position);
            }
            None => debug!("dropping seed {seed}: not in the network"),
        }
    }
    if seed_indices.is_empty() {
        return Err(Error::EmptyInput(
            "none of the seed analytes are present in the network".into(),
        ));
    }

    let n = network.len();
    let mut p0 = Array1::zeros(n);
    let seed_mass = 1.0 / seed_indices.len() as f64;
    for &position in &seed_indices {
        p0[position] = seed_mass;
    }

    let walk = config.restart_probability;
    let mut p = p0.clone();
    let mut converged = false;
    for _ in 0..config.max_iterations {
        let mut next = network.propagate(&p);
        next *= walk;
        next.scaled_add(1.0 - walk, &p0);
        let shift = (&next - &p).mapv(f64::abs).sum();
        p = next;
        if shift < config.tolerance {
            converged = true;
            break;
        }
    }
    if !converged {
        return Err(Error::Computation(format!(
            "random walk did not converge within {} iterations",
            config.max_iterations
        )));
    }

    let (pool, wanted): (Vec<usize>, usize) = match config.method {
        NTAMethod::Prioritize(wanted) => {
            ((0..n).filter(|position| seed_indices.contains(position)).collect(), wanted)
        }
        NTAMethod::Expand(wanted) => {
            let pool = (0..n)
                .filter(|position| !seed_indices.contains(position) && p[*position] > 0.0)
                .collect();
            (pool, wanted)
        }
    };

    let mut ranked: Vec<usize> = pool;
    ranked.sort_by(|&a, &b| {
        p[b].total_cmp(&p[a])
            .then_with(|| network.nodes[a].cmp(&network.nodes[b]))
    });
    ranked.truncate(wanted);

    let candidates: Vec<String> = ranked
        .iter()
        .map(|&position| network.nodes[position].clone())
        .collect();
    let scores: Vec<f64> = ranked.iter().map(|&position| p[position]).collect();

    let mut neighborhood: Vec<String> = seed_indices
        .iter()
        .map(|&position| network.nodes[position].clone())
        .chain(candidates.iter().cloned())
        .collect::<FxHashSet<String>>()
        .into_iter()
        .collect();
    neighborhood.sort_unstable();

    Ok(NTAResult {
        candidates,
        scores,
        neighborhood,
    })
}
