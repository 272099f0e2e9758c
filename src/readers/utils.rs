use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Normalize a gene identifier for comparison across lists, sets and
/// reference inputs. Surrounding whitespace is dropped and the identifier
/// is upper-cased.
pub fn normalize_analyte(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// A single gene set: identifier, free-text description and its member
/// genes. Members are normalized and deduplicated at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneSet {
    pub id: String,
    pub description: String,
    pub genes: Vec<String>,
}

impl GeneSet {
    pub fn new(id: &str, description: &str, members: impl IntoIterator<Item = String>) -> Self {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut genes = Vec::new();
        for member in members {
            let gene = normalize_analyte(&member);
            if !gene.is_empty() && seen.insert(gene.clone()) {
                genes.push(gene);
            }
        }
        GeneSet {
            id: normalize_analyte(id),
            description: description.to_string(),
            genes,
        }
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }
}

/// The gene-set store: an ordered collection of [`GeneSet`]s indexed by
/// set identifier.
#[derive(Debug, Clone)]
pub struct GeneSetCollection {
    sets: Vec<GeneSet>,
    index: FxHashMap<String, usize>,
}

impl GeneSetCollection {
    /// Build a collection from parsed sets. Fails with
    /// [`Error::InvalidInput`] on a duplicate set identifier and with
    /// [`Error::EmptyInput`] when no sets are supplied.
    pub fn from_sets(sets: Vec<GeneSet>) -> Result<Self> {
        if sets.is_empty() {
            return Err(Error::EmptyInput("no gene sets supplied".into()));
        }
        let mut index = FxHashMap::default();
        for (position, set) in sets.iter().enumerate() {
            if index.insert(set.id.clone(), position).is_some() {
                return Err(Error::InvalidInput(format!(
                    "duplicate gene set identifier: {}",
                    set.id
                )));
            }
        }
        Ok(GeneSetCollection { sets, index })
    }

    pub fn get(&self, id: &str) -> Option<&GeneSet> {
        self.index.get(id).map(|&position| &self.sets[position])
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneSet> {
        self.sets.iter()
    }

    pub fn sets(&self) -> &[GeneSet] {
        &self.sets
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Set identifiers, sorted. Used to compare collections across
    /// meta-analysis jobs.
    pub fn sorted_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.sets.iter().map(|set| set.id.as_str()).collect();
        ids.sort_unstable();
        ids
    }
}
