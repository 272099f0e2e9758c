//! File ingestion for enrichment analyses.
//!
//! Four delimited formats are supported, mirroring what the enrichment
//! methods consume:
//!
//! - **GMT** gene-set membership files (`set_id <tab> description <tab>
//!   gene...`), loaded into an indexed [`GeneSetCollection`];
//! - plain gene lists, one identifier per line;
//! - ranked lists, `identifier <ws> score` per line;
//! - network edge lists, `source <ws> target` per line.
//!
//! All readers normalize identifiers (trim + upper-case) so that list,
//! set and reference inputs compare consistently, fail with
//! [`Error::Parse`] on malformed rows, and with [`Error::EmptyInput`]
//! when a file yields no records.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::debug;
use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::methods::gsea::RankListItem;

pub mod utils;

pub use utils::{GeneSet, GeneSetCollection, normalize_analyte};

fn open_lines(path: &Path) -> Result<impl Iterator<Item = std::io::Result<String>>> {
    let file = File::open(path)?;
    Ok(BufReader::new(file).lines())
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// Read a GMT gene-set membership file into a [`GeneSetCollection`].
///
/// Each row must carry a set identifier, a description and at least one
/// member gene, tab-separated. Duplicate set identifiers and rows with
/// fewer than three fields are parse errors; blank lines are skipped.
pub fn read_gmt_file(path: impl AsRef<Path>) -> Result<GeneSetCollection> {
    let path = path.as_ref();
    let name = display(path);
    let mut sets = Vec::new();
    let mut ids: FxHashSet<String> = FxHashSet::default();
    for (number, line) in open_lines(path)?.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 {
            return Err(Error::parse(
                &name,
                number + 1,
                format!("expected at least 3 tab-separated fields, found {}", fields.len()),
            ));
        }
        let set = GeneSet::new(fields[0], fields[1], fields[2..].iter().map(|s| s.to_string()));
        if set.is_empty() {
            return Err(Error::parse(&name, number + 1, "gene set has no member genes"));
        }
        if !ids.insert(set.id.clone()) {
            return Err(Error::parse(
                &name,
                number + 1,
                format!("duplicate gene set identifier: {}", set.id),
            ));
        }
        sets.push(set);
    }
    if sets.is_empty() {
        return Err(Error::EmptyInput(format!("no gene sets in {name}")));
    }
    GeneSetCollection::from_sets(sets)
}

/// Read a plain gene list, one identifier per line. Duplicates are
/// dropped (first occurrence wins) and input order is preserved.
pub fn read_single_list(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let name = display(path);
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut analytes = Vec::new();
    for line in open_lines(path)? {
        let analyte = normalize_analyte(&line?);
        if analyte.is_empty() {
            continue;
        }
        if seen.insert(analyte.clone()) {
            analytes.push(analyte);
        } else {
            debug!("dropping duplicate analyte {analyte} in {name}");
        }
    }
    if analytes.is_empty() {
        return Err(Error::EmptyInput(format!("no analytes in {name}")));
    }
    Ok(analytes)
}

/// Read a ranked list (`identifier <ws> score` per line).
///
/// Identifiers must be unique and scores finite; violations are parse
/// errors, since a ranked list with repeated analytes or NaN scores has
/// no well-defined ordering.
pub fn read_rank_file(path: impl AsRef<Path>) -> Result<Vec<RankListItem>> {
    let path = path.as_ref();
    let name = display(path);
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut items = Vec::new();
    for (number, line) in open_lines(path)?.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            return Err(Error::parse(&name, number + 1, "expected `identifier score`"));
        }
        let analyte = normalize_analyte(fields[0]);
        let score: f64 = fields[1].parse().map_err(|_| {
            Error::parse(&name, number + 1, format!("unparsable score `{}`", fields[1]))
        })?;
        if !score.is_finite() {
            return Err(Error::parse(&name, number + 1, format!("non-finite score {score}")));
        }
        if !seen.insert(analyte.clone()) {
            return Err(Error::parse(
                &name,
                number + 1,
                format!("duplicate analyte {analyte} in ranked list"),
            ));
        }
        items.push(RankListItem { analyte, score });
    }
    if items.is_empty() {
        return Err(Error::EmptyInput(format!("no ranked analytes in {name}")));
    }
    Ok(items)
}

/// Read a network edge list (`source <ws> target` per line). Edges are
/// undirected; deduplication happens when the network is built.
pub fn read_edge_list(path: impl AsRef<Path>) -> Result<Vec<(String, String)>> {
    let path = path.as_ref();
    let name = display(path);
    let mut edges = Vec::new();
    for (number, line) in open_lines(path)?.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            return Err(Error::parse(&name, number + 1, "expected `source target`"));
        }
        edges.push((normalize_analyte(fields[0]), normalize_analyte(fields[1])));
    }
    if edges.is_empty() {
        return Err(Error::EmptyInput(format!("no edges in {name}")));
    }
    Ok(edges)
}

/// Read the three ORA inputs in one call: the GMT file, the interest
/// list and the reference (background) list.
pub fn read_ora_files(
    gmt_path: impl AsRef<Path>,
    list_path: impl AsRef<Path>,
    reference_path: impl AsRef<Path>,
) -> Result<(GeneSetCollection, FxHashSet<String>, FxHashSet<String>)> {
    let sets = read_gmt_file(gmt_path)?;
    let list = read_single_list(list_path)?.into_iter().collect();
    let reference = read_single_list(reference_path)?.into_iter().collect();
    Ok((sets, list, reference))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn gmt_round_trip() {
        let file = write_file("pathway1\tglycolysis\tgene1\tGene2\tGENE2\npathway2\ttca cycle\tgene3\n");
        let sets = read_gmt_file(file.path()).unwrap();
        assert_eq!(sets.len(), 2);
        let first = sets.get("PATHWAY1").unwrap();
        // duplicate member collapses after normalization
        assert_eq!(first.genes, vec!["GENE1", "GENE2"]);
        assert_eq!(first.description, "glycolysis");
    }

    #[test]
    fn gmt_rejects_short_rows() {
        let file = write_file("pathway1\tdescription only\n");
        let err = read_gmt_file(file.path()).unwrap_err();
        match err {
            Error::Parse { line, .. } => assert_eq!(line, 1),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn gmt_rejects_duplicate_ids() {
        let file = write_file("p1\td\tg1\np1\td\tg2\n");
        assert!(matches!(read_gmt_file(file.path()), Err(Error::Parse { .. })));
    }

    #[test]
    fn empty_gmt_is_empty_input() {
        let file = write_file("\n\n");
        assert!(matches!(read_gmt_file(file.path()), Err(Error::EmptyInput(_))));
    }

    #[test]
    fn single_list_normalizes_and_dedups() {
        let file = write_file("tp53\n MDM2 \ntp53\n");
        let list = read_single_list(file.path()).unwrap();
        assert_eq!(list, vec!["TP53", "MDM2"]);
    }

    #[test]
    fn rank_file_rejects_duplicates_and_bad_scores() {
        let file = write_file("g1\t1.5\ng1\t2.0\n");
        assert!(matches!(read_rank_file(file.path()), Err(Error::Parse { .. })));

        let file = write_file("g1\tNaN\n");
        assert!(matches!(read_rank_file(file.path()), Err(Error::Parse { .. })));

        let file = write_file("g1\tabc\n");
        assert!(matches!(read_rank_file(file.path()), Err(Error::Parse { line: 1, .. })));
    }

    #[test]
    fn rank_file_parses_scores() {
        let file = write_file("g1\t2.5\ng2\t-1.0\n");
        let items = read_rank_file(file.path()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].analyte, "G1");
        assert_eq!(items[0].score, 2.5);
        assert_eq!(items[1].score, -1.0);
    }

    #[test]
    fn edge_list_needs_two_columns() {
        let file = write_file("a\tb\nc\n");
        assert!(matches!(read_edge_list(file.path()), Err(Error::Parse { line: 2, .. })));
    }
}
