// End-to-end tests for the network analysis and the multi-list
// meta-analysis aggregator.

use anyhow::Result;
use approx::assert_relative_eq;
use rustc_hash::FxHashSet;

use geneset_stats::error::Error;
use geneset_stats::methods::gsea::{GSEAConfig, RankListItem};
use geneset_stats::methods::multilist::{GSEAJob, ORAJob, multilist_gsea, multilist_ora};
use geneset_stats::methods::nta::{NTAConfig, NTAMethod, Network, get_nta};
use geneset_stats::methods::ora::{ORAConfig, get_ora};
use geneset_stats::readers::{GeneSet, GeneSetCollection};
use geneset_stats::stat::{AdjustmentMethod, MetaAnalysisMethod};

fn edge(a: &str, b: &str) -> (String, String) {
    (a.to_string(), b.to_string())
}

fn path_network() -> Network {
    // a - b - c - d
    Network::from_edges(&[edge("a", "b"), edge("b", "c"), edge("c", "d")]).unwrap()
}

#[test]
fn nta_with_zero_restart_probability_returns_the_seeds() -> Result<()> {
    let network = path_network();
    let config = NTAConfig {
        method: NTAMethod::Prioritize(4),
        restart_probability: 0.0,
        ..NTAConfig::default()
    };
    let result = get_nta(&network, &["a".to_string(), "c".to_string()], &config)?;
    // No mass ever leaves the seeds: both keep their initial 0.5.
    assert_eq!(result.candidates, vec!["A".to_string(), "C".to_string()]);
    for score in &result.scores {
        assert_relative_eq!(*score, 0.5, epsilon = 1e-12);
    }
    Ok(())
}

#[test]
fn nta_expansion_ranks_immediate_neighbors_first() -> Result<()> {
    let network = path_network();
    let config = NTAConfig {
        method: NTAMethod::Expand(1),
        restart_probability: 0.5,
        ..NTAConfig::default()
    };
    let result = get_nta(&network, &["a".to_string()], &config)?;
    assert_eq!(result.candidates, vec!["B".to_string()]);
    assert_eq!(result.scores.len(), 1);
    assert!(result.scores[0] > 0.0);
    // Neighborhood is the in-network seeds plus the candidates, sorted.
    assert_eq!(result.neighborhood, vec!["A".to_string(), "B".to_string()]);
    Ok(())
}

#[test]
fn nta_prioritization_prefers_central_seeds() -> Result<()> {
    // Star: HUB touches every other node. Seeding the hub and one leaf,
    // the hub keeps receiving mass from the walk and must rank first.
    let network = Network::from_edges(&[
        edge("hub", "l1"),
        edge("hub", "l2"),
        edge("hub", "l3"),
    ])
    .unwrap();
    let config = NTAConfig {
        method: NTAMethod::Prioritize(2),
        restart_probability: 0.5,
        ..NTAConfig::default()
    };
    let result = get_nta(&network, &["hub".to_string(), "l1".to_string()], &config)?;
    assert_eq!(result.candidates[0], "HUB");
    assert_eq!(result.candidates.len(), 2);
    Ok(())
}

#[test]
fn nta_drops_unknown_seeds_and_rejects_empty_seed_sets() {
    let network = path_network();
    let config = NTAConfig::default();
    let err = get_nta(&network, &["x".to_string(), "y".to_string()], &config).unwrap_err();
    assert!(matches!(err, Error::EmptyInput(_)));

    let err = get_nta(&network, &[], &config).unwrap_err();
    assert!(matches!(err, Error::EmptyInput(_)));
}

#[test]
fn nta_validates_restart_probability() {
    let network = path_network();
    let config = NTAConfig {
        restart_probability: 1.5,
        ..NTAConfig::default()
    };
    let err = get_nta(&network, &["a".to_string()], &config).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

fn gene(i: usize) -> String {
    format!("G{i:02}")
}

fn to_set(genes: impl IntoIterator<Item = String>) -> FxHashSet<String> {
    genes.into_iter().collect()
}

fn shared_sets() -> GeneSetCollection {
    GeneSetCollection::from_sets(vec![
        GeneSet::new("SET_A", "top five", (1..=5).map(gene)),
        GeneSet::new("SET_B", "ten through nineteen", (10..=19).map(gene)),
    ])
    .unwrap()
}

fn ora_job() -> ORAJob {
    ORAJob {
        gene_list: to_set((1..=5).map(gene).chain([gene(10)])),
        reference: to_set((1..=20).map(gene)),
        sets: shared_sets(),
        config: ORAConfig {
            min_overlap: 1,
            min_set_size: 1,
            max_set_size: 100,
            adjustment: AdjustmentMethod::BenjaminiHochberg,
        },
    }
}

#[test]
fn meta_ora_with_one_list_reproduces_the_single_run() -> Result<()> {
    let job = ora_job();
    let single = get_ora(&job.gene_list, &job.reference, &job.sets, &job.config)?;
    let analysis = multilist_ora(
        std::slice::from_ref(&job),
        MetaAnalysisMethod::Stouffer,
        AdjustmentMethod::BenjaminiHochberg,
    )?;

    assert_eq!(analysis.individual.len(), 1);
    assert_eq!(analysis.meta.len(), single.len());
    for (meta, expected) in analysis.meta.iter().zip(single.iter()) {
        assert_eq!(meta.set, expected.set);
        assert_eq!(meta.p, expected.p, "N=1 combination must be exact");
        assert_eq!(meta.fdr, expected.fdr);
        assert_eq!(meta.individual_p, vec![expected.p]);
    }
    Ok(())
}

#[test]
fn meta_ora_combines_concordant_lists() -> Result<()> {
    let jobs = vec![ora_job(), ora_job()];
    let analysis = multilist_ora(
        &jobs,
        MetaAnalysisMethod::Stouffer,
        AdjustmentMethod::BenjaminiHochberg,
    )?;

    let single = &analysis.individual[0];
    let set_a_single = single.iter().find(|r| r.set == "SET_A").unwrap();
    let set_a_meta = analysis.meta.iter().find(|r| r.set == "SET_A").unwrap();
    assert_eq!(set_a_meta.individual_p.len(), 2);
    assert!(
        set_a_meta.p < set_a_single.p,
        "two concordant significant lists must combine more sharply: {} vs {}",
        set_a_meta.p,
        set_a_single.p
    );
    Ok(())
}

#[test]
fn meta_ora_skips_sets_missing_from_one_list() -> Result<()> {
    let mut strict = ora_job();
    // SET_B only overlaps the interest list in one gene; the stricter
    // job drops it, so it cannot be combined.
    strict.config.min_overlap = 2;
    let jobs = vec![ora_job(), strict];
    let analysis = multilist_ora(
        &jobs,
        MetaAnalysisMethod::Stouffer,
        AdjustmentMethod::BenjaminiHochberg,
    )?;
    assert!(analysis.meta.iter().any(|r| r.set == "SET_A"));
    assert!(analysis.meta.iter().all(|r| r.set != "SET_B"));
    Ok(())
}

#[test]
fn meta_ora_rejects_mismatched_collections() {
    let mut other = ora_job();
    other.sets = GeneSetCollection::from_sets(vec![GeneSet::new(
        "DIFFERENT",
        "another collection",
        (1..=5).map(gene),
    )])
    .unwrap();
    let jobs = vec![ora_job(), other];
    let err = multilist_ora(
        &jobs,
        MetaAnalysisMethod::Stouffer,
        AdjustmentMethod::BenjaminiHochberg,
    )
    .unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch(_)));
}

#[test]
fn meta_gsea_with_one_list_reproduces_the_single_run() -> Result<()> {
    let rank_list: Vec<RankListItem> = (1..=20)
        .map(|i| RankListItem {
            analyte: gene(i),
            score: 10.0 - i as f64,
        })
        .collect();
    let job = GSEAJob {
        rank_list,
        sets: shared_sets(),
        config: GSEAConfig {
            permutations: 100,
            min_set_size: 2,
            max_set_size: 20,
            seed: Some(7),
            ..GSEAConfig::default()
        },
    };
    let analysis = multilist_gsea(
        std::slice::from_ref(&job),
        MetaAnalysisMethod::Fisher,
        AdjustmentMethod::BenjaminiHochberg,
    )?;
    assert_eq!(analysis.meta.len(), analysis.individual[0].len());
    for (meta, expected) in analysis.meta.iter().zip(analysis.individual[0].iter()) {
        assert_eq!(meta.set, expected.set);
        assert_eq!(meta.p, expected.p);
        assert_eq!(meta.fdr, expected.fdr);
    }
    Ok(())
}
