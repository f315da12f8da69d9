//! Integration tests for genotype imputation.
//!
//! These tests verify end-to-end behavior from genotype tables on disk
//! through imputation, evaluation and reporting.

use geno_impute::{
    AllMissingPolicy, Alphabet, DistanceMetric, EvaluationPlan, GenotypeMatrix, ImputationError,
    ImputationReport, ImputationStage, ImputerConfig, KnnImputer, LocusStatus, ProgressUpdate,
    ShortfallPolicy, TableOptions, TieBreak, accuracy, mask_locus, read_genotype_table, tune_k,
    write_genotype_table,
};
use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_tsv(filename: &str) -> GenotypeMatrix {
    read_genotype_table(fixtures_path().join(filename), &TableOptions::default())
        .expect("Failed to read genotype table")
}

fn matrix(rows: Vec<Vec<i8>>) -> GenotypeMatrix {
    GenotypeMatrix::from_codes(&rows, i8::MIN, Alphabet::biallelic())
        .expect("Failed to build matrix")
}

/// Two groups of three samples; each group is near-constant across loci.
fn correlated_6x5() -> GenotypeMatrix {
    matrix(vec![
        vec![-1, -1, -1, -1, -1],
        vec![-1, -1, -1, -1, 0],
        vec![-1, -1, -1, 0, -1],
        vec![1, 1, 1, 1, 1],
        vec![1, 1, 1, 1, 0],
        vec![1, 1, 1, 0, 1],
    ])
}

fn config(k: usize) -> ImputerConfig {
    ImputerConfig::builder().n_neighbors(k).build().unwrap()
}

// ============================================================================
// Fixture Imputation Tests
// ============================================================================

#[test]
fn test_dogs_fixture_loads() {
    let m = load_tsv("dogs.tsv");
    assert_eq!(m.shape(), (10, 8));
    assert_eq!(m.sample_ids()[0], "dog_1");
    assert_eq!(m.locus_ids()[7], "rs8");
    assert_eq!(m.missing_count(), 9);
}

#[test]
fn test_dogs_fixture_imputes_within_groups() {
    let m = load_tsv("dogs.tsv");
    let outcome = KnnImputer::new(3).impute(&m).unwrap();

    assert!(outcome.is_complete());
    assert_eq!(outcome.imputed_count(), 9);

    // dog_1..dog_5 are mostly AA, dog_6..dog_10 mostly BB
    for p in &outcome.predictions {
        let expected = if p.sample < 5 { -1 } else { 1 };
        assert_eq!(
            p.value, expected,
            "sample {} locus {} imputed from neighbors {:?}",
            p.sample, p.locus, p.neighbors
        );
        assert_eq!(p.neighbors.len(), 3);
    }

    // dog_5 at rs7: neighbors dog_2 (AB), dog_1 (AA), dog_3 (AA)
    let p = outcome
        .predictions
        .iter()
        .find(|p| p.sample == 4 && p.locus == 6)
        .unwrap();
    assert_eq!(p.neighbors, vec![1, 0, 2]);
    assert!((p.confidence - 2.0 / 3.0).abs() < 1e-12);
}

#[test]
fn test_observed_cells_are_preserved() {
    let m = load_tsv("dogs.tsv");
    let outcome = KnnImputer::new(3).impute(&m).unwrap();

    for sample in 0..m.n_samples() {
        for locus in 0..m.n_loci() {
            if let Some(value) = m.get(sample, locus) {
                assert_eq!(outcome.matrix.get(sample, locus), Some(value));
            }
        }
    }
}

#[test]
fn test_impute_locus_matches_full_run() {
    let m = load_tsv("dogs.tsv");
    let imputer = KnnImputer::new(3);
    let outcome = imputer.impute(&m).unwrap();

    for locus in 0..m.n_loci() {
        let single = imputer.impute_locus(&m, locus).unwrap();
        assert_eq!(single.column, outcome.matrix.column(locus));
    }
}

// ============================================================================
// Edge Case Tests
// ============================================================================

#[test]
fn test_all_missing_locus_skipped() {
    let m = load_tsv("unresolved.tsv");
    assert_eq!(m.missing_in_locus(1), 4);

    let outcome = KnnImputer::new(2).impute(&m).unwrap();
    assert!(!outcome.is_complete());
    assert_eq!(outcome.unresolved, vec![1]);
    assert_eq!(outcome.loci[1].status, LocusStatus::Unresolved);
    assert_eq!(outcome.loci[0].status, LocusStatus::Complete);
    assert!(outcome.matrix.column(1).iter().all(Option::is_none));
}

#[test]
fn test_all_missing_locus_fails_when_configured() {
    let m = load_tsv("unresolved.tsv");
    let config = ImputerConfig::builder()
        .n_neighbors(2)
        .all_missing(AllMissingPolicy::Fail)
        .build()
        .unwrap();

    let err = KnnImputer::from_config(config).unwrap().impute(&m).unwrap_err();
    assert!(matches!(err, ImputationError::AllMissingColumn { locus: 1 }));
    assert_eq!(err.error_code(), "ALL_MISSING_COLUMN");
}

#[test]
fn test_k_equal_to_observed_uses_every_sample() {
    // 3 observed samples at locus 0, k = 3
    let m = GenotypeMatrix::new(
        vec![
            vec![None, Some(0)],
            vec![Some(1), Some(0)],
            vec![Some(1), Some(-1)],
            vec![Some(-1), Some(1)],
        ],
        Alphabet::biallelic(),
    )
    .unwrap();

    let result = KnnImputer::new(3).impute_locus(&m, 0).unwrap();
    assert_eq!(result.effective_k, Some(3));
    assert_eq!(result.column[0], Some(1));
    assert_eq!(result.predictions[0].neighbors.len(), 3);
}

#[test]
fn test_k_above_observed_clamps_or_fails() {
    let m = GenotypeMatrix::new(
        vec![
            vec![None, Some(0)],
            vec![Some(1), Some(0)],
            vec![Some(-1), Some(1)],
        ],
        Alphabet::biallelic(),
    )
    .unwrap();

    let clamped = KnnImputer::new(5).impute_locus(&m, 0).unwrap();
    assert_eq!(clamped.effective_k, Some(2));
    // 1 vs -1 tie; sample 1 is nearer but lowest code wins
    assert_eq!(clamped.column[0], Some(-1));

    let strict = ImputerConfig::builder()
        .n_neighbors(5)
        .shortfall(ShortfallPolicy::Fail)
        .tie_break(TieBreak::NearestNeighbor)
        .build()
        .unwrap();
    let err = KnnImputer::from_config(strict)
        .unwrap()
        .impute_locus(&m, 0)
        .unwrap_err();
    assert!(matches!(
        err,
        ImputationError::InsufficientNeighbors {
            locus: 0,
            available: 2,
            requested: 5
        }
    ));
}

#[test]
fn test_matrix_without_missing_is_unchanged() {
    let m = correlated_6x5();
    let outcome = KnnImputer::new(3).impute(&m).unwrap();
    assert_eq!(outcome.matrix, m);
    assert!(outcome.predictions.is_empty());
    assert_eq!(outcome.mean_confidence(), None);
}

#[test]
fn test_invalid_category_in_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.tsv");
    std::fs::write(&path, "sample\trs1\trs2\na\tAA\t2\n").unwrap();

    let err = read_genotype_table(&path, &TableOptions::default()).unwrap_err();
    assert!(err.is_invalid_input());
    assert!(err.to_string().contains("bad.tsv"));
}

// ============================================================================
// Determinism Tests
// ============================================================================

#[test]
fn test_repeated_runs_are_identical() {
    let m = load_tsv("dogs.tsv");
    let imputer = KnnImputer::new(3);
    let first = imputer.impute(&m).unwrap();
    let second = imputer.impute(&m).unwrap();
    assert_eq!(first.matrix, second.matrix);
    assert_eq!(first.predictions, second.predictions);
}

#[test]
fn test_parallel_matches_sequential() {
    let m = load_tsv("dogs.tsv");
    for metric in [DistanceMetric::Mismatch, DistanceMetric::NormalizedMismatch] {
        let run = |parallel: bool, threads: Option<usize>| {
            let mut builder = ImputerConfig::builder()
                .n_neighbors(3)
                .metric(metric)
                .parallel(parallel);
            if let Some(n) = threads {
                builder = builder.num_threads(n);
            }
            KnnImputer::from_config(builder.build().unwrap())
                .unwrap()
                .impute(&m)
                .unwrap()
        };

        let sequential = run(false, None);
        let parallel = run(true, None);
        let pooled = run(true, Some(2));
        assert_eq!(sequential.matrix, parallel.matrix);
        assert_eq!(sequential.predictions, parallel.predictions);
        assert_eq!(sequential.matrix, pooled.matrix);
    }
}

// ============================================================================
// Accuracy Tests
// ============================================================================

#[test]
fn test_accuracy_beats_chance_on_correlated_matrix() {
    let truth = correlated_6x5();
    let imputer = KnnImputer::new(3);
    let mut rng = StdRng::seed_from_u64(7);

    let repetitions = 100;
    let mut total = 0.0;
    for _ in 0..repetitions {
        let masked = mask_locus(&truth, 0, 2, &mut rng).unwrap();
        let outcome = imputer.impute(&masked).unwrap();
        let score = accuracy(&truth, &masked, &outcome.matrix).unwrap();
        assert_eq!(score.total, 2);
        total += score.value().unwrap();
    }

    let mean = total / repetitions as f64;
    assert!(mean > 1.0 / 3.0, "mean accuracy {mean} not above chance");
}

#[test]
fn test_tune_k_on_fixture() {
    let m = load_tsv("dogs.tsv");
    let plan = EvaluationPlan {
        mask_fraction: 0.1,
        repetitions: 5,
        seed: 11,
    };

    let search = tune_k(&m, &ImputerConfig::default(), &[5, 1, 3, 3], &plan).unwrap();
    let ks: Vec<usize> = search.results.iter().map(|r| r.n_neighbors).collect();
    assert_eq!(ks, vec![1, 3, 5]);
    assert!(ks.contains(&search.best_k));

    for report in &search.results {
        assert_eq!(report.scores.len(), 5);
        assert!(report.mean_accuracy > report.chance_level);
    }

    // Same seed, same result
    let again = tune_k(&m, &ImputerConfig::default(), &[1, 3, 5], &plan).unwrap();
    assert_eq!(search, again);
}

// ============================================================================
// File Round Trip and Reporting Tests
// ============================================================================

#[test]
fn test_impute_write_and_reread() {
    let m = load_tsv("dogs.tsv");
    let outcome = KnnImputer::new(3).impute(&m).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out/dogs_imputed.tsv");
    write_genotype_table(&outcome.matrix, &path, b'\t').unwrap();

    let reread = read_genotype_table(&path, &TableOptions::default()).unwrap();
    assert_eq!(reread, outcome.matrix);
    assert_eq!(reread.sample_ids(), m.sample_ids());
}

#[test]
fn test_unresolved_written_as_na() {
    let m = load_tsv("unresolved.tsv");
    let outcome = KnnImputer::new(2).impute(&m).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unresolved_imputed.tsv");
    write_genotype_table(&outcome.matrix, &path, b'\t').unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let first_row = text.lines().nth(1).unwrap();
    assert_eq!(first_row, "1\t-1\tNA\t0");
}

#[test]
fn test_report_written_for_run() {
    let m = load_tsv("unresolved.tsv");
    let config = config(2);
    let outcome = KnnImputer::from_config(config.clone())
        .unwrap()
        .impute(&m)
        .unwrap();

    let report = ImputationReport::build(
        &outcome,
        &config,
        Duration::from_millis(3),
        Some("unresolved.tsv"),
        Some("unresolved_imputed.tsv"),
    );
    assert_eq!(report.missing_before, 4);
    assert_eq!(report.missing_after, 4);
    assert_eq!(report.unresolved_loci, vec!["m2".to_string()]);

    let dir = tempfile::tempdir().unwrap();
    let path = report.write_to_dir(dir.path(), "unresolved").unwrap();
    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(parsed["config"]["n_neighbors"], 2);
    assert_eq!(parsed["unresolved_loci"][0], "m2");
}

// ============================================================================
// Progress Tests
// ============================================================================

#[test]
fn test_progress_reaches_complete() {
    let updates: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&updates);

    let m = load_tsv("dogs.tsv");
    let sequential = ImputerConfig::builder().parallel(false).build().unwrap();
    KnnImputer::from_config(sequential)
        .unwrap()
        .on_progress(move |update| sink.lock().unwrap().push(update))
        .impute(&m)
        .unwrap();

    let updates = updates.lock().unwrap();
    assert!(!updates.is_empty());
    assert_eq!(updates.last().unwrap().stage, ImputationStage::Complete);
    assert!(
        updates
            .windows(2)
            .all(|w| w[0].progress <= w[1].progress + 1e-9)
    );
}
