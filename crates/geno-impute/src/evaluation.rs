//! Accuracy evaluation for the imputer.
//!
//! Known genotypes are hidden at random, the masked matrix is imputed, and
//! the imputed values are scored against the hidden truth. Masking is seeded
//! so repeated evaluations see the same cells.
//!
//! # Example
//!
//! ```rust,ignore
//! use geno_impute::evaluation::{EvaluationPlan, tune_k};
//!
//! let search = tune_k(&truth, &ImputerConfig::default(), &[1, 3, 5, 7], &EvaluationPlan::default())?;
//! println!("best k = {}", search.best_k);
//! ```

use crate::config::ImputerConfig;
use crate::error::{ImputationError, Result};
use crate::imputers::KnnImputer;
use crate::types::{GenotypeMatrix, mean};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Imputed-vs-truth agreement over artificially masked cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Accuracy {
    pub correct: usize,
    pub total: usize,
}

impl Accuracy {
    /// Fraction correct, or `None` when nothing was masked.
    pub fn value(&self) -> Option<f64> {
        (self.total > 0).then(|| self.correct as f64 / self.total as f64)
    }
}

/// Score `imputed` against `truth` on the cells that are missing in `masked`
/// but observed in `truth`.
///
/// Cells left unresolved in `imputed` count as incorrect.
pub fn accuracy(
    truth: &GenotypeMatrix,
    masked: &GenotypeMatrix,
    imputed: &GenotypeMatrix,
) -> Result<Accuracy> {
    for other in [masked, imputed] {
        if other.shape() != truth.shape() {
            return Err(ImputationError::ShapeMismatch {
                expected: truth.shape(),
                found: other.shape(),
            });
        }
    }

    let mask = masked.missing_mask();
    let mut score = Accuracy::default();
    for (sample, locus) in mask.positions() {
        let Some(expected) = truth.get(sample, locus) else {
            continue;
        };
        score.total += 1;
        if imputed.get(sample, locus) == Some(expected) {
            score.correct += 1;
        }
    }
    Ok(score)
}

/// Hide a random `fraction` of the observed cells of `matrix`.
///
/// At least one cell is hidden when any cell is observed.
pub fn mask_random<R: Rng + ?Sized>(
    matrix: &GenotypeMatrix,
    fraction: f64,
    rng: &mut R,
) -> Result<GenotypeMatrix> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(ImputationError::InvalidConfig(format!(
            "mask fraction must be in (0, 1], got {}",
            fraction
        )));
    }

    let (n_samples, n_loci) = matrix.shape();
    let observed: Vec<(usize, usize)> = (0..n_samples)
        .flat_map(|sample| (0..n_loci).map(move |locus| (sample, locus)))
        .filter(|&(sample, locus)| !matrix.is_missing(sample, locus))
        .collect();

    let amount = ((observed.len() as f64 * fraction).round() as usize)
        .max(1)
        .min(observed.len());

    let mut masked = matrix.clone();
    for &(sample, locus) in observed.choose_multiple(rng, amount) {
        masked.set(sample, locus, None)?;
    }
    Ok(masked)
}

/// Hide `count` randomly chosen observed genotypes at one locus.
pub fn mask_locus<R: Rng + ?Sized>(
    matrix: &GenotypeMatrix,
    locus: usize,
    count: usize,
    rng: &mut R,
) -> Result<GenotypeMatrix> {
    if locus >= matrix.n_loci() {
        return Err(ImputationError::LocusOutOfRange {
            locus,
            n_loci: matrix.n_loci(),
        });
    }

    let observed: Vec<usize> = (0..matrix.n_samples())
        .filter(|&sample| !matrix.is_missing(sample, locus))
        .collect();
    if count > observed.len() {
        return Err(ImputationError::InvalidConfig(format!(
            "cannot mask {} genotypes at locus {}: only {} observed",
            count,
            locus,
            observed.len()
        )));
    }

    let mut masked = matrix.clone();
    for &sample in observed.choose_multiple(rng, count) {
        masked.set(sample, locus, None)?;
    }
    Ok(masked)
}

/// How to run a repeated mask-and-impute evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationPlan {
    /// Fraction of observed cells hidden per repetition (0.0 - 1.0].
    /// Default: 0.05
    pub mask_fraction: f64,

    /// Number of independent maskings.
    /// Default: 10
    pub repetitions: usize,

    /// RNG seed for the maskings.
    /// Default: 42
    pub seed: u64,
}

impl Default for EvaluationPlan {
    fn default() -> Self {
        Self {
            mask_fraction: 0.05,
            repetitions: 10,
            seed: 42,
        }
    }
}

/// Accuracy of one configuration over all repetitions of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub n_neighbors: usize,
    /// Accuracy per repetition.
    pub scores: Vec<f64>,
    /// Mean of `scores`.
    pub mean_accuracy: f64,
    pub masked_cells: usize,
    pub correct_cells: usize,
    /// Accuracy of guessing uniformly over the alphabet.
    pub chance_level: f64,
}

/// Mask, impute and score `truth` `plan.repetitions` times.
pub fn evaluate(
    truth: &GenotypeMatrix,
    config: &ImputerConfig,
    plan: &EvaluationPlan,
) -> Result<EvaluationReport> {
    if plan.repetitions == 0 {
        return Err(ImputationError::InvalidConfig(
            "evaluation needs at least one repetition".to_string(),
        ));
    }

    let imputer = KnnImputer::from_config(config.clone())?;
    let mut rng = StdRng::seed_from_u64(plan.seed);
    let mut scores = Vec::with_capacity(plan.repetitions);
    let mut total = Accuracy::default();

    for rep in 0..plan.repetitions {
        let masked = mask_random(truth, plan.mask_fraction, &mut rng)?;
        let outcome = imputer.impute(&masked)?;
        let score = accuracy(truth, &masked, &outcome.matrix)?;

        debug!(
            "Repetition {}: {}/{} correct (k={})",
            rep + 1,
            score.correct,
            score.total,
            config.n_neighbors
        );
        if let Some(value) = score.value() {
            scores.push(value);
        }
        total.correct += score.correct;
        total.total += score.total;
    }

    let report = EvaluationReport {
        n_neighbors: config.n_neighbors,
        mean_accuracy: mean(scores.iter().copied()).unwrap_or(0.0),
        scores,
        masked_cells: total.total,
        correct_cells: total.correct,
        chance_level: 1.0 / truth.alphabet().len() as f64,
    };
    info!(
        "k={}: mean accuracy {:.3} over {} repetitions",
        report.n_neighbors, report.mean_accuracy, plan.repetitions
    );
    Ok(report)
}

/// Result of a grid search over K.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KSearch {
    /// One report per candidate, in ascending K.
    pub results: Vec<EvaluationReport>,
    /// Candidate with the highest mean accuracy; the smallest wins a tie.
    pub best_k: usize,
}

/// Evaluate every candidate K with the same plan and seed.
pub fn tune_k(
    truth: &GenotypeMatrix,
    base: &ImputerConfig,
    candidates: &[usize],
    plan: &EvaluationPlan,
) -> Result<KSearch> {
    let mut ks = candidates.to_vec();
    ks.sort_unstable();
    ks.dedup();
    if ks.is_empty() {
        return Err(ImputationError::InvalidConfig(
            "no candidate values of k".to_string(),
        ));
    }

    let mut results = Vec::with_capacity(ks.len());
    for k in ks {
        let config = ImputerConfig {
            n_neighbors: k,
            ..base.clone()
        };
        results.push(evaluate(truth, &config, plan)?);
    }

    let mut best = &results[0];
    for report in &results[1..] {
        if report.mean_accuracy > best.mean_accuracy {
            best = report;
        }
    }
    let best_k = best.n_neighbors;

    Ok(KSearch { results, best_k })
}
