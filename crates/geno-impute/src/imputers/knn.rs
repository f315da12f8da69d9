use crate::config::{AllMissingPolicy, ImputerConfig, ShortfallPolicy};
use crate::distance::DistanceMatrix;
use crate::error::{ImputationError, Result};
use crate::imputers::neighbors::nearest_neighbors;
use crate::imputers::vote::majority_vote;
use crate::progress::{ClosureProgressReporter, ImputationStage, ProgressReporter, ProgressUpdate};
use crate::types::{
    GenotypeMatrix, ImputationOutcome, LocusImputation, LocusStatus, LocusSummary, Prediction,
    mean,
};
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Categorical K-nearest-neighbors imputer.
///
/// Each missing cell is filled with the majority genotype among the K samples
/// closest to it (by mismatch count over the other loci) that are observed at
/// the same locus.
///
/// # Example
///
/// ```rust,ignore
/// use geno_impute::{Alphabet, GenotypeMatrix, KnnImputer};
///
/// let matrix = GenotypeMatrix::new(rows, Alphabet::biallelic())?;
/// let outcome = KnnImputer::new(3).impute(&matrix)?;
/// assert!(outcome.is_complete());
/// ```
pub struct KnnImputer {
    config: ImputerConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(KnnImputer: Send, Sync);

impl KnnImputer {
    /// Create an imputer with default settings and `n_neighbors` neighbors.
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            config: ImputerConfig {
                n_neighbors: n_neighbors.max(1), // Ensure at least 1 neighbor
                ..ImputerConfig::default()
            },
            progress_reporter: None,
        }
    }

    /// Create an imputer from a full configuration.
    pub fn from_config(config: ImputerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            progress_reporter: None,
        })
    }

    /// Attach a progress reporter.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Attach a closure as progress reporter.
    pub fn on_progress<F>(self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter(Arc::new(ClosureProgressReporter::new(callback)))
    }

    pub fn config(&self) -> &ImputerConfig {
        &self.config
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    /// Impute every missing cell at one locus.
    ///
    /// The returned column equals the input column wherever the input is
    /// observed. If nothing is missing the column is returned unchanged.
    ///
    /// # Errors
    ///
    /// `AllMissingColumn` if no sample is observed at `locus`;
    /// `InsufficientNeighbors` if fewer than K samples are observed and the
    /// shortfall policy is `Fail`.
    pub fn impute_locus(&self, matrix: &GenotypeMatrix, locus: usize) -> Result<LocusImputation> {
        if locus >= matrix.n_loci() {
            return Err(ImputationError::LocusOutOfRange {
                locus,
                n_loci: matrix.n_loci(),
            });
        }

        let column = matrix.column(locus);
        let (train, test): (Vec<usize>, Vec<usize>) =
            (0..matrix.n_samples()).partition(|&sample| column[sample].is_some());

        if test.is_empty() {
            return Ok(LocusImputation {
                locus,
                column,
                predictions: Vec::new(),
                effective_k: None,
            });
        }
        if train.is_empty() {
            return Err(ImputationError::AllMissingColumn { locus });
        }

        let requested = self.config.n_neighbors;
        if train.len() < requested && self.config.shortfall == ShortfallPolicy::Fail {
            return Err(ImputationError::InsufficientNeighbors {
                locus,
                available: train.len(),
                requested,
            });
        }
        let k = requested.min(train.len());

        let distances = DistanceMatrix::compute(matrix, Some(locus), self.config.metric);

        let mut imputed = column.clone();
        let mut predictions = Vec::with_capacity(test.len());
        for &sample in &test {
            let neighbors = nearest_neighbors(&distances, sample, &train, k);
            let ballots: Vec<_> = neighbors
                .iter()
                .filter_map(|n| column[n.sample])
                .collect();

            let vote = majority_vote(&ballots, self.config.tie_break).ok_or_else(|| {
                ImputationError::Internal(format!(
                    "no ballots for sample {} at locus {}",
                    sample, locus
                ))
            })?;

            imputed[sample] = Some(vote.value);
            predictions.push(Prediction {
                sample,
                locus,
                value: vote.value,
                confidence: vote.confidence(),
                neighbors: neighbors.iter().map(|n| n.sample).collect(),
            });
        }

        debug!(
            "Locus {}: imputed {} of {} samples with k={}",
            locus,
            test.len(),
            matrix.n_samples(),
            k
        );

        Ok(LocusImputation {
            locus,
            column: imputed,
            predictions,
            effective_k: Some(k),
        })
    }

    /// Impute every locus of `matrix` and assemble the completed matrix.
    ///
    /// Loci are independent, so with `parallel` enabled they are imputed on
    /// rayon workers; the result is identical to a sequential run.
    ///
    /// # Errors
    ///
    /// Any error from [`impute_locus`](Self::impute_locus), except
    /// `AllMissingColumn` under [`AllMissingPolicy::Skip`], which is recorded
    /// in [`ImputationOutcome::unresolved`] instead.
    pub fn impute(&self, matrix: &GenotypeMatrix) -> Result<ImputationOutcome> {
        match self.impute_internal(matrix) {
            Ok(outcome) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Imputed {} cells",
                    outcome.imputed_count()
                )));
                Ok(outcome)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                Err(e)
            }
        }
    }

    fn impute_internal(&self, matrix: &GenotypeMatrix) -> Result<ImputationOutcome> {
        let n_loci = matrix.n_loci();
        let missing = matrix.missing_count();
        self.report_progress(ProgressUpdate::new(
            ImputationStage::Preparing,
            1.0,
            format!("{} missing cells across {} loci", missing, n_loci),
        ));
        info!(
            "KNN imputing {} missing cells in a {}x{} matrix (k={})",
            missing,
            matrix.n_samples(),
            n_loci,
            self.config.n_neighbors
        );

        let results = if self.config.parallel {
            self.impute_loci_parallel(matrix)?
        } else {
            let finished = AtomicUsize::new(0);
            (0..n_loci)
                .map(|locus| self.impute_tracked(matrix, locus, &finished))
                .collect()
        };

        let mut completed = matrix.clone();
        let mut predictions = Vec::with_capacity(missing);
        let mut loci = Vec::with_capacity(n_loci);
        let mut unresolved = Vec::new();

        for (locus, result) in results.into_iter().enumerate() {
            let name = matrix.locus_ids()[locus].clone();
            let missing_before = matrix.missing_in_locus(locus);

            match result {
                Ok(imputation) => {
                    completed.replace_column(locus, &imputation.column);
                    loci.push(LocusSummary {
                        locus,
                        name,
                        status: if imputation.predictions.is_empty() {
                            LocusStatus::Complete
                        } else {
                            LocusStatus::Imputed
                        },
                        missing_before,
                        imputed: imputation.predictions.len(),
                        effective_k: imputation.effective_k,
                        mean_confidence: mean(imputation.predictions.iter().map(|p| p.confidence)),
                    });
                    predictions.extend(imputation.predictions);
                }
                Err(ImputationError::AllMissingColumn { .. })
                    if self.config.all_missing == AllMissingPolicy::Skip =>
                {
                    warn!("Locus '{}' has no observed genotypes; leaving it unresolved", name);
                    unresolved.push(locus);
                    loci.push(LocusSummary {
                        locus,
                        name,
                        status: LocusStatus::Unresolved,
                        missing_before,
                        imputed: 0,
                        effective_k: None,
                        mean_confidence: None,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "Imputed {} cells; {} loci unresolved",
            predictions.len(),
            unresolved.len()
        );

        Ok(ImputationOutcome {
            matrix: completed,
            predictions,
            loci,
            unresolved,
        })
    }

    fn impute_loci_parallel(&self, matrix: &GenotypeMatrix) -> Result<Vec<Result<LocusImputation>>> {
        let finished = AtomicUsize::new(0);
        let run = || {
            (0..matrix.n_loci())
                .into_par_iter()
                .map(|locus| self.impute_tracked(matrix, locus, &finished))
                .collect::<Vec<_>>()
        };

        match self.config.num_threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| ImputationError::Internal(e.to_string()))?;
                Ok(pool.install(run))
            }
            None => Ok(run()),
        }
    }

    fn impute_tracked(
        &self,
        matrix: &GenotypeMatrix,
        locus: usize,
        finished: &AtomicUsize,
    ) -> Result<LocusImputation> {
        let result = self.impute_locus(matrix, locus);
        let done = finished.fetch_add(1, Ordering::Relaxed) + 1;
        self.report_progress(ProgressUpdate::with_items(
            ImputationStage::Imputing,
            format!("Locus: {}", matrix.locus_ids()[locus]),
            done,
            matrix.n_loci(),
            format!("Finished locus {} of {}", done, matrix.n_loci()),
        ));
        result
    }
}
