//! Configuration types for the KNN genotype imputer.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic imputer setup.

use serde::{Deserialize, Serialize};

/// Rule for picking a winner when several genotypes tie in the neighbor vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TieBreak {
    /// The smallest tied genotype code wins
    #[default]
    LowestCode,
    /// The largest tied genotype code wins
    HighestCode,
    /// The tied genotype carried by the closest-ranked neighbor wins
    NearestNeighbor,
}

/// What to do when a locus has fewer observed samples than K.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ShortfallPolicy {
    /// Vote with every observed sample available
    #[default]
    Clamp,
    /// Return an `InsufficientNeighbors` error for the locus
    Fail,
}

/// What to do with a locus where every sample is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AllMissingPolicy {
    /// Leave the locus unresolved and keep imputing the others
    #[default]
    Skip,
    /// Abort the whole run
    Fail,
}

/// Distance between two samples over their jointly observed loci.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DistanceMetric {
    /// Raw count of mismatching loci
    #[default]
    Mismatch,
    /// Mismatch count divided by the number of jointly observed loci
    NormalizedMismatch,
}

/// Configuration for [`KnnImputer`](crate::imputers::KnnImputer).
///
/// Use [`ImputerConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use geno_impute::config::{ImputerConfig, TieBreak};
///
/// let config = ImputerConfig::builder()
///     .n_neighbors(5)
///     .tie_break(TieBreak::NearestNeighbor)
///     .parallel(false)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputerConfig {
    /// Number of neighbors consulted for each vote.
    /// Default: 3
    pub n_neighbors: usize,

    /// Tie-break rule for the majority vote.
    /// Default: LowestCode
    pub tie_break: TieBreak,

    /// Behavior when fewer than `n_neighbors` samples are observed at a locus.
    /// Default: Clamp
    pub shortfall: ShortfallPolicy,

    /// Behavior for loci with no observed samples.
    /// Default: Skip
    pub all_missing: AllMissingPolicy,

    /// Sample distance metric.
    /// Default: Mismatch
    pub metric: DistanceMetric,

    /// Whether to impute loci in parallel.
    /// Default: true
    pub parallel: bool,

    /// Size of a dedicated thread pool. If None, the global rayon pool is used.
    /// Default: None
    pub num_threads: Option<usize>,
}

impl Default for ImputerConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 3,
            tie_break: TieBreak::default(),
            shortfall: ShortfallPolicy::default(),
            all_missing: AllMissingPolicy::default(),
            metric: DistanceMetric::default(),
            parallel: true,
            num_threads: None,
        }
    }
}

impl ImputerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ImputerConfigBuilder {
        ImputerConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.n_neighbors == 0 {
            return Err(ConfigValidationError::InvalidKnnNeighbors(self.n_neighbors));
        }

        if let Some(0) = self.num_threads {
            return Err(ConfigValidationError::InvalidThreadCount(0));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid KNN neighbors: {0} (must be at least 1)")]
    InvalidKnnNeighbors(usize),

    #[error("Invalid thread count: {0} (must be at least 1)")]
    InvalidThreadCount(usize),
}

impl From<ConfigValidationError> for crate::error::ImputationError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::ImputationError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`ImputerConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ImputerConfigBuilder {
    n_neighbors: Option<usize>,
    tie_break: Option<TieBreak>,
    shortfall: Option<ShortfallPolicy>,
    all_missing: Option<AllMissingPolicy>,
    metric: Option<DistanceMetric>,
    parallel: Option<bool>,
    num_threads: Option<usize>,
}

impl ImputerConfigBuilder {
    /// Set the number of neighbors consulted for each vote.
    pub fn n_neighbors(mut self, k: usize) -> Self {
        self.n_neighbors = Some(k);
        self
    }

    /// Set the tie-break rule for the majority vote.
    pub fn tie_break(mut self, rule: TieBreak) -> Self {
        self.tie_break = Some(rule);
        self
    }

    /// Set the policy for loci with fewer observed samples than K.
    pub fn shortfall(mut self, policy: ShortfallPolicy) -> Self {
        self.shortfall = Some(policy);
        self
    }

    /// Set the policy for loci with no observed samples.
    pub fn all_missing(mut self, policy: AllMissingPolicy) -> Self {
        self.all_missing = Some(policy);
        self
    }

    /// Set the sample distance metric.
    pub fn metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = Some(metric);
        self
    }

    /// Enable or disable parallel imputation across loci.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = Some(parallel);
        self
    }

    /// Run parallel imputation on a dedicated pool with `n` threads.
    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ImputerConfig` or an error if validation fails.
    pub fn build(self) -> Result<ImputerConfig, ConfigValidationError> {
        let config = ImputerConfig {
            n_neighbors: self.n_neighbors.unwrap_or(3),
            tie_break: self.tie_break.unwrap_or_default(),
            shortfall: self.shortfall.unwrap_or_default(),
            all_missing: self.all_missing.unwrap_or_default(),
            metric: self.metric.unwrap_or_default(),
            parallel: self.parallel.unwrap_or(true),
            num_threads: self.num_threads,
        };

        config.validate()?;
        Ok(config)
    }
}
