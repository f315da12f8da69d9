//! Categorical K-Nearest-Neighbors Genotype Imputation
//!
//! Fills missing genotype calls in a samples × loci matrix by majority vote
//! among the K nearest samples that are observed at the same locus, where
//! "nearest" means fewest mismatching genotypes over the other loci.
//!
//! # Overview
//!
//! - **Data model**: [`GenotypeMatrix`] with a declared [`Alphabet`] of codes
//!   and `None` as the missing marker, validated on construction
//! - **Distances**: [`DistanceMatrix`] of mismatch counts over jointly observed loci
//! - **Imputation**: [`KnnImputer`] per locus or over the whole matrix,
//!   optionally in parallel across loci
//! - **Evaluation**: mask known genotypes, impute, and score accuracy; grid search over K
//! - **I/O**: tab-delimited genotype tables through polars
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use geno_impute::{Alphabet, GenotypeMatrix, ImputerConfig, KnnImputer, TieBreak};
//!
//! let matrix = GenotypeMatrix::new(
//!     vec![
//!         vec![Some(-1), None, Some(1)],
//!         vec![Some(-1), Some(0), Some(1)],
//!         vec![Some(1), Some(1), None],
//!     ],
//!     Alphabet::biallelic(),
//! )?;
//!
//! let config = ImputerConfig::builder()
//!     .n_neighbors(3)
//!     .tie_break(TieBreak::LowestCode)
//!     .build()?;
//!
//! let outcome = KnnImputer::from_config(config)?.impute(&matrix)?;
//! for p in &outcome.predictions {
//!     println!("sample {} locus {} -> {} ({:.2})", p.sample, p.locus, p.value, p.confidence);
//! }
//! ```
//!
//! # Policies
//!
//! - [`TieBreak`]: which genotype wins an equal vote (default: lowest code)
//! - [`ShortfallPolicy`]: clamp K to the observed samples, or fail
//! - [`AllMissingPolicy`]: skip loci nobody observed, or fail the run
//! - [`DistanceMetric`]: raw mismatch count, or mismatches per shared locus

pub mod config;
pub mod distance;
pub mod error;
pub mod evaluation;
pub mod imputers;
pub mod io;
pub mod progress;
pub mod reporting;
pub mod types;

// Re-exports for convenient access
pub use config::{
    AllMissingPolicy, ConfigValidationError, DistanceMetric, ImputerConfig, ImputerConfigBuilder,
    ShortfallPolicy, TieBreak,
};
pub use distance::DistanceMatrix;
pub use error::{ImputationError, Result as ImputationResult, ResultExt};
pub use evaluation::{
    Accuracy, EvaluationPlan, EvaluationReport, KSearch, accuracy, evaluate, mask_locus,
    mask_random, tune_k,
};
pub use imputers::{KnnImputer, Neighbor, Vote, majority_vote, nearest_neighbors, rank_neighbors};
pub use io::{
    TableOptions, dataframe_to_matrix, matrix_to_dataframe, parse_genotype_table,
    read_genotype_table, write_genotype_table,
};
pub use progress::{ClosureProgressReporter, ImputationStage, ProgressReporter, ProgressUpdate};
pub use reporting::ImputationReport;
pub use types::{
    Alphabet, Genotype, GenotypeMatrix, ImputationOutcome, LocusImputation, LocusStatus,
    LocusSummary, MissingMask, Prediction,
};
