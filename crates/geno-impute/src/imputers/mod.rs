//! Imputation module for filling missing genotypes.
//!
//! This module provides:
//! - KNN imputation over mismatch distances
//! - Neighbor ranking
//! - Majority vote with an explicit tie-break rule

mod knn;
pub mod neighbors;
pub mod vote;

pub use knn::KnnImputer;
pub use neighbors::{Neighbor, nearest_neighbors, rank_neighbors};
pub use vote::{Vote, majority_vote};
