//! Pairwise sample distances over jointly observed loci.

use crate::config::DistanceMetric;
use crate::types::GenotypeMatrix;

/// Square, symmetric distance matrix between all samples.
///
/// For each pair it records the number of loci where both samples are
/// observed (`shared_loci`) and how many of those disagree (`mismatches`).
/// Pairs with no shared loci have a raw distance of 0 and a normalized
/// distance of 1.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n: usize,
    metric: DistanceMetric,
    mismatches: Vec<u32>,
    shared: Vec<u32>,
}

impl DistanceMatrix {
    /// Compute distances between every pair of samples.
    ///
    /// `exclude_locus` is left out of the comparison; pass the locus being
    /// imputed so its own (partly missing) values do not bias the ranking.
    pub fn compute(
        matrix: &GenotypeMatrix,
        exclude_locus: Option<usize>,
        metric: DistanceMetric,
    ) -> Self {
        let n = matrix.n_samples();
        let mut mismatches = vec![0u32; n * n];
        let mut shared = vec![0u32; n * n];

        for i in 0..n {
            let row_i = matrix.row(i);
            for j in (i + 1)..n {
                let row_j = matrix.row(j);
                let (mut diff, mut both) = (0u32, 0u32);

                for (locus, (a, b)) in row_i.iter().zip(row_j).enumerate() {
                    if Some(locus) == exclude_locus {
                        continue;
                    }
                    if let (Some(a), Some(b)) = (a, b) {
                        both += 1;
                        if a != b {
                            diff += 1;
                        }
                    }
                }

                mismatches[i * n + j] = diff;
                mismatches[j * n + i] = diff;
                shared[i * n + j] = both;
                shared[j * n + i] = both;
            }
        }

        Self {
            n,
            metric,
            mismatches,
            shared,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Loci where both samples are observed and differ.
    #[inline]
    pub fn mismatches(&self, i: usize, j: usize) -> u32 {
        self.mismatches[i * self.n + j]
    }

    /// Loci where both samples are observed.
    #[inline]
    pub fn shared_loci(&self, i: usize, j: usize) -> u32 {
        self.shared[i * self.n + j]
    }

    /// Distance under the configured metric.
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        match self.metric {
            DistanceMetric::Mismatch => self.mismatches(i, j) as f64,
            DistanceMetric::NormalizedMismatch => {
                if i == j {
                    return 0.0;
                }
                match self.shared_loci(i, j) {
                    0 => 1.0,
                    shared => self.mismatches(i, j) as f64 / shared as f64,
                }
            }
        }
    }
}
