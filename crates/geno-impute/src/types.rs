//! Core data types for genotype imputation.
//!
//! A [`GenotypeMatrix`] holds one row per sample and one column per locus.
//! Each cell is an `Option<Genotype>`, where `None` is the missing marker and
//! every `Some` code belongs to the matrix's [`Alphabet`].

use crate::error::{ImputationError, Result};
use serde::{Deserialize, Serialize};

/// A genotype category code (e.g. -1 / 0 / 1 for AA / AB / BB).
pub type Genotype = i8;

// ============================================================================
// Alphabet
// ============================================================================

/// The declared set of valid genotype codes, kept sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alphabet {
    codes: Vec<Genotype>,
    labels: Vec<String>,
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::biallelic()
    }
}

impl Alphabet {
    /// Create an alphabet whose labels are the codes themselves.
    pub fn new(codes: impl IntoIterator<Item = Genotype>) -> Result<Self> {
        Self::with_labels(codes.into_iter().map(|code| (code, code.to_string())))
    }

    /// Create an alphabet from `(code, label)` pairs.
    pub fn with_labels<L: Into<String>>(
        pairs: impl IntoIterator<Item = (Genotype, L)>,
    ) -> Result<Self> {
        let mut pairs: Vec<(Genotype, String)> =
            pairs.into_iter().map(|(code, label)| (code, label.into())).collect();
        pairs.sort_by_key(|(code, _)| *code);

        if pairs.is_empty() {
            return Err(ImputationError::InvalidConfig(
                "alphabet must contain at least one genotype".to_string(),
            ));
        }
        if let Some(dup) = pairs.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(ImputationError::InvalidConfig(format!(
                "duplicate genotype code {} in alphabet",
                dup[0].0
            )));
        }

        let (codes, labels) = pairs.into_iter().unzip();
        Ok(Self { codes, labels })
    }

    /// The biallelic dosage alphabet: -1 = AA, 0 = AB, 1 = BB.
    pub fn biallelic() -> Self {
        Self {
            codes: vec![-1, 0, 1],
            labels: vec!["AA".to_string(), "AB".to_string(), "BB".to_string()],
        }
    }

    /// Valid codes in ascending order.
    pub fn codes(&self) -> &[Genotype] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn contains(&self, code: Genotype) -> bool {
        self.codes.binary_search(&code).is_ok()
    }

    /// Label for a code, if the code is in the alphabet.
    pub fn label(&self, code: Genotype) -> Option<&str> {
        self.codes
            .binary_search(&code)
            .ok()
            .map(|idx| self.labels[idx].as_str())
    }

    /// Parse a textual cell: either a label (e.g. "AB") or a numeric code.
    ///
    /// Returns `None` for tokens that are neither.
    pub fn parse(&self, token: &str) -> Option<Genotype> {
        let token = token.trim();
        if let Some(idx) = self.labels.iter().position(|label| label == token) {
            return Some(self.codes[idx]);
        }
        token
            .parse::<Genotype>()
            .ok()
            .or_else(|| {
                // Dosage files often write codes as floats ("1.0").
                token
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.fract() == 0.0 && v.abs() <= Genotype::MAX as f64)
                    .map(|v| v as Genotype)
            })
            .filter(|code| self.contains(*code))
    }
}

// ============================================================================
// Genotype matrix
// ============================================================================

/// Samples × loci matrix of categorical genotypes with missing cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenotypeMatrix {
    n_samples: usize,
    n_loci: usize,
    cells: Vec<Option<Genotype>>,
    alphabet: Alphabet,
    sample_ids: Vec<String>,
    locus_ids: Vec<String>,
}

impl GenotypeMatrix {
    /// Build a matrix from rows of optional codes, validating shape and codes.
    ///
    /// # Errors
    ///
    /// `EmptyMatrix` if there are no rows or no loci, `RaggedMatrix` if rows
    /// differ in length, `InvalidCategory` if a code is outside `alphabet`.
    pub fn new(rows: Vec<Vec<Option<Genotype>>>, alphabet: Alphabet) -> Result<Self> {
        let n_samples = rows.len();
        let n_loci = rows.first().map(Vec::len).unwrap_or(0);
        if n_samples == 0 || n_loci == 0 {
            return Err(ImputationError::EmptyMatrix);
        }

        let mut cells = Vec::with_capacity(n_samples * n_loci);
        for (row_idx, row) in rows.into_iter().enumerate() {
            if row.len() != n_loci {
                return Err(ImputationError::RaggedMatrix {
                    row: row_idx,
                    expected: n_loci,
                    found: row.len(),
                });
            }
            for (locus, cell) in row.into_iter().enumerate() {
                if let Some(code) = cell
                    && !alphabet.contains(code)
                {
                    return Err(ImputationError::InvalidCategory {
                        sample: row_idx,
                        locus,
                        value: code.to_string(),
                    });
                }
                cells.push(cell);
            }
        }

        Ok(Self {
            n_samples,
            n_loci,
            cells,
            alphabet,
            sample_ids: (0..n_samples).map(|i| format!("sample_{}", i)).collect(),
            locus_ids: (0..n_loci).map(|j| format!("locus_{}", j)).collect(),
        })
    }

    /// Build a matrix from raw codes where `missing` marks an absent genotype.
    ///
    /// `missing` must not itself be a member of `alphabet`.
    pub fn from_codes(rows: &[Vec<Genotype>], missing: Genotype, alphabet: Alphabet) -> Result<Self> {
        if alphabet.contains(missing) {
            return Err(ImputationError::InvalidConfig(format!(
                "missing sentinel {} collides with a genotype code",
                missing
            )));
        }
        let rows = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&code| (code != missing).then_some(code))
                    .collect()
            })
            .collect();
        Self::new(rows, alphabet)
    }

    /// Attach sample identifiers (one per row).
    pub fn with_sample_ids(mut self, ids: Vec<String>) -> Result<Self> {
        if ids.len() != self.n_samples {
            return Err(ImputationError::ShapeMismatch {
                expected: (self.n_samples, self.n_loci),
                found: (ids.len(), self.n_loci),
            });
        }
        self.sample_ids = ids;
        Ok(self)
    }

    /// Attach locus identifiers (one per column).
    pub fn with_locus_ids(mut self, ids: Vec<String>) -> Result<Self> {
        if ids.len() != self.n_loci {
            return Err(ImputationError::ShapeMismatch {
                expected: (self.n_samples, self.n_loci),
                found: (self.n_samples, ids.len()),
            });
        }
        self.locus_ids = ids;
        Ok(self)
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn n_loci(&self) -> usize {
        self.n_loci
    }

    /// `(n_samples, n_loci)`
    pub fn shape(&self) -> (usize, usize) {
        (self.n_samples, self.n_loci)
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn locus_ids(&self) -> &[String] {
        &self.locus_ids
    }

    #[inline]
    pub fn get(&self, sample: usize, locus: usize) -> Option<Genotype> {
        self.cells[sample * self.n_loci + locus]
    }

    #[inline]
    pub fn is_missing(&self, sample: usize, locus: usize) -> bool {
        self.get(sample, locus).is_none()
    }

    /// All loci of one sample.
    #[inline]
    pub fn row(&self, sample: usize) -> &[Option<Genotype>] {
        let start = sample * self.n_loci;
        &self.cells[start..start + self.n_loci]
    }

    /// All samples at one locus.
    pub fn column(&self, locus: usize) -> Vec<Option<Genotype>> {
        (0..self.n_samples).map(|i| self.get(i, locus)).collect()
    }

    /// Set one cell, validating the code against the alphabet.
    pub fn set(&mut self, sample: usize, locus: usize, value: Option<Genotype>) -> Result<()> {
        if locus >= self.n_loci || sample >= self.n_samples {
            return Err(ImputationError::ShapeMismatch {
                expected: self.shape(),
                found: (sample + 1, locus + 1),
            });
        }
        if let Some(code) = value
            && !self.alphabet.contains(code)
        {
            return Err(ImputationError::InvalidCategory {
                sample,
                locus,
                value: code.to_string(),
            });
        }
        self.cells[sample * self.n_loci + locus] = value;
        Ok(())
    }

    /// Overwrite a whole column with values already known to be valid.
    pub(crate) fn replace_column(&mut self, locus: usize, values: &[Option<Genotype>]) {
        debug_assert_eq!(values.len(), self.n_samples);
        for (sample, value) in values.iter().enumerate() {
            self.cells[sample * self.n_loci + locus] = *value;
        }
    }

    /// Number of missing cells in the whole matrix.
    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_none()).count()
    }

    /// Number of missing cells at one locus.
    pub fn missing_in_locus(&self, locus: usize) -> usize {
        (0..self.n_samples).filter(|&i| self.is_missing(i, locus)).count()
    }

    /// Snapshot of which cells are currently missing.
    pub fn missing_mask(&self) -> MissingMask {
        MissingMask {
            n_samples: self.n_samples,
            n_loci: self.n_loci,
            bits: self.cells.iter().map(Option::is_none).collect(),
        }
    }
}

// ============================================================================
// Missingness mask
// ============================================================================

/// Same-shaped boolean matrix, `true` where the genotype is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingMask {
    n_samples: usize,
    n_loci: usize,
    bits: Vec<bool>,
}

impl MissingMask {
    pub fn shape(&self) -> (usize, usize) {
        (self.n_samples, self.n_loci)
    }

    #[inline]
    pub fn is_missing(&self, sample: usize, locus: usize) -> bool {
        self.bits[sample * self.n_loci + locus]
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// `(sample, locus)` of every missing cell, row-major.
    pub fn positions(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let n_loci = self.n_loci;
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, missing)| **missing)
            .map(move |(idx, _)| (idx / n_loci, idx % n_loci))
    }
}

// ============================================================================
// Imputation results
// ============================================================================

/// One filled-in cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub sample: usize,
    pub locus: usize,
    pub value: Genotype,
    /// Winning vote count divided by neighbors consulted, in (0, 1].
    pub confidence: f64,
    /// Neighbor sample indices, nearest first.
    pub neighbors: Vec<usize>,
}

/// Result of imputing a single locus.
#[derive(Debug, Clone, PartialEq)]
pub struct LocusImputation {
    pub locus: usize,
    /// The completed column, one entry per sample.
    pub column: Vec<Option<Genotype>>,
    pub predictions: Vec<Prediction>,
    /// Neighbors actually consulted per vote, after clamping. `None` if nothing was imputed.
    pub effective_k: Option<usize>,
}

/// Final state of a locus after a full-matrix run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocusStatus {
    /// No cells were missing
    Complete,
    /// Every missing cell was imputed
    Imputed,
    /// No observed samples; left missing
    Unresolved,
}

/// Per-locus bookkeeping for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocusSummary {
    pub locus: usize,
    pub name: String,
    pub status: LocusStatus,
    pub missing_before: usize,
    pub imputed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_k: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_confidence: Option<f64>,
}

/// Result of a full-matrix run.
#[derive(Debug, Clone)]
pub struct ImputationOutcome {
    /// The imputed matrix. Unresolved loci still contain missing cells.
    pub matrix: GenotypeMatrix,
    pub predictions: Vec<Prediction>,
    pub loci: Vec<LocusSummary>,
    /// Indices of loci left unresolved under the skip policy.
    pub unresolved: Vec<usize>,
}

impl ImputationOutcome {
    /// True when no missing cell remains anywhere.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty() && self.matrix.missing_count() == 0
    }

    pub fn imputed_count(&self) -> usize {
        self.predictions.len()
    }

    /// Mean confidence over all predictions, or `None` if nothing was imputed.
    pub fn mean_confidence(&self) -> Option<f64> {
        mean(self.predictions.iter().map(|p| p.confidence))
    }
}

pub(crate) fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}
