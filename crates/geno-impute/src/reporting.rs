//! Imputation reports.
//!
//! [`ImputationReport`] is used for both JSON output to stdout (`--json`)
//! and the report file written by `--emit-report`.

use crate::config::ImputerConfig;
use crate::error::Result;
use crate::types::{ImputationOutcome, LocusSummary};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Summary of one imputation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImputationReport {
    // Metadata
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Path to the input table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_file: Option<String>,
    /// Path to the imputed table (if written)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    /// Settings the run used
    pub config: ImputerConfig,

    // Totals
    pub n_samples: usize,
    pub n_loci: usize,
    pub missing_before: usize,
    pub imputed_cells: usize,
    pub missing_after: usize,
    /// Mean vote confidence over imputed cells
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_confidence: Option<f64>,
    /// Names of loci with no observed genotypes
    pub unresolved_loci: Vec<String>,
    /// Wall-clock time of the run in milliseconds
    pub duration_ms: u64,

    /// Per-locus details
    pub loci: Vec<LocusSummary>,
}

impl ImputationReport {
    /// Build a report from a finished run.
    pub fn build(
        outcome: &ImputationOutcome,
        config: &ImputerConfig,
        duration: Duration,
        input_file: Option<&str>,
        output_file: Option<&str>,
    ) -> Self {
        let missing_before = outcome.loci.iter().map(|l| l.missing_before).sum();
        let unresolved_loci = outcome
            .unresolved
            .iter()
            .map(|&locus| outcome.matrix.locus_ids()[locus].clone())
            .collect();

        Self {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: input_file.map(str::to_string),
            output_file: output_file.map(str::to_string),
            config: config.clone(),
            n_samples: outcome.matrix.n_samples(),
            n_loci: outcome.matrix.n_loci(),
            missing_before,
            imputed_cells: outcome.imputed_count(),
            missing_after: outcome.matrix.missing_count(),
            mean_confidence: outcome.mean_confidence(),
            unresolved_loci,
            duration_ms: duration.as_millis() as u64,
            loci: outcome.loci.clone(),
        }
    }

    /// Write the report as pretty JSON to `<output_dir>/<base_name>_report.json`.
    pub fn write_to_dir(&self, output_dir: &Path, base_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(output_dir)?;

        let report_path = output_dir.join(format!("{}_report.json", base_name));
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(self)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());

        Ok(report_path)
    }
}
