//! CLI entry point for KNN genotype imputation.

use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand, ValueEnum};
use geno_impute::{
    AllMissingPolicy, DistanceMetric, EvaluationPlan, GenotypeMatrix, ImputationReport,
    ImputerConfig, KSearch, KnnImputer, ShortfallPolicy, TableOptions, TieBreak,
    read_genotype_table, tune_k, write_genotype_table,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};

/// CLI-compatible tie-break enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliTieBreak {
    /// Smallest tied genotype code wins
    Lowest,
    /// Largest tied genotype code wins
    Highest,
    /// Genotype of the closest tied neighbor wins
    Nearest,
}

impl From<CliTieBreak> for TieBreak {
    fn from(cli: CliTieBreak) -> Self {
        match cli {
            CliTieBreak::Lowest => TieBreak::LowestCode,
            CliTieBreak::Highest => TieBreak::HighestCode,
            CliTieBreak::Nearest => TieBreak::NearestNeighbor,
        }
    }
}

/// CLI-compatible shortfall policy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliShortfall {
    /// Use every observed sample when fewer than k exist
    Clamp,
    /// Stop with an error when fewer than k exist
    Fail,
}

impl From<CliShortfall> for ShortfallPolicy {
    fn from(cli: CliShortfall) -> Self {
        match cli {
            CliShortfall::Clamp => ShortfallPolicy::Clamp,
            CliShortfall::Fail => ShortfallPolicy::Fail,
        }
    }
}

/// CLI-compatible all-missing policy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliAllMissing {
    /// Leave the locus missing and continue
    Skip,
    /// Stop with an error
    Fail,
}

impl From<CliAllMissing> for AllMissingPolicy {
    fn from(cli: CliAllMissing) -> Self {
        match cli {
            CliAllMissing::Skip => AllMissingPolicy::Skip,
            CliAllMissing::Fail => AllMissingPolicy::Fail,
        }
    }
}

/// CLI-compatible distance metric enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMetric {
    /// Raw mismatch count
    Mismatch,
    /// Mismatches divided by jointly observed loci
    Normalized,
}

impl From<CliMetric> for DistanceMetric {
    fn from(cli: CliMetric) -> Self {
        match cli {
            CliMetric::Mismatch => DistanceMetric::Mismatch,
            CliMetric::Normalized => DistanceMetric::NormalizedMismatch,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "K-nearest-neighbors imputation of missing genotypes",
    long_about = "Fills missing genotype calls by majority vote among the k nearest samples.\n\n\
                  INPUT FORMAT:\n  \
                  Tab-delimited, header row, first column = sample ID, one column per locus.\n  \
                  Cells: -1/0/1, AA/AB/BB, or a missing token (NA, NaN, ., empty).\n\n\
                  EXAMPLES:\n  \
                  # Impute with k=3\n  \
                  geno-impute impute -i dogs.tsv -o dogs_imputed.tsv\n\n  \
                  # Compare k values by masking 5% of known genotypes\n  \
                  geno-impute evaluate -i dogs.tsv --k-values 1,3,5,7"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all logs; only the final JSON is written.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Impute missing genotypes and write the completed table
    Impute {
        /// Path to the genotype table
        #[arg(short, long)]
        input: PathBuf,

        /// Path for the imputed table
        #[arg(short, long)]
        output: PathBuf,

        /// Write a detailed JSON report into this directory
        #[arg(short = 'r', long)]
        emit_report: Option<PathBuf>,

        #[command(flatten)]
        options: ImputeOptions,
    },

    /// Estimate accuracy by masking known genotypes, for one or more k
    Evaluate {
        /// Path to the genotype table
        #[arg(short, long)]
        input: PathBuf,

        /// Candidate neighbor counts
        #[arg(long, value_delimiter = ',', default_value = "1,3,5")]
        k_values: Vec<usize>,

        /// Fraction of observed genotypes hidden per repetition
        #[arg(long, default_value = "0.05")]
        mask_fraction: f64,

        /// Number of random maskings per k
        #[arg(long, default_value = "10")]
        repetitions: usize,

        /// Seed for the random maskings
        #[arg(long, default_value = "42")]
        seed: u64,

        #[command(flatten)]
        options: ImputeOptions,
    },
}

#[derive(Args, Debug)]
struct ImputeOptions {
    /// Number of neighbors
    #[arg(short, long, default_value = "3")]
    k: usize,

    /// Rule for tied votes
    #[arg(long, value_enum, default_value = "lowest")]
    tie_break: CliTieBreak,

    /// What to do when a locus has fewer than k observed samples
    #[arg(long, value_enum, default_value = "clamp")]
    shortfall: CliShortfall,

    /// What to do when a locus has no observed samples
    #[arg(long, value_enum, default_value = "skip")]
    all_missing: CliAllMissing,

    /// Sample distance metric
    #[arg(long, value_enum, default_value = "mismatch")]
    metric: CliMetric,

    /// Worker threads (defaults to all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Impute loci one at a time on the main thread
    #[arg(long)]
    sequential: bool,

    /// Extra cell values to read as missing (repeatable)
    #[arg(long = "missing-token")]
    missing_tokens: Vec<String>,
}

impl ImputeOptions {
    fn config(&self) -> Result<ImputerConfig> {
        let mut builder = ImputerConfig::builder()
            .n_neighbors(self.k)
            .tie_break(self.tie_break.into())
            .shortfall(self.shortfall.into())
            .all_missing(self.all_missing.into())
            .metric(self.metric.into())
            .parallel(!self.sequential);

        if let Some(threads) = self.threads {
            builder = builder.num_threads(threads);
        }

        Ok(builder.build()?)
    }

    fn table_options(&self) -> TableOptions {
        let mut options = TableOptions::default();
        options.missing_tokens.extend(self.missing_tokens.iter().cloned());
        options
    }
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.quiet, cli.json);

    let result = match &cli.command {
        Command::Impute {
            input,
            output,
            emit_report,
            options,
        } => run_impute(&cli, input, output, emit_report.as_deref(), options),
        Command::Evaluate {
            input,
            k_values,
            mask_fraction,
            repetitions,
            seed,
            options,
        } => {
            let plan = EvaluationPlan {
                mask_fraction: *mask_fraction,
                repetitions: *repetitions,
                seed: *seed,
            };
            run_evaluate(&cli, input, k_values, &plan, options)
        }
    };

    if let Err(ref e) = result {
        error!("{}", e);
    }
    result
}

fn load_input(input: &Path, options: &ImputeOptions) -> Result<GenotypeMatrix> {
    if !input.exists() {
        return Err(anyhow!("Input file not found: {}", input.display()));
    }
    Ok(read_genotype_table(input, &options.table_options())?)
}

fn run_impute(
    cli: &Cli,
    input: &Path,
    output: &Path,
    emit_report: Option<&Path>,
    options: &ImputeOptions,
) -> Result<()> {
    let matrix = load_input(input, options)?;
    let config = options.config()?;

    let mut imputer = KnnImputer::from_config(config.clone())?;
    if !cli.quiet && !cli.json {
        imputer = imputer.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    let started = Instant::now();
    let outcome = imputer.impute(&matrix)?;
    let elapsed = started.elapsed();

    write_genotype_table(&outcome.matrix, output, b'\t')?;

    let input_str = input.display().to_string();
    let output_str = output.display().to_string();
    let report = ImputationReport::build(
        &outcome,
        &config,
        elapsed,
        Some(&input_str),
        Some(&output_str),
    );

    if let Some(dir) = emit_report {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("genotypes");
        report.write_to_dir(dir, stem)?;
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_impute_summary(&report);
    Ok(())
}

fn run_evaluate(
    cli: &Cli,
    input: &Path,
    k_values: &[usize],
    plan: &EvaluationPlan,
    options: &ImputeOptions,
) -> Result<()> {
    let matrix = load_input(input, options)?;
    let config = options.config()?;

    info!(
        "Evaluating k in {:?}: masking {:.1}% of genotypes, {} repetitions",
        k_values,
        plan.mask_fraction * 100.0,
        plan.repetitions
    );
    let search = tune_k(&matrix, &config, k_values, plan)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&search)?);
        return Ok(());
    }

    print_evaluation_summary(&search);
    Ok(())
}

/// Print a human-readable summary of an imputation run.
///
/// Uses `println!` rather than logging so the summary is shown at any log level.
fn print_impute_summary(report: &ImputationReport) {
    println!();
    println!("{}", "=".repeat(60));
    println!("IMPUTATION COMPLETE");
    println!("{}", "=".repeat(60));
    if let Some(ref input) = report.input_file {
        println!(
            "Input:  {} ({} samples x {} loci)",
            input, report.n_samples, report.n_loci
        );
    }
    if let Some(ref output) = report.output_file {
        println!("Output: {}", output);
    }
    println!();
    println!("  k: {}", report.config.n_neighbors);
    println!("  Missing before: {}", report.missing_before);
    println!("  Imputed:        {}", report.imputed_cells);
    println!("  Missing after:  {}", report.missing_after);
    if let Some(confidence) = report.mean_confidence {
        println!("  Mean confidence: {:.3}", confidence);
    }
    println!("  Duration: {}ms", report.duration_ms);

    if !report.unresolved_loci.is_empty() {
        println!();
        println!("Unresolved loci (no observed genotypes):");
        for name in &report.unresolved_loci {
            println!("  ! {}", name);
        }
    }
    println!("{}", "=".repeat(60));
}

/// Print the k grid as a table.
fn print_evaluation_summary(search: &KSearch) {
    println!();
    println!("{}", "=".repeat(60));
    println!("IMPUTATION ACCURACY BY K");
    println!("{}", "=".repeat(60));
    println!(
        "{:<6} {:<15} {:<10} {:<10}",
        "k", "Mean accuracy", "Masked", "Chance"
    );
    println!("{}", "-".repeat(45));
    for report in &search.results {
        let marker = if report.n_neighbors == search.best_k { " *" } else { "" };
        println!(
            "{:<6} {:<15.3} {:<10} {:<10.3}{}",
            report.n_neighbors,
            report.mean_accuracy,
            report.masked_cells,
            report.chance_level,
            marker
        );
    }
    println!();
    println!("Best k: {}", search.best_k);
    println!("{}", "=".repeat(60));
}
