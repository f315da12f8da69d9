//! Reading and writing genotype tables.
//!
//! A table is delimited text with a header row. The first column holds
//! sample identifiers; every other column is one locus. Cells are a numeric
//! code or a label from the [`Alphabet`], or a missing token (`NA` by
//! default; empty cells are always missing).
//!
//! ```text
//! sample  rs101  rs102  rs103
//! dog_1   AA     AB     NA
//! dog_2   -1     0      1
//! ```

use crate::error::{ImputationError, Result, ResultExt};
use crate::types::{Alphabet, GenotypeMatrix};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Header of the sample identifier column in written tables.
pub const SAMPLE_COLUMN: &str = "sample";

/// Token written for unresolved cells.
pub const MISSING_OUTPUT: &str = "NA";

/// Options for parsing genotype tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableOptions {
    /// Field separator.
    /// Default: b'\t'
    pub separator: u8,

    /// Tokens read as missing, in addition to empty cells.
    /// Default: ["NA", "NaN", "."]
    pub missing_tokens: Vec<String>,

    /// Valid genotype codes and labels.
    /// Default: biallelic (-1/0/1 = AA/AB/BB)
    pub alphabet: Alphabet,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            separator: b'\t',
            missing_tokens: vec!["NA".to_string(), "NaN".to_string(), ".".to_string()],
            alphabet: Alphabet::default(),
        }
    }
}

impl TableOptions {
    fn is_missing_token(&self, token: &str) -> bool {
        token.is_empty() || self.missing_tokens.iter().any(|t| t == token)
    }

    fn read_options(&self) -> CsvReadOptions {
        // Schema inference is disabled so every column arrives as text and
        // labels like "AB" parse the same way as numeric codes.
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .with_parse_options(
                CsvParseOptions::default()
                    .with_separator(self.separator)
                    .with_missing_is_null(true),
            )
    }
}

/// Load a genotype table from disk.
pub fn read_genotype_table(path: impl AsRef<Path>, options: &TableOptions) -> Result<GenotypeMatrix> {
    let path = path.as_ref();
    info!("Loading genotype table from: {}", path.display());

    let df = options
        .read_options()
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))
        .and_then(|reader| reader.finish())
        .context(format!("Failed to read '{}'", path.display()))?;

    let matrix = dataframe_to_matrix(&df, options)
        .map_err(|e| e.with_context(format!("Invalid genotype table '{}'", path.display())))?;
    info!(
        "Loaded {} samples x {} loci ({} missing)",
        matrix.n_samples(),
        matrix.n_loci(),
        matrix.missing_count()
    );
    Ok(matrix)
}

/// Parse a genotype table held in memory.
pub fn parse_genotype_table(text: &str, options: &TableOptions) -> Result<GenotypeMatrix> {
    let df = options
        .read_options()
        .into_reader_with_file_handle(Cursor::new(text.to_owned()))
        .finish()?;
    dataframe_to_matrix(&df, options)
}

/// Convert a frame (first column = sample IDs) into a validated matrix.
pub fn dataframe_to_matrix(df: &DataFrame, options: &TableOptions) -> Result<GenotypeMatrix> {
    let columns = df.get_columns();
    if df.height() == 0 || columns.len() < 2 {
        return Err(ImputationError::EmptyMatrix);
    }

    let n_samples = df.height();
    let n_loci = columns.len() - 1;

    let id_series = columns[0].as_materialized_series().cast(&DataType::String)?;
    let ids = id_series.str()?;
    let sample_ids: Vec<String> = (0..n_samples)
        .map(|i| {
            ids.get(i)
                .map(str::to_string)
                .unwrap_or_else(|| format!("sample_{}", i))
        })
        .collect();

    let mut rows = vec![Vec::with_capacity(n_loci); n_samples];
    let mut locus_ids = Vec::with_capacity(n_loci);

    for (locus, column) in columns[1..].iter().enumerate() {
        locus_ids.push(column.name().to_string());
        let series = column.as_materialized_series().cast(&DataType::String)?;
        let values = series.str()?;

        for (sample, row) in rows.iter_mut().enumerate() {
            let cell = match values.get(sample).map(str::trim) {
                None => None,
                Some(token) if options.is_missing_token(token) => None,
                Some(token) => Some(options.alphabet.parse(token).ok_or_else(|| {
                    ImputationError::InvalidCategory {
                        sample,
                        locus,
                        value: token.to_string(),
                    }
                })?),
            };
            row.push(cell);
        }
    }
    debug!("Parsed {} loci from frame", locus_ids.len());

    GenotypeMatrix::new(rows, options.alphabet.clone())?
        .with_sample_ids(sample_ids)?
        .with_locus_ids(locus_ids)
}

/// Convert a matrix into a frame with a `sample` column and one integer
/// column per locus; missing cells become nulls.
pub fn matrix_to_dataframe(matrix: &GenotypeMatrix) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(matrix.n_loci() + 1);
    columns.push(Column::new(
        SAMPLE_COLUMN.into(),
        matrix.sample_ids().to_vec(),
    ));

    for (locus, name) in matrix.locus_ids().iter().enumerate() {
        let values: Vec<Option<i32>> = matrix
            .column(locus)
            .into_iter()
            .map(|cell| cell.map(i32::from))
            .collect();
        columns.push(Column::new(name.as_str().into(), values));
    }

    DataFrame::new(columns).context("Failed to build genotype frame")
}

/// Write a matrix as a delimited table, creating parent directories.
pub fn write_genotype_table(
    matrix: &GenotypeMatrix,
    path: impl AsRef<Path>,
    separator: u8,
) -> Result<()> {
    let path = path.as_ref();
    let mut df = matrix_to_dataframe(matrix)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(separator)
        .with_null_value(MISSING_OUTPUT.to_string())
        .finish(&mut df)
        .context(format!("Failed to write '{}'", path.display()))?;

    info!("Genotype table saved: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TABLE: &str = "id\trs1\trs2\trs3\n\
                         a\tAA\t0\tNA\n\
                         b\t1\t\tBB\n\
                         c\t-1\tAB\t.\n";

    #[test]
    fn test_parse_labels_codes_and_missing() {
        let m = parse_genotype_table(TABLE, &TableOptions::default()).unwrap();
        assert_eq!(m.shape(), (3, 3));
        assert_eq!(m.sample_ids(), &["a", "b", "c"]);
        assert_eq!(m.locus_ids(), &["rs1", "rs2", "rs3"]);
        assert_eq!(m.row(0), &[Some(-1), Some(0), None]);
        assert_eq!(m.row(1), &[Some(1), None, Some(1)]);
        assert_eq!(m.row(2), &[Some(-1), Some(0), None]);
    }

    #[test]
    fn test_parse_rejects_unknown_token() {
        let text = "id\trs1\na\tAA\nb\tCC\n";
        let err = parse_genotype_table(text, &TableOptions::default()).unwrap_err();
        match err {
            ImputationError::InvalidCategory { sample, locus, value } => {
                assert_eq!((sample, locus), (1, 0));
                assert_eq!(value, "CC");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_custom_missing_token() {
        let options = TableOptions {
            missing_tokens: vec!["-9".to_string()],
            ..TableOptions::default()
        };
        let m = parse_genotype_table("id\trs1\na\t-9\nb\t0\n", &options).unwrap();
        assert!(m.is_missing(0, 0));
    }

    #[test]
    fn test_parse_without_loci_is_empty() {
        let err = parse_genotype_table("id\na\nb\n", &TableOptions::default()).unwrap_err();
        assert!(matches!(err, ImputationError::EmptyMatrix));
    }

    #[test]
    fn test_matrix_to_dataframe_shape() {
        let m = parse_genotype_table(TABLE, &TableOptions::default()).unwrap();
        let df = matrix_to_dataframe(&m).unwrap();
        assert_eq!(df.shape(), (3, 4));
        assert_eq!(df.get_column_names()[0].as_str(), SAMPLE_COLUMN);
        assert_eq!(df.column("rs3").unwrap().null_count(), 2);
    }

    #[test]
    fn test_write_then_read() {
        let m = parse_genotype_table(TABLE, &TableOptions::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.tsv");

        write_genotype_table(&m, &path, b'\t').unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("sample\trs1\trs2\trs3"));
        assert!(written.contains("NA"));

        let reread = read_genotype_table(&path, &TableOptions::default()).unwrap();
        assert_eq!(reread, m);
    }
}
