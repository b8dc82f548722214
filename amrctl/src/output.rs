//! Result aggregation and workbook output.
//!
//! Downloaded files are parsed into per-sheet tables (settings as a
//! Key/Value table, everything else as tab-separated text with a header
//! row) and written out as `.xlsx`, one worksheet per sheet name.
//!

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use eyre::{eyre, Result};
use rust_xlsxwriter::Workbook;
use tracing::{debug, info};

use irida_client::{FileKey, ResultFile};

/// Column widths are capped so one pathological field does not stretch a
/// whole sheet.
const MAX_COLUMN_WIDTH: usize = 75;

/// One growable, column-labelled table bound for a worksheet.
///
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SheetTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Sheet-name indexed accumulation across analyses, insertion ordered.
///
#[derive(Debug, Default)]
pub struct SheetSet {
    sheets: Vec<(String, SheetTable)>,
}

impl SheetSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Fold a batch of result files in.  A new sheet name starts a table
    /// from the file's rows; an existing one only gains rows, the first
    /// seen header wins and column sets are not reconciled further.
    ///
    pub fn accumulate(&mut self, files: &[ResultFile]) -> Result<()> {
        for file in files {
            let table = parse_file(file)?;
            let name = file.key.sheet_name();
            match self.sheets.iter_mut().find(|(n, _)| n == name) {
                Some((_, existing)) => existing.rows.extend(table.rows),
                None => self.sheets.push((name.to_string(), table)),
            }
        }
        Ok(())
    }

    /// Write one workbook with one worksheet per accumulated sheet.  No
    /// row-index column is emitted.
    ///
    pub fn write_workbook(&self, path: &Path) -> Result<()> {
        info!("Creating a new file {path:?}.");
        let mut workbook = Workbook::new();

        for (name, table) in &self.sheets {
            debug!("Writing {name} data to {path:?}.");
            let sheet = workbook.add_worksheet();
            sheet.set_name(name)?;

            for (col, header) in table.headers.iter().enumerate() {
                sheet.write_string(0, col as u16, header)?;
            }
            for (r, row) in table.rows.iter().enumerate() {
                for (c, cell) in row.iter().enumerate() {
                    sheet.write_string(r as u32 + 1, c as u16, cell)?;
                }
            }
            for (col, width) in column_widths(table).iter().enumerate() {
                sheet.set_column_width(col as u16, *width as f64)?;
            }
        }

        workbook.save(path)?;
        Ok(())
    }
}

/// Parse one downloaded file into a table.
///
fn parse_file(file: &ResultFile) -> Result<SheetTable> {
    let text = String::from_utf8_lossy(&file.content);
    match file.key {
        FileKey::Settings => Ok(parse_settings(&text)),
        _ => parse_tsv(&text),
    }
}

/// `key = value` lines into a two-column Key/Value table.  Lines without a
/// `=` are skipped, both sides are trimmed.
///
fn parse_settings(text: &str) -> SheetTable {
    let rows = text
        .lines()
        .filter_map(|line| {
            line.split_once('=')
                .map(|(k, v)| vec![k.trim().to_string(), v.trim().to_string()])
        })
        .collect();
    SheetTable {
        headers: vec!["Key".to_string(), "Value".to_string()],
        rows,
    }
}

/// Tab-separated text, first line is the header row.
///
fn parse_tsv(text: &str) -> Result<SheetTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = rdr.headers()?.iter().map(String::from).collect();
    let mut rows = vec![];
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(String::from).collect());
    }
    Ok(SheetTable { headers, rows })
}

/// Per-column width: the longest of header and cells, capped.
///
fn column_widths(table: &SheetTable) -> Vec<usize> {
    let mut widths: Vec<usize> = table.headers.iter().map(|h| h.chars().count()).collect();
    for row in &table.rows {
        for (i, cell) in row.iter().enumerate() {
            if i >= widths.len() {
                widths.push(0);
            }
            widths[i] = widths[i].max(cell.chars().count());
        }
    }
    widths.into_iter().map(|w| w.min(MAX_COLUMN_WIDTH)).collect()
}

/// Where one run's workbooks land.
///
/// One directory per invocation, created up front, threaded explicitly
/// through the writer calls.
///
#[derive(Debug)]
pub struct OutputContext {
    dir: PathBuf,
    prefix: String,
}

impl OutputContext {
    /// Create the run directory `staramr-results-<now>` under `base`.
    ///
    pub fn create(base: &Path, prefix: &str) -> Result<Self> {
        let dir = base.join(format!(
            "staramr-results-{}",
            Local::now().format("%Y-%m-%dT%H-%M-%S")
        ));
        info!("Creating directory {dir:?} to store results files.");
        fs::create_dir_all(&dir)?;
        Ok(OutputContext {
            dir,
            prefix: prefix.to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the single aggregate-mode workbook.
    ///
    pub fn aggregate_path(&self) -> PathBuf {
        self.dir.join(format!("{}.xlsx", self.prefix))
    }

    /// Path for one analysis in split mode: `<prefix>-<created, UTC>`,
    /// suffixed ` (1)`, ` (2)`, ... while the name is already taken.
    ///
    pub fn split_path(&self, created_ms: i64) -> Result<PathBuf> {
        let date = DateTime::from_timestamp_millis(created_ms)
            .ok_or_else(|| eyre!("timestamp {created_ms} out of range"))?
            .format("%Y-%m-%dT%H-%M-%S");
        let base = format!("{}-{}", self.prefix, date);

        let mut name = format!("{base}.xlsx");
        let mut increment = 1;
        while self.dir.join(&name).is_file() {
            name = format!("{base} ({increment}).xlsx");
            info!("File name already exists, {name} generated.");
            increment += 1;
        }
        Ok(self.dir.join(name))
    }
}
