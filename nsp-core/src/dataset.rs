//! Dataset files.
//!
//! Generated items are written as CSV with a fixed column order. Querying and
//! scoring work on a [`Table`] instead, so answer and reasoning columns added
//! along the way survive every save/load cycle untouched.

use crate::generator::NspItem;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io;
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Column order of a freshly generated dataset.
pub const ITEM_COLUMNS: [&str; 9] = [
    "story_id",
    "story_length",
    "context",
    "context_length",
    "distractor_distance",
    "distractor_length",
    "option_A",
    "option_B",
    "label",
];

/// Errors from dataset operations.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Row {row} out of range ({len} rows)")]
    RowOutOfRange { row: usize, len: usize },
}

/// Write items as CSV, header first.
pub fn write_items<W: io::Write>(items: &[NspItem], writer: W) -> Result<(), DatasetError> {
    let mut wtr = csv::Writer::from_writer(writer);
    if items.is_empty() {
        wtr.write_record(ITEM_COLUMNS)?;
    }
    for item in items {
        wtr.serialize(item)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save items to a CSV file, creating parent directories as needed.
pub async fn save_items(items: &[NspItem], path: impl AsRef<Path>) -> Result<(), DatasetError> {
    let path = path.as_ref();
    let mut buffer = Vec::new();
    write_items(items, &mut buffer)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, buffer).await?;
    Ok(())
}

/// A CSV table held as strings, in file order.
///
/// Empty cells stand for missing values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table with the given columns.
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a table from generated items.
    pub fn from_items(items: &[NspItem]) -> Result<Self, DatasetError> {
        let mut buffer = Vec::new();
        write_items(items, &mut buffer)?;
        Self::from_reader(buffer.as_slice())
    }

    /// Parse CSV with a header row.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, DatasetError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        Ok(Self { headers, rows })
    }

    /// Write CSV with a header row.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), DatasetError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Load a table from a CSV file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let bytes = fs::read(path).await?;
        Self::from_reader(bytes.as_slice())
    }

    /// Save the table to a CSV file, replacing it.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        fs::write(path, buffer).await?;
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of `name`, or an error naming the missing column.
    pub fn require_column(&self, name: &str) -> Result<usize, DatasetError> {
        self.column_index(name)
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
    }

    /// Add `name` as an empty column if absent and return its index.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(index) = self.column_index(name) {
            return index;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.headers.len() - 1
    }

    /// Cell value, `None` if the row or column does not exist.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// Overwrite one cell.
    pub fn set(&mut self, row: usize, column: &str, value: impl Into<String>) -> Result<(), DatasetError> {
        let col = self.require_column(column)?;
        let len = self.rows.len();
        let cells = self
            .rows
            .get_mut(row)
            .ok_or(DatasetError::RowOutOfRange { row, len })?;
        cells[col] = value.into();
        Ok(())
    }

    /// Append a row; short rows are padded with empty cells, long rows truncated.
    pub fn push_row(&mut self, mut cells: Vec<String>) {
        cells.resize(self.headers.len(), String::new());
        self.rows.push(cells);
    }

    /// Rewrite every cell of column `col` in place.
    ///
    /// Callers pass an index obtained from [`Table::column_index`].
    pub(crate) fn map_column(&mut self, col: usize, mut f: impl FnMut(&str) -> String) {
        for cell in self.rows.iter_mut().filter_map(|row| row.get_mut(col)) {
            *cell = f(cell);
        }
    }

    /// Uniformly draw `min(n, len)` distinct rows, in draw order.
    pub fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Table {
        let amount = n.min(self.rows.len());
        let rows = rand::seq::index::sample(rng, self.rows.len(), amount)
            .into_iter()
            .map(|i| self.rows[i].clone())
            .collect();
        Table {
            headers: self.headers.clone(),
            rows,
        }
    }
}

/// Draw `min(n, rows)` rows without replacement from a fixed seed.
pub fn sample_rows(table: &Table, n: usize, seed: u64) -> Table {
    let mut rng = StdRng::seed_from_u64(seed);
    table.sample(n, &mut rng)
}
