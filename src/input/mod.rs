pub mod catalog;
pub mod key;
pub mod source;
pub mod tsv;

pub use catalog::{GeneCatalog, MemoryGeneCatalog};
pub use key::TableKey;
pub use source::{MemoryRowSource, TsvRowSource};

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid identifier for {field}: {value:?}")]
    InvalidIdentifier { field: &'static str, value: String },
    #[error("row source failure: {0}")]
    Source(String),
}

/// Named columns of string cells as handed over by a row-fetch service.
/// `None` is a missing value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RowSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let mut row: Vec<Option<String>> = values.into_iter().map(|v| v.map(Into::into)).collect();
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnScope {
    /// measurements plus grouping, embedding and global-ratio columns
    Full,
    /// `cell_id` and the measurement columns only
    MeasurementOnly,
}

/// Row-fetch service. `Ok(None)` means the cohort or the gene table does not
/// exist; an `Err` aborts the request.
pub trait RowSource: Send + Sync {
    fn fetch(&self, key: &TableKey, scope: ColumnScope) -> Result<Option<RowSet>, InputError>;
}
