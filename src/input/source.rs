use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::input::key::TableKey;
use crate::input::tsv::{find_table, read_rowset};
use crate::input::{ColumnScope, InputError, RowSet, RowSource};

pub const CELL_ID: &str = "cell_id";

/// Left join of the cohort's cells with one gene table, restricted to
/// `columns`. Output rows follow cohort order; cells without a measurement
/// get missing values. Requested columns present in neither input are left
/// out so callers can tell "absent" from "all missing".
pub fn join_cells(cells: &RowSet, gene: &RowSet, columns: &[String]) -> Result<RowSet, InputError> {
    let cell_col = cells
        .column_index(CELL_ID)
        .ok_or_else(|| InputError::Parse("cohort table has no cell_id column".to_string()))?;
    let gene_cell_col = gene
        .column_index(CELL_ID)
        .ok_or_else(|| InputError::Parse("gene table has no cell_id column".to_string()))?;

    let mut by_cell: HashMap<&str, usize> = HashMap::with_capacity(gene.len());
    for row in 0..gene.len() {
        if let Some(id) = gene.get(row, gene_cell_col) {
            by_cell.entry(id).or_insert(row);
        }
    }

    enum Src {
        Cell(usize),
        Gene(usize),
    }
    let mut picked = Vec::new();
    let mut names = Vec::new();
    for name in columns {
        let src = if name == CELL_ID {
            Some(Src::Cell(cell_col))
        } else if let Some(idx) = gene.column_index(name) {
            Some(Src::Gene(idx))
        } else {
            cells.column_index(name).map(Src::Cell)
        };
        if let Some(src) = src {
            picked.push(src);
            names.push(name.clone());
        }
    }

    let mut out = RowSet::new(names);
    for row in 0..cells.len() {
        let Some(id) = cells.get(row, cell_col) else {
            continue;
        };
        let gene_row = by_cell.get(id).copied();
        let values = picked.iter().map(|src| match *src {
            Src::Cell(c) => cells.get(row, c),
            Src::Gene(c) => gene_row.and_then(|g| gene.get(g, c)),
        });
        out.push_row(values);
    }
    Ok(out)
}

fn no_measurements() -> RowSet {
    RowSet::new(vec![CELL_ID.to_string()])
}

/// Row source over in-memory tables, keyed the same way as the directory
/// store.
#[derive(Debug, Clone, Default)]
pub struct MemoryRowSource {
    cohorts: HashMap<(String, String), RowSet>,
    genes: HashMap<(String, String), RowSet>,
}

impl MemoryRowSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_cohort(&mut self, store: &str, ensemble: &str, cells: RowSet) {
        self.cohorts
            .insert((store.to_string(), ensemble.to_string()), cells);
    }

    /// `gene_table` is the `gene_<id>` name, see [`TableKey::gene_table`].
    pub fn insert_gene(&mut self, store: &str, gene_table: &str, rows: RowSet) {
        self.genes
            .insert((store.to_string(), gene_table.to_string()), rows);
    }
}

impl RowSource for MemoryRowSource {
    fn fetch(&self, key: &TableKey, scope: ColumnScope) -> Result<Option<RowSet>, InputError> {
        let store = key.modality().store_name().to_string();
        let Some(cells) = self.cohorts.get(&(store.clone(), key.ensemble().to_string())) else {
            return Ok(None);
        };
        let columns = key.columns(scope);
        let Some(table) = key.gene_table() else {
            return join_cells(cells, &no_measurements(), &columns).map(Some);
        };
        let Some(gene) = self.genes.get(&(store, table)) else {
            return Ok(None);
        };
        join_cells(cells, gene, &columns).map(Some)
    }
}

/// Directory store:
/// `<root>/<store>/<ensemble>/cells.tsv[.gz]` and
/// `<root>/<store>/genes/gene_<id>.tsv[.gz]`.
#[derive(Debug, Clone)]
pub struct TsvRowSource {
    root: PathBuf,
}

impl TsvRowSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl RowSource for TsvRowSource {
    fn fetch(&self, key: &TableKey, scope: ColumnScope) -> Result<Option<RowSet>, InputError> {
        let store_dir = self.root.join(key.modality().store_name());
        let Some(cells_path) = find_table(&store_dir.join(key.ensemble()), "cells") else {
            debug!("no cohort table for ensemble {}", key.ensemble());
            return Ok(None);
        };
        let columns = key.columns(scope);
        let Some(table) = key.gene_table() else {
            let cells = read_rowset(&cells_path)?;
            return join_cells(&cells, &no_measurements(), &columns).map(Some);
        };
        let Some(gene_path) = find_table(&store_dir.join("genes"), &table) else {
            debug!("no gene table {table}");
            return Ok(None);
        };
        let cells = read_rowset(&cells_path)?;
        let gene = read_rowset(&gene_path)?;
        join_cells(&cells, &gene, &columns).map(Some)
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/source.rs"]
mod tests;
