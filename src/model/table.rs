use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Text(Vec<Option<String>>),
    Number(Vec<Option<f64>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Text(v) => v.len(),
            Column::Number(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn select(&self, rows: &[usize]) -> Column {
        match self {
            Column::Text(v) => Column::Text(rows.iter().map(|&i| v[i].clone()).collect()),
            Column::Number(v) => Column::Number(rows.iter().map(|&i| v[i]).collect()),
        }
    }
}

/// One row per cell, columns addressed by name. Every column has exactly
/// `cell_ids.len()` entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellTable {
    cell_ids: Vec<String>,
    columns: Vec<(String, Column)>,
}

impl CellTable {
    pub fn new(cell_ids: Vec<String>) -> Self {
        Self {
            cell_ids,
            columns: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.cell_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_ids.is_empty()
    }

    pub fn cell_ids(&self) -> &[String] {
        &self.cell_ids
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    pub fn text(&self, name: &str) -> Option<&[Option<String>]> {
        match self.column(name)? {
            Column::Text(v) => Some(v),
            Column::Number(_) => None,
        }
    }

    pub fn number(&self, name: &str) -> Option<&[Option<f64>]> {
        match self.column(name)? {
            Column::Number(v) => Some(v),
            Column::Text(_) => None,
        }
    }

    /// Adds or replaces a column. Columns of the wrong length are rejected.
    pub fn set_column(&mut self, name: &str, column: Column) -> bool {
        if column.len() != self.cell_ids.len() {
            return false;
        }
        match self.columns.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = column,
            None => self.columns.push((name.to_string(), column)),
        }
        true
    }

    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.columns.iter().position(|(n, _)| n == name)?;
        Some(self.columns.remove(idx).1)
    }

    pub fn retain_rows(&mut self, keep: &[bool]) {
        let rows: Vec<usize> = (0..self.len()).filter(|&i| keep.get(i) == Some(&true)).collect();
        self.select_rows(&rows);
    }

    /// Reorders (or subsets) rows to `rows`, which index the current table.
    pub fn select_rows(&mut self, rows: &[usize]) {
        self.cell_ids = rows.iter().map(|&i| self.cell_ids[i].clone()).collect();
        for (_, col) in &mut self.columns {
            *col = col.select(rows);
        }
    }

    pub fn row_index(&self) -> HashMap<&str, usize> {
        self.cell_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/table.rs"]
mod tests;
