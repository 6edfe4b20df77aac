use std::path::Path;

use tracing::debug;

use crate::input::InputError;
use crate::input::tsv::{parse_number, read_rowset};
use crate::model::gene::GeneRecord;

/// Gene catalog lookup. Results come back in catalog order.
pub trait GeneCatalog: Send + Sync {
    /// ASCII case-insensitive identifier prefix match.
    fn by_id_prefix(&self, prefix: &str) -> Vec<GeneRecord>;
    /// Case-insensitive name prefix match, for autocomplete.
    fn by_name_prefix(&self, prefix: &str) -> Vec<GeneRecord>;
    /// Case-insensitive exact name match.
    fn by_name_exact(&self, name: &str) -> Vec<GeneRecord>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryGeneCatalog {
    genes: Vec<GeneRecord>,
}

impl MemoryGeneCatalog {
    pub fn new(genes: Vec<GeneRecord>) -> Self {
        Self { genes }
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Reads `gene_id, gene_name, chr, start, end, strand, gene_type` from a
    /// (optionally gzipped) TSV with a header row.
    pub fn from_tsv(path: &Path) -> Result<Self, InputError> {
        let rows = read_rowset(path)?;
        let col = |name: &str| {
            rows.column_index(name)
                .ok_or_else(|| InputError::Parse(format!("gene catalog lacks column {name}")))
        };
        let id_col = col("gene_id")?;
        let name_col = col("gene_name")?;
        let chr_col = rows.column_index("chr").or_else(|| rows.column_index("chrom"));
        let start_col = rows.column_index("start");
        let end_col = rows.column_index("end");
        let strand_col = rows.column_index("strand");
        let type_col = rows.column_index("gene_type");

        let text = |row: usize, c: Option<usize>| {
            c.and_then(|c| rows.get(row, c))
                .unwrap_or_default()
                .to_string()
        };
        let coord = |row: usize, c: Option<usize>| {
            parse_number(c.and_then(|c| rows.get(row, c)))
                .map(|v| v.max(0.0) as u64)
                .unwrap_or(0)
        };

        let mut genes = Vec::with_capacity(rows.len());
        for row in 0..rows.len() {
            let Some(gene_id) = rows.get(row, id_col) else {
                debug!("gene catalog row {} has no gene_id; skipping", row + 2);
                continue;
            };
            genes.push(GeneRecord {
                gene_id: gene_id.to_string(),
                gene_name: text(row, Some(name_col)),
                chrom: text(row, chr_col),
                start: coord(row, start_col),
                end: coord(row, end_col),
                strand: text(row, strand_col),
                gene_type: text(row, type_col),
            });
        }
        Ok(Self { genes })
    }
}

impl GeneCatalog for MemoryGeneCatalog {
    fn by_id_prefix(&self, prefix: &str) -> Vec<GeneRecord> {
        self.genes
            .iter()
            .filter(|g| {
                g.gene_id
                    .get(..prefix.len())
                    .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
            })
            .cloned()
            .collect()
    }

    fn by_name_prefix(&self, prefix: &str) -> Vec<GeneRecord> {
        let prefix = prefix.to_lowercase();
        self.genes
            .iter()
            .filter(|g| g.gene_name.to_lowercase().starts_with(&prefix))
            .cloned()
            .collect()
    }

    fn by_name_exact(&self, name: &str) -> Vec<GeneRecord> {
        let name = name.to_lowercase();
        self.genes
            .iter()
            .filter(|g| g.gene_name.to_lowercase() == name)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/catalog.rs"]
mod tests;
