use crate::input::{ColumnScope, InputError};
use crate::model::modality::{MeasureColumns, Modality, embedding_dims};

const MAX_IDENTIFIER_LEN: usize = 128;

/// Validated lookup key for one gene's rows in one cohort. Every identifier
/// that ends up in a table or column name goes through [`check_identifier`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableKey {
    modality: Modality,
    ensemble: String,
    gene_id: Option<String>,
    clustering: String,
    embedding: String,
    smoothed: bool,
}

/// Identifiers also become path segments in the directory store, so `.`,
/// `..` and any leading dot or `..` run are refused.
pub fn check_identifier(field: &'static str, value: &str) -> Result<(), InputError> {
    let ok = !value.is_empty()
        && value.len() <= MAX_IDENTIFIER_LEN
        && !value.starts_with('.')
        && !value.contains("..")
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if ok {
        Ok(())
    } else {
        Err(InputError::InvalidIdentifier {
            field,
            value: value.to_string(),
        })
    }
}

impl TableKey {
    pub fn new(
        modality: &Modality,
        ensemble: &str,
        gene_id: &str,
        clustering: &str,
        embedding: &str,
        smoothed: bool,
    ) -> Result<Self, InputError> {
        check_identifier("gene_id", gene_id)?;
        let mut key = Self::cohort(modality, ensemble, clustering, embedding, smoothed)?;
        key.gene_id = Some(gene_id.to_string());
        Ok(key)
    }

    /// Key for the cohort's cell metadata alone, with no measurement columns.
    pub fn cohort(
        modality: &Modality,
        ensemble: &str,
        clustering: &str,
        embedding: &str,
        smoothed: bool,
    ) -> Result<Self, InputError> {
        check_identifier("ensemble", ensemble)?;
        check_identifier("clustering", clustering)?;
        check_identifier("embedding", embedding)?;
        Ok(Self {
            modality: modality.clone(),
            ensemble: ensemble.to_string(),
            gene_id: None,
            clustering: clustering.to_string(),
            embedding: embedding.to_string(),
            smoothed,
        })
    }

    pub fn modality(&self) -> &Modality {
        &self.modality
    }

    pub fn ensemble(&self) -> &str {
        &self.ensemble
    }

    pub fn gene_id(&self) -> Option<&str> {
        self.gene_id.as_deref()
    }

    pub fn clustering(&self) -> &str {
        &self.clustering
    }

    /// `gene_ENSMUSG00000026787_3` for `ENSMUSG00000026787.3`.
    pub fn gene_table(&self) -> Option<String> {
        self.gene_id
            .as_ref()
            .map(|id| format!("gene_{}", id.replace('.', "_")))
    }

    pub fn cluster_column(&self) -> String {
        format!("cluster_{}", self.clustering)
    }

    pub fn annotation_column(&self) -> String {
        format!("annotation_{}", self.clustering)
    }

    pub fn embedding_columns(&self) -> Vec<String> {
        let axes = ["x", "y", "z"];
        axes[..embedding_dims(&self.embedding)]
            .iter()
            .map(|axis| format!("tsne_{axis}_{}", self.embedding))
            .collect()
    }

    pub fn measure_columns(&self) -> MeasureColumns {
        self.modality.measure_columns(self.smoothed)
    }

    pub fn columns(&self, scope: ColumnScope) -> Vec<String> {
        let measures = self.measure_columns();
        let mut out = vec!["cell_id".to_string()];
        if scope == ColumnScope::Full {
            out.extend(
                ["dataset", "sex", "target_region"]
                    .iter()
                    .map(|s| s.to_string()),
            );
            out.push(self.cluster_column());
            out.push(self.annotation_column());
            out.extend(self.embedding_columns());
            if let Some(global) = measures.global {
                out.push(global);
            }
        }
        if self.gene_id.is_some() {
            out.push(measures.numerator);
            if let Some(den) = measures.denominator {
                out.push(den);
            }
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/key.rs"]
mod tests;
