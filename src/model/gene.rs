use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneRecord {
    /// Versioned, species-scoped identifier such as `ENSMUSG00000026787.3`.
    pub gene_id: String,
    pub gene_name: String,
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub strand: String,
    pub gene_type: String,
}

impl GeneRecord {
    /// Identifier with any trailing `.N` version removed.
    pub fn unversioned_id(&self) -> &str {
        match self.gene_id.rsplit_once('.') {
            Some((base, version)) if version.chars().all(|c| c.is_ascii_digit()) => base,
            _ => &self.gene_id,
        }
    }
}

/// One resolver output slot. Unmatched tokens keep their position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GeneMatch {
    Found(GeneRecord),
    NotFound { token: String },
}

impl GeneMatch {
    pub fn record(&self) -> Option<&GeneRecord> {
        match self {
            GeneMatch::Found(g) => Some(g),
            GeneMatch::NotFound { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, GeneMatch::Found(_))
    }
}
