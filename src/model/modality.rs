use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A methylation context such as `mCH`, `mCG` or `mCA`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethylationType(String);

impl MethylationType {
    pub fn new(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let rest = raw.strip_prefix('m')?;
        if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Denominator column: the type without its leading `m` (`mCH` -> `CH`).
    pub fn context(&self) -> &str {
        &self.0[1..]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Modality {
    Methylation(MethylationType),
    Accessibility,
    Rna,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// numerator / denominator, summarised with the median
    Ratio,
    /// pre-normalised count, summarised with the mean
    Count,
}

/// Columns holding the raw components of one gene's measurement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureColumns {
    pub numerator: String,
    pub denominator: Option<String>,
    pub global: Option<String>,
}

impl Modality {
    pub fn metric_kind(&self) -> MetricKind {
        match self {
            Modality::Methylation(_) => MetricKind::Ratio,
            Modality::Accessibility | Modality::Rna => MetricKind::Count,
        }
    }

    /// Directory / database segment the modality's tables live under.
    pub fn store_name(&self) -> &'static str {
        match self {
            Modality::Methylation(_) => "methylation",
            Modality::Accessibility => "atac",
            Modality::Rna => "rna",
        }
    }

    pub fn measure_columns(&self, smoothed: bool) -> MeasureColumns {
        match self {
            Modality::Methylation(t) => MeasureColumns {
                numerator: t.as_str().to_string(),
                denominator: Some(t.context().to_string()),
                global: Some(format!("global_{}", t.as_str())),
            },
            Modality::Accessibility => MeasureColumns {
                numerator: if smoothed {
                    "smoothed_normalized_counts".to_string()
                } else {
                    "normalized_counts".to_string()
                },
                denominator: None,
                global: None,
            },
            Modality::Rna => MeasureColumns {
                numerator: "normalized_counts".to_string(),
                denominator: None,
                global: None,
            },
        }
    }

    pub fn label(&self) -> String {
        match self {
            Modality::Methylation(t) => t.as_str().to_string(),
            Modality::Accessibility => "ATAC".to_string(),
            Modality::Rna => "RNA".to_string(),
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for Modality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "atac" | "snatac" | "accessibility" => Ok(Modality::Accessibility),
            "rna" | "snrna" => Ok(Modality::Rna),
            _ => MethylationType::new(s)
                .map(Modality::Methylation)
                .ok_or_else(|| format!("unknown modality: {s}")),
        }
    }
}

impl TryFrom<String> for Modality {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Modality> for String {
    fn from(value: Modality) -> Self {
        value.label()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    #[default]
    Original,
    /// ratio divided by the cell's global ratio for the same context
    Normalized,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Original => "original",
            Level::Normalized => "normalized",
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "original" => Ok(Level::Original),
            "normalized" | "normalised" => Ok(Level::Normalized),
            other => Err(format!("invalid level: {other} (use original|normalized)")),
        }
    }
}

/// Number of embedding axes encoded in an embedding-scheme name such as
/// `mCH_ndim2_perp20`.
pub fn embedding_dims(embedding: &str) -> usize {
    if embedding.contains("ndim3") { 3 } else { 2 }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/modality.rs"]
mod tests;
