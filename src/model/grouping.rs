use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingScheme {
    #[default]
    Cluster,
    Annotation,
    Dataset,
    Sex,
    TargetRegion,
    Slice,
}

pub const MISSING_LABEL: &str = "None";
pub const MISSING_REGION_LABEL: &str = "N/A";

pub const CANONICAL_ANNOTATION_ORDER: &[&str] = &[
    "mL2/3", "mL4", "mL5-1", "mL5-2", "mDL-1", "mDL-2", "mL6-1", "mL6-2", "mDL-3", "mVip",
    "mNdnf-1", "mNdnf-2", "mPv", "mSst-1", "mSst-2", "None",
];

impl GroupingScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupingScheme::Cluster => "cluster",
            GroupingScheme::Annotation => "annotation",
            GroupingScheme::Dataset => "dataset",
            GroupingScheme::Sex => "sex",
            GroupingScheme::TargetRegion => "target_region",
            GroupingScheme::Slice => "slice",
        }
    }

    /// Column on the joined cell table the scheme reads its labels from.
    /// `slice` is derived from `dataset`.
    pub fn source_column(&self, clustering: &str) -> String {
        match self {
            GroupingScheme::Cluster => format!("cluster_{clustering}"),
            GroupingScheme::Annotation => format!("annotation_{clustering}"),
            GroupingScheme::Dataset | GroupingScheme::Slice => "dataset".to_string(),
            GroupingScheme::Sex => "sex".to_string(),
            GroupingScheme::TargetRegion => "target_region".to_string(),
        }
    }

    pub fn missing_label(&self) -> &'static str {
        match self {
            GroupingScheme::TargetRegion => MISSING_REGION_LABEL,
            _ => MISSING_LABEL,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            GroupingScheme::Cluster => "Cluster",
            GroupingScheme::Annotation => "Annotation",
            GroupingScheme::Dataset => "Dataset",
            GroupingScheme::Sex => "Sex",
            GroupingScheme::TargetRegion => "Target Region",
            GroupingScheme::Slice => "Slice",
        }
    }
}

impl fmt::Display for GroupingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupingScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cluster" => Ok(GroupingScheme::Cluster),
            "annotation" => Ok(GroupingScheme::Annotation),
            "dataset" => Ok(GroupingScheme::Dataset),
            "sex" => Ok(GroupingScheme::Sex),
            "target_region" | "region" => Ok(GroupingScheme::TargetRegion),
            "slice" => Ok(GroupingScheme::Slice),
            other => Err(format!("unknown grouping: {other}")),
        }
    }
}

/// Brain slice encoded in a dataset name, e.g. `CEMBA_3C_171206` -> `3C`,
/// `CEMBA_RS2_Bm3C_rep1` -> `3C`.
pub fn slice_of_dataset(dataset: &str) -> Option<String> {
    let fields: Vec<&str> = dataset.split('_').collect();
    if dataset.contains("RS2") {
        let field = fields.get(2)?;
        field.get(2..4).map(|s| s.to_string())
    } else {
        fields.get(1).map(|s| s.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/grouping.rs"]
mod tests;
