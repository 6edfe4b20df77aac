use serde::{Deserialize, Serialize};

use crate::model::grouping::{CANONICAL_ANNOTATION_ORDER, GroupingScheme};
use crate::model::modality::{Level, Modality};
use crate::pipeline::stage7_order::{DistanceMetric, Linkage};

pub const DEFAULT_CLUSTERING: &str = "mCH_lv_npc50_k30";
pub const DEFAULT_EMBEDDING: &str = "mCH_ndim2_perp20";

/// Engine-wide knobs. Constructed once and passed to every stage that needs
/// them; nothing here is read from process state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub workers: usize,
    pub cache_capacity: u64,
    pub cache_ttl_secs: u64,
    pub color_epsilon: f64,
    pub tick_count: usize,
    pub tick_decimals: u32,
    pub outlier_quantile: f64,
    pub embedding_quantiles: (f64, f64),
    pub axis_padding: f64,
    pub annotation_order: Vec<String>,
    pub large_plot_threshold: usize,
    /// Heatmap axis ordering.
    pub distance_metric: DistanceMetric,
    pub linkage: Linkage,
}

impl EngineConfig {
    pub fn default_v1() -> Self {
        Self {
            workers: 4,
            cache_capacity: 1000,
            cache_ttl_secs: 1800,
            color_epsilon: 0.01,
            tick_count: 5,
            tick_decimals: 2,
            outlier_quantile: 0.99,
            embedding_quantiles: (0.001, 0.999),
            axis_padding: 0.1,
            annotation_order: CANONICAL_ANNOTATION_ORDER
                .iter()
                .map(|s| s.to_string())
                .collect(),
            large_plot_threshold: 3000,
            distance_metric: DistanceMetric::Euclidean,
            linkage: Linkage::Complete,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::default_v1()
    }
}

/// Per-request plot settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotRequest {
    pub ensemble: String,
    pub modality: Modality,
    #[serde(default = "default_clustering")]
    pub clustering: String,
    #[serde(default = "default_embedding")]
    pub embedding: String,
    #[serde(default)]
    pub grouping: GroupingScheme,
    #[serde(default)]
    pub level: Level,
    /// Keep cells above the outlier quantile.
    #[serde(default = "default_true")]
    pub outliers: bool,
    /// Clip embedding axes to `EngineConfig::embedding_quantiles`. Independent
    /// of `outliers`, which drops cells by metric value.
    #[serde(default)]
    pub hide_embedding_outliers: bool,
    #[serde(default = "default_p_lo")]
    pub p_lo: f64,
    #[serde(default = "default_p_hi")]
    pub p_hi: f64,
    #[serde(default)]
    pub normalize_rows: bool,
    #[serde(default)]
    pub smoothing: bool,
}

fn default_clustering() -> String {
    DEFAULT_CLUSTERING.to_string()
}

fn default_embedding() -> String {
    DEFAULT_EMBEDDING.to_string()
}

fn default_true() -> bool {
    true
}

fn default_p_lo() -> f64 {
    0.05
}

fn default_p_hi() -> f64 {
    0.95
}

impl PlotRequest {
    pub fn new(ensemble: &str, modality: Modality) -> Self {
        Self {
            ensemble: ensemble.to_string(),
            modality,
            clustering: default_clustering(),
            embedding: default_embedding(),
            grouping: GroupingScheme::default(),
            level: Level::default(),
            outliers: true,
            hide_embedding_outliers: false,
            p_lo: default_p_lo(),
            p_hi: default_p_hi(),
            normalize_rows: false,
            smoothing: false,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.p_lo) || !(0.0..=1.0).contains(&self.p_hi) {
            return Err(format!(
                "percentiles must lie in [0, 1], got {} and {}",
                self.p_lo, self.p_hi
            ));
        }
        if self.p_lo >= self.p_hi {
            return Err(format!(
                "lower percentile {} must be below upper percentile {}",
                self.p_lo, self.p_hi
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/params.rs"]
mod tests;
