use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use tracing::debug;

use crate::model::grouping::GroupingScheme;
use crate::model::modality::Level;
use crate::model::params::PlotRequest;
use crate::report::{BoxPayload, CountsPayload, HeatmapPayload, ScatterPayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlotKind {
    Scatter,
    Box,
    Heatmap,
    Counts { percentages: bool },
}

/// Canonical form of everything a payload depends on. Floats are keyed by
/// their bit patterns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: PlotKind,
    gene_ids: Vec<String>,
    ensemble: String,
    modality: String,
    clustering: String,
    embedding: String,
    grouping: GroupingScheme,
    level: Level,
    outliers: bool,
    hide_embedding_outliers: bool,
    p_lo: u64,
    p_hi: u64,
    normalize_rows: bool,
    smoothing: bool,
}

impl CacheKey {
    pub fn new(kind: PlotKind, gene_ids: Vec<String>, req: &PlotRequest) -> Self {
        Self {
            kind,
            gene_ids,
            ensemble: req.ensemble.clone(),
            modality: req.modality.label(),
            clustering: req.clustering.clone(),
            embedding: req.embedding.clone(),
            grouping: req.grouping,
            level: req.level,
            outliers: req.outliers,
            hide_embedding_outliers: req.hide_embedding_outliers,
            p_lo: req.p_lo.to_bits(),
            p_hi: req.p_hi.to_bits(),
            normalize_rows: req.normalize_rows,
            smoothing: req.smoothing,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CachedPayload {
    Scatter(Arc<ScatterPayload>),
    Box(Arc<BoxPayload>),
    Heatmap(Arc<HeatmapPayload>),
    Counts(Arc<CountsPayload>),
}

/// Bounded, expiring memo of finished payloads. Entries are pure functions
/// of their key.
#[derive(Clone)]
pub struct ResultCache {
    inner: Cache<CacheKey, CachedPayload>,
}

impl ResultCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<CachedPayload> {
        let hit = self.inner.get(key);
        debug!(
            "result cache {} for {:?}",
            if hit.is_some() { "hit" } else { "miss" },
            key.kind
        );
        hit
    }

    pub fn insert(&self, key: CacheKey, value: CachedPayload) {
        self.inner.insert(key, value);
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}
