use std::sync::Arc;
use std::time::Duration;

use rayon::ThreadPool;
use tracing::{info, warn};

use crate::input::catalog::GeneCatalog;
use crate::input::key::TableKey;
use crate::input::{ColumnScope, RowSource};
use crate::model::gene::{GeneMatch, GeneRecord};
use crate::model::grouping::GroupingScheme;
use crate::model::modality::{Level, MetricKind, Modality};
use crate::model::params::{EngineConfig, PlotRequest};
use crate::model::table::CellTable;
use crate::pipeline::GmaeError;
use crate::pipeline::cache::{CacheKey, CachedPayload, PlotKind, ResultCache};
use crate::pipeline::stage1_resolve::{resolve_genes, search_gene_names};
use crate::pipeline::stage2_load::{LoadParams, LoadedRows, load_rows, rowset_to_table};
use crate::pipeline::stage3_derive::{
    METRIC, derive_metric, derive_per_gene, gene_metric_column, trim_outliers,
};
use crate::pipeline::stage4_group::{GroupedTable, assign_groups, group_counts};
use crate::pipeline::stage5_color::{ColorMapping, ColorParams, color_map};
use crate::pipeline::stage6_aggregate::{AggregateMatrix, aggregate, normalize_rows};
use crate::pipeline::stage7_order::{ClusterOrdering, cluster_order};
use crate::report::{
    BoxPayload, BoxSeries, CountsPayload, GroupCount, GroupTrace, HeatmapPayload,
    ScatterPayload, axis_range, group_palette, heatmap_column_labels, hover_text, marker_size,
};
use crate::stats;

/// Request-scoped aggregation pipeline over a row source and a gene catalog.
/// The only state shared between requests is the optional result cache.
pub struct Engine {
    source: Box<dyn RowSource>,
    catalog: Box<dyn GeneCatalog>,
    config: EngineConfig,
    pool: ThreadPool,
    cache: Option<ResultCache>,
}

fn metric_title(modality: &Modality, level: Level) -> String {
    let cols = modality.measure_columns(false);
    match cols.denominator {
        Some(den) => format!("{}/{} {}", cols.numerator, den, level.as_str()),
        None => format!("{} normalized counts", modality.label()),
    }
}

impl Engine {
    pub fn new(
        source: Box<dyn RowSource>,
        catalog: Box<dyn GeneCatalog>,
        config: EngineConfig,
    ) -> Result<Self, GmaeError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers.max(1))
            .thread_name(|i| format!("gmae-load-{i}"))
            .build()
            .map_err(|e| GmaeError::FailedToAggregate(format!("worker pool: {e}")))?;
        let cache = (config.cache_capacity > 0).then(|| {
            ResultCache::new(
                config.cache_capacity,
                Duration::from_secs(config.cache_ttl_secs),
            )
        });
        Ok(Self {
            source,
            catalog,
            config,
            pool,
            cache,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&ResultCache> {
        self.cache.as_ref()
    }

    pub fn resolve_genes(&self, tokens: &[String]) -> Vec<GeneMatch> {
        resolve_genes(self.catalog.as_ref(), tokens)
    }

    pub fn search_genes(&self, prefix: &str) -> Vec<GeneRecord> {
        search_gene_names(self.catalog.as_ref(), prefix)
    }

    /// Resolved records for every token; any unresolved token fails the
    /// request.
    fn found_genes(&self, tokens: &[String]) -> Result<Vec<GeneRecord>, GmaeError> {
        let matches = self.resolve_genes(tokens);
        let missing: Vec<&str> = matches
            .iter()
            .filter_map(|m| match m {
                GeneMatch::NotFound { token } => Some(token.as_str()),
                GeneMatch::Found(_) => None,
            })
            .collect();
        if !missing.is_empty() {
            return Err(GmaeError::NotFound(format!("genes {}", missing.join(", "))));
        }
        if matches.is_empty() {
            return Err(GmaeError::NotFound("no genes requested".to_string()));
        }
        Ok(matches
            .into_iter()
            .filter_map(|m| match m {
                GeneMatch::Found(g) => Some(g),
                GeneMatch::NotFound { .. } => None,
            })
            .collect())
    }

    fn load(&self, genes: &[GeneRecord], req: &PlotRequest) -> Result<LoadedRows, GmaeError> {
        let params = LoadParams {
            modality: &req.modality,
            ensemble: &req.ensemble,
            clustering: &req.clustering,
            embedding: &req.embedding,
            smoothed: req.smoothing,
        };
        load_rows(self.source.as_ref(), &self.pool, genes, &params)
    }

    /// Per-cell metric for `genes` averaged by components, trimmed of
    /// outliers unless `req.outliers` is set.
    pub fn load_and_derive(&self, genes: &[GeneRecord], req: &PlotRequest) -> Result<CellTable, GmaeError> {
        req.validate().map_err(GmaeError::InvalidRequest)?;
        let loaded = self.load(genes, req)?;
        let mut table = derive_metric(&loaded, req.modality.metric_kind(), req.level)?;
        if !req.outliers {
            trim_outliers(&mut table, self.config.outlier_quantile);
        }
        Ok(table)
    }

    pub fn group(&self, table: CellTable, req: &PlotRequest) -> Result<GroupedTable, GmaeError> {
        assign_groups(
            table,
            req.grouping,
            &req.clustering,
            &self.config.annotation_order,
        )
    }

    pub fn color_map(
        &self,
        values: &[Option<f64>],
        p_lo: f64,
        p_hi: f64,
        normalized: bool,
        min_ticks: usize,
    ) -> Result<ColorMapping, GmaeError> {
        color_map(
            values,
            &ColorParams {
                p_lo,
                p_hi,
                epsilon: self.config.color_epsilon,
                tick_count: self.config.tick_count,
                decimals: self.config.tick_decimals,
                normalized,
                min_ticks,
            },
        )
    }

    pub fn aggregate(
        &self,
        grouped: &GroupedTable,
        rows: &[(String, String)],
        kind: MetricKind,
    ) -> Result<AggregateMatrix, GmaeError> {
        aggregate(grouped, rows, kind)
    }

    pub fn cluster_order(&self, matrix: &AggregateMatrix) -> ClusterOrdering {
        cluster_order(matrix, self.config.distance_metric, self.config.linkage)
    }

    fn cached<T>(
        &self,
        key: CacheKey,
        wrap: fn(Arc<T>) -> CachedPayload,
        unwrap: fn(CachedPayload) -> Option<Arc<T>>,
        build: impl FnOnce() -> Result<T, GmaeError>,
    ) -> Result<Arc<T>, GmaeError> {
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(&key)).and_then(unwrap) {
            return Ok(hit);
        }
        let value = Arc::new(build()?);
        if let Some(cache) = &self.cache {
            cache.insert(key, wrap(Arc::clone(&value)));
        }
        Ok(value)
    }

    pub fn scatter(&self, tokens: &[String], req: &PlotRequest) -> Result<Arc<ScatterPayload>, GmaeError> {
        let genes = self.found_genes(tokens)?;
        let key = CacheKey::new(PlotKind::Scatter, gene_ids(&genes), req);
        self.cached(
            key,
            CachedPayload::Scatter,
            |p| match p {
                CachedPayload::Scatter(v) => Some(v),
                _ => None,
            },
            || self.build_scatter(genes, req),
        )
    }

    fn build_scatter(&self, genes: Vec<GeneRecord>, req: &PlotRequest) -> Result<ScatterPayload, GmaeError> {
        let table = self.load_and_derive(&genes, req)?;
        let grouped = self.group(table, req)?;
        let table = &grouped.table;
        let values = table.number(METRIC).unwrap_or_default().to_vec();
        let mapping = self.color_map(
            &values,
            req.p_lo,
            req.p_hi,
            req.level == Level::Normalized,
            0,
        )?;

        let axes = TableKey::cohort(
            &req.modality,
            &req.ensemble,
            &req.clustering,
            &req.embedding,
            req.smoothing,
        )?
        .embedding_columns();
        let clip = req
            .hide_embedding_outliers
            .then_some(self.config.embedding_quantiles);
        let coords: Vec<Vec<Option<f64>>> = axes
            .iter()
            .map(|name| {
                table
                    .number(name)
                    .map(<[Option<f64>]>::to_vec)
                    .unwrap_or_else(|| vec![None; table.len()])
            })
            .collect();
        let axis_ranges = coords
            .iter()
            .map(|c| axis_range(c, clip, self.config.axis_padding))
            .collect();

        let labels = grouped.labels();
        let title = metric_title(&req.modality, req.level);
        let metadata: Vec<(&str, Option<&[Option<String>]>)> = [
            GroupingScheme::Annotation,
            GroupingScheme::Cluster,
            GroupingScheme::TargetRegion,
            GroupingScheme::Dataset,
        ]
        .iter()
        .map(|s| (s.title(), table.text(&s.source_column(&req.clustering))))
        .collect();
        // derived groupings are not a table column of their own
        let group_field = matches!(grouped.scheme, GroupingScheme::Sex | GroupingScheme::Slice)
            .then(|| grouped.scheme.title());
        let hover = (0..table.len())
            .map(|i| {
                let mut fields = vec![("Cell", Some(table.cell_ids()[i].clone()))];
                for (name, column) in &metadata {
                    fields.push((*name, column.and_then(|c| c[i].clone())));
                }
                if let Some(name) = group_field {
                    fields.push((name, labels[i].clone()));
                }
                fields.push((title.as_str(), values[i].map(|v| format!("{v:.3}"))));
                hover_text(&fields)
            })
            .collect();

        let palette = group_palette(grouped.groups.len());
        let groups = grouped
            .groups
            .iter()
            .zip(&palette)
            .map(|(g, color)| GroupTrace {
                label: g.clone(),
                color: color.clone(),
                cells: labels
                    .iter()
                    .enumerate()
                    .filter(|(_, l)| l.as_deref() == Some(g.as_str()))
                    .map(|(i, _)| i)
                    .collect(),
            })
            .collect();

        info!(
            "scatter for {} gene(s): {} cells, {} groups",
            genes.len(),
            table.len(),
            grouped.groups.len()
        );
        Ok(ScatterPayload {
            modality: req.modality.label(),
            level: req.level,
            requested_grouping: grouped.requested,
            grouping: grouped.scheme,
            cell_ids: table.cell_ids().to_vec(),
            marker_size: marker_size(table.len(), self.config.large_plot_threshold),
            coords,
            axis_ranges,
            values,
            colors: mapping.colors,
            color_scale: mapping.scale,
            ticks: mapping.ticks,
            hover,
            groups,
            genes,
        })
    }

    pub fn box_plot(&self, tokens: &[String], req: &PlotRequest) -> Result<Arc<BoxPayload>, GmaeError> {
        let genes = self.found_genes(tokens)?;
        let key = CacheKey::new(PlotKind::Box, gene_ids(&genes), req);
        self.cached(
            key,
            CachedPayload::Box,
            |p| match p {
                CachedPayload::Box(v) => Some(v),
                _ => None,
            },
            || self.build_box(genes, req),
        )
    }

    fn build_box(&self, genes: Vec<GeneRecord>, req: &PlotRequest) -> Result<BoxPayload, GmaeError> {
        let table = self.load_and_derive(&genes, req)?;
        let grouped = self.group(table, req)?;
        let values = grouped.table.number(METRIC).unwrap_or_default();
        let labels = grouped.labels();
        let palette = group_palette(grouped.groups.len());
        let boxpoints = if req.outliers {
            "suspectedoutliers"
        } else {
            "false"
        };
        let series = grouped
            .groups
            .iter()
            .zip(&palette)
            .map(|(g, color)| BoxSeries {
                group: g.clone(),
                color: color.clone(),
                values: labels
                    .iter()
                    .zip(values)
                    .filter(|(l, _)| l.as_deref() == Some(g.as_str()))
                    .filter_map(|(_, v)| *v)
                    .collect(),
                boxpoints,
            })
            .collect();
        Ok(BoxPayload {
            modality: req.modality.label(),
            level: req.level,
            requested_grouping: grouped.requested,
            grouping: grouped.scheme,
            y_title: metric_title(&req.modality, req.level),
            series,
            genes,
        })
    }

    pub fn heatmap(&self, tokens: &[String], req: &PlotRequest) -> Result<Arc<HeatmapPayload>, GmaeError> {
        let genes = self.found_genes(tokens)?;
        let key = CacheKey::new(PlotKind::Heatmap, gene_ids(&genes), req);
        self.cached(
            key,
            CachedPayload::Heatmap,
            |p| match p {
                CachedPayload::Heatmap(v) => Some(v),
                _ => None,
            },
            || self.build_heatmap(req, &genes),
        )
    }

    fn build_heatmap(&self, req: &PlotRequest, genes: &[GeneRecord]) -> Result<HeatmapPayload, GmaeError> {
        req.validate().map_err(GmaeError::InvalidRequest)?;
        let loaded = self.load(genes, req)?;
        let kind = req.modality.metric_kind();
        let (table, loaded_genes) = derive_per_gene(&loaded, kind, req.level)?;
        let grouped = self.group(table, req)?;

        let rows: Vec<(String, String)> = loaded_genes
            .iter()
            .enumerate()
            .map(|(i, g)| (g.gene.gene_name.clone(), gene_metric_column(i)))
            .collect();
        let mut matrix = self.aggregate(&grouped, &rows, kind)?;
        if req.normalize_rows {
            normalize_rows(&mut matrix);
        }
        let ordering = self.cluster_order(&matrix);
        let sorted = ordering.apply(&matrix);
        let mapping = self.color_map(
            &sorted.present_values(),
            req.p_lo,
            req.p_hi,
            req.normalize_rows,
            sorted.n_rows(),
        )?;

        info!(
            "heatmap {}x{} over {} groups",
            sorted.n_rows(),
            sorted.n_cols(),
            grouped.scheme
        );
        Ok(HeatmapPayload {
            genes: loaded_genes.into_iter().map(|g| g.gene).collect(),
            modality: req.modality.label(),
            requested_grouping: grouped.requested,
            grouping: grouped.scheme,
            normalized_rows: req.normalize_rows,
            col_labels: heatmap_column_labels(&sorted.col_labels, grouped.scheme),
            row_labels: sorted.row_labels,
            values: sorted.values,
            ordering,
            color_scale: mapping.scale,
            ticks: mapping.ticks,
        })
    }

    /// Cells per group over the whole cohort, optionally as percentages.
    pub fn group_counts(&self, req: &PlotRequest, percentages: bool) -> Result<Arc<CountsPayload>, GmaeError> {
        let key = CacheKey::new(PlotKind::Counts { percentages }, Vec::new(), req);
        self.cached(
            key,
            CachedPayload::Counts,
            |p| match p {
                CachedPayload::Counts(v) => Some(v),
                _ => None,
            },
            || self.build_counts(req, percentages),
        )
    }

    fn build_counts(&self, req: &PlotRequest, percentages: bool) -> Result<CountsPayload, GmaeError> {
        let key = TableKey::cohort(
            &req.modality,
            &req.ensemble,
            &req.clustering,
            &req.embedding,
            req.smoothing,
        )?;
        let Some(rows) = self.source.fetch(&key, ColumnScope::Full)? else {
            return Err(GmaeError::NotFound(format!("ensemble {}", req.ensemble)));
        };
        let grouped = self.group(rowset_to_table(&rows, &[])?, req)?;
        let counts = group_counts(&grouped);
        let total: usize = counts.iter().map(|(_, n)| n).sum();
        if total == 0 {
            warn!("ensemble {} has no labelled cells", req.ensemble);
        }
        let palette = group_palette(counts.len());
        let label = req.modality.label();
        let groups = counts
            .into_iter()
            .zip(palette)
            .map(|((group, cells), color)| {
                let (value, text) = if percentages && total > 0 {
                    let pct = 100.0 * cells as f64 / total as f64;
                    (pct, format!("{}% {label} cells", stats::round_to(pct, 1)))
                } else {
                    (cells as f64, format!("{cells} {label} cells"))
                };
                GroupCount {
                    group,
                    cells,
                    value,
                    color,
                    text,
                }
            })
            .collect();
        Ok(CountsPayload {
            modality: label.clone(),
            requested_grouping: grouped.requested,
            grouping: grouped.scheme,
            percentages,
            total,
            y_title: if percentages {
                "Percent of cells per group".to_string()
            } else {
                "Number of cells per group".to_string()
            },
            groups,
        })
    }
}

fn gene_ids(genes: &[GeneRecord]) -> Vec<String> {
    genes.iter().map(|g| g.gene_id.clone()).collect()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/engine.rs"]
mod tests;
