use serde::{Deserialize, Serialize};

use crate::pipeline::stage6_aggregate::AggregateMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    Manhattan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Linkage {
    Single,
    #[default]
    Complete,
    Average,
}

/// Leaf order of the row and column dendrograms, as indices into the
/// original matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterOrdering {
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
}

/// Distance over the coordinates present in both vectors, scaled up to the
/// full length. Vectors sharing no coordinate are infinitely far apart.
pub fn distance(a: &[Option<f64>], b: &[Option<f64>], metric: DistanceMetric) -> f64 {
    let mut acc = 0f64;
    let mut shared = 0usize;
    for (x, y) in a.iter().zip(b) {
        let (Some(x), Some(y)) = (x, y) else {
            continue;
        };
        let d = x - y;
        acc += match metric {
            DistanceMetric::Euclidean => d * d,
            DistanceMetric::Manhattan => d.abs(),
        };
        shared += 1;
    }
    if shared == 0 {
        return f64::INFINITY;
    }
    let scaled = acc * a.len().max(b.len()) as f64 / shared as f64;
    match metric {
        DistanceMetric::Euclidean => scaled.sqrt(),
        DistanceMetric::Manhattan => scaled,
    }
}

/// Agglomerative clustering over `points`, returning the dendrogram leaf
/// order. At each step the closest active pair is
/// merged; ties go to the pair with the lowest indices, so the result is
/// fully determined by the input.
pub fn leaf_order(points: &[Vec<Option<f64>>], metric: DistanceMetric, linkage: Linkage) -> Vec<usize> {
    let n = points.len();
    if n < 2 {
        return (0..n).collect();
    }

    let mut dist = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = distance(&points[i], &points[j], metric);
            dist[i][j] = d;
            dist[j][i] = d;
        }
    }

    // members[i] holds the leaves of cluster i in dendrogram order
    let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
    let mut active: Vec<usize> = (0..n).collect();

    while active.len() > 1 {
        let mut best: Option<(f64, usize, usize)> = None;
        for (ai, &a) in active.iter().enumerate() {
            for &b in &active[ai + 1..] {
                let d = dist[a][b];
                if best.is_none_or(|(bd, _, _)| d.total_cmp(&bd).is_lt()) {
                    best = Some((d, a, b));
                }
            }
        }
        let Some((_, a, b)) = best else {
            break;
        };

        let size_a = members[a].len() as f64;
        let size_b = members[b].len() as f64;
        for &c in &active {
            if c == a || c == b {
                continue;
            }
            let (d_ac, d_bc) = (dist[a][c], dist[b][c]);
            let d = match linkage {
                Linkage::Single => d_ac.min(d_bc),
                Linkage::Complete => d_ac.max(d_bc),
                Linkage::Average => (d_ac * size_a + d_bc * size_b) / (size_a + size_b),
            };
            dist[a][c] = d;
            dist[c][a] = d;
        }

        let moved = std::mem::take(&mut members[b]);
        members[a].extend(moved);
        active.retain(|&c| c != b);
    }

    std::mem::take(&mut members[active[0]])
}

fn transpose(values: &[Vec<Option<f64>>], n_cols: usize) -> Vec<Vec<Option<f64>>> {
    (0..n_cols)
        .map(|c| values.iter().map(|row| row.get(c).copied().flatten()).collect())
        .collect()
}

/// Clusters rows (genes) and columns (groups) independently.
pub fn cluster_order(matrix: &AggregateMatrix, metric: DistanceMetric, linkage: Linkage) -> ClusterOrdering {
    let rows = leaf_order(&matrix.values, metric, linkage);
    let cols = leaf_order(&transpose(&matrix.values, matrix.n_cols()), metric, linkage);
    ClusterOrdering { rows, cols }
}

impl ClusterOrdering {
    /// Permutes values and both label lists together.
    pub fn apply(&self, matrix: &AggregateMatrix) -> AggregateMatrix {
        AggregateMatrix {
            row_labels: self.rows.iter().map(|&r| matrix.row_labels[r].clone()).collect(),
            col_labels: self.cols.iter().map(|&c| matrix.col_labels[c].clone()).collect(),
            values: self
                .rows
                .iter()
                .map(|&r| {
                    self.cols
                        .iter()
                        .map(|&c| matrix.values[r].get(c).copied().flatten())
                        .collect()
                })
                .collect(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage7_order.rs"]
mod tests;
