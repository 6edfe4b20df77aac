use serde::Serialize;

use crate::pipeline::GmaeError;
use crate::stats;

/// Colour assigned to cells without a value.
pub const MISSING_COLOR: &str = "grey";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorScale {
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// A clamped value, or the missing-value sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MappedColor {
    Value(f64),
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    pub value: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorMapping {
    pub scale: ColorScale,
    pub colors: Vec<MappedColor>,
    pub ticks: Vec<Tick>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorParams {
    pub p_lo: f64,
    pub p_hi: f64,
    pub epsilon: f64,
    pub tick_count: usize,
    pub decimals: u32,
    /// Data is already normalized; a lower bound rounding to 0 is labelled
    /// plainly.
    pub normalized: bool,
    /// Number of series the colour bar annotates.
    pub min_ticks: usize,
}

pub fn color_bounds(values: &[Option<f64>], p_lo: f64, p_hi: f64, epsilon: f64) -> Result<ColorScale, GmaeError> {
    let sorted = stats::sorted(&stats::present(values));
    let (Some(lo), Some(mut hi)) = (
        stats::quantile_sorted(&sorted, p_lo),
        stats::quantile_sorted(&sorted, p_hi),
    ) else {
        return Err(GmaeError::DegenerateInput(
            "no values to build a colour scale from".to_string(),
        ));
    };
    if hi <= lo {
        hi = lo + epsilon;
    }
    Ok(ColorScale {
        lower_bound: lo,
        upper_bound: hi,
    })
}

pub fn map_value(value: Option<f64>, scale: &ColorScale) -> MappedColor {
    match value.filter(|v| !v.is_nan()) {
        None => MappedColor::Missing(MISSING_COLOR),
        Some(v) if v < scale.lower_bound => MappedColor::Value(scale.lower_bound),
        Some(v) if v > scale.upper_bound => MappedColor::Value(scale.upper_bound),
        Some(v) => MappedColor::Value(v),
    }
}

fn format_label(v: f64, decimals: u32) -> String {
    stats::round_to(v, decimals).to_string()
}

/// Evenly spaced ticks from lower to upper bound inclusive. The ends are
/// labelled `<lo` and `>hi`; see [`ColorParams::normalized`] for the
/// exception. The list is padded at the front with copies of the lowest tick
/// up to `min_ticks`.
pub fn ticks(scale: &ColorScale, params: &ColorParams) -> Vec<Tick> {
    let n = params.tick_count.max(2);
    let lo = scale.lower_bound;
    let step = (scale.upper_bound - lo) / (n - 1) as f64;
    let mut out: Vec<Tick> = (0..n)
        .map(|i| {
            let value = if i == n - 1 {
                scale.upper_bound
            } else {
                lo + step * i as f64
            };
            Tick {
                value,
                label: format_label(value, params.decimals),
            }
        })
        .collect();

    let plain_first = params.normalized && stats::round_to(lo, params.decimals) == 0.0;
    if !plain_first {
        out[0].label = format!("<{}", out[0].label);
    }
    out[n - 1].label = format!(">{}", out[n - 1].label);

    while out.len() < params.min_ticks {
        out.insert(0, out[0].clone());
    }
    out
}

pub fn color_map(values: &[Option<f64>], params: &ColorParams) -> Result<ColorMapping, GmaeError> {
    let scale = color_bounds(values, params.p_lo, params.p_hi, params.epsilon)?;
    let colors = values.iter().map(|v| map_value(*v, &scale)).collect();
    let ticks = ticks(&scale, params);
    Ok(ColorMapping {
        scale,
        colors,
        ticks,
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage5_color.rs"]
mod tests;
