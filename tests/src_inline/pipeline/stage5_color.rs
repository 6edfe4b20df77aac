use super::*;

fn params(p_lo: f64, p_hi: f64) -> ColorParams {
    ColorParams {
        p_lo,
        p_hi,
        epsilon: 0.01,
        tick_count: 5,
        decimals: 2,
        normalized: false,
        min_ticks: 0,
    }
}

#[test]
fn test_bounds_from_percentiles_and_clamping() {
    let values = [Some(0.1), Some(0.2), Some(0.9), Some(0.95)];
    let out = color_map(&values, &params(0.05, 0.95)).unwrap();
    assert!((out.scale.lower_bound - 0.115).abs() < 1e-12);
    assert!((out.scale.upper_bound - 0.9425).abs() < 1e-12);
    assert_eq!(out.colors[0], MappedColor::Value(out.scale.lower_bound));
    assert_eq!(out.colors[2], MappedColor::Value(0.9));
    assert_eq!(out.colors[3], MappedColor::Value(out.scale.upper_bound));
}

#[test]
fn test_identical_values_get_epsilon_scale() {
    let values = [Some(0.5); 6];
    let scale = color_bounds(&values, 0.1, 0.9, 0.01).unwrap();
    assert!(scale.upper_bound > scale.lower_bound);
    assert!((scale.upper_bound - 0.51).abs() < 1e-12);
    for c in color_map(&values, &params(0.1, 0.9)).unwrap().colors {
        assert_eq!(c, MappedColor::Value(0.5));
    }
}

#[test]
fn test_missing_values_map_to_sentinel() {
    let values = [None, Some(0.0), Some(f64::NAN), Some(1.0)];
    let out = color_map(&values, &params(0.0, 1.0)).unwrap();
    assert_eq!(out.colors[0], MappedColor::Missing(MISSING_COLOR));
    assert_eq!(out.colors[2], MappedColor::Missing(MISSING_COLOR));
    assert_eq!(
        serde_json::to_string(&out.colors).unwrap(),
        r#"["grey",0.0,"grey",1.0]"#
    );
    assert!(matches!(
        color_bounds(&[None, None], 0.1, 0.9, 0.01),
        Err(GmaeError::DegenerateInput(_))
    ));
}

#[test]
fn test_tick_labels() {
    let scale = ColorScale {
        lower_bound: 0.001,
        upper_bound: 0.8,
    };
    let t = ticks(&scale, &params(0.0, 1.0));
    let labels: Vec<&str> = t.iter().map(|t| t.label.as_str()).collect();
    assert_eq!(labels, vec!["<0", "0.2", "0.4", "0.6", ">0.8"]);
    assert_eq!(t[4].value, 0.8);

    let mut p = params(0.0, 1.0);
    p.normalized = true;
    assert_eq!(ticks(&scale, &p)[0].label, "0");
}

#[test]
fn test_ticks_padded_to_series_count() {
    let scale = ColorScale {
        lower_bound: 1.0,
        upper_bound: 2.0,
    };
    let mut p = params(0.0, 1.0);
    p.min_ticks = 8;
    let t = ticks(&scale, &p);
    assert_eq!(t.len(), 8);
    assert!(t[..4].iter().all(|x| x == &t[3]));
    assert_eq!(t[3].label, "<1");
}
