use super::*;

#[test]
fn test_quantile_interpolates_between_ranks() {
    let v = [0.1, 0.2, 0.9, 0.95];
    let lo = quantile(&v, 0.05).unwrap();
    let hi = quantile(&v, 0.95).unwrap();
    assert!((lo - 0.115).abs() < 1e-12);
    assert!((hi - 0.9425).abs() < 1e-12);
}

#[test]
fn test_quantile_endpoints_and_empty() {
    let v = [3.0, 1.0, 2.0];
    assert_eq!(quantile(&v, 0.0), Some(1.0));
    assert_eq!(quantile(&v, 1.0), Some(3.0));
    assert_eq!(quantile(&[], 0.5), None);
}

#[test]
fn test_median_even_and_odd() {
    assert_eq!(median(&[1.0, 2.0, 3.0, 4.0, 5.0]), Some(3.0));
    assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
}

#[test]
fn test_missing_values_are_skipped() {
    let col = [Some(1.0), None, Some(f64::NAN), Some(3.0)];
    let p = present(&col);
    assert_eq!(p, vec![1.0, 3.0]);
    assert_eq!(mean(&p), Some(2.0));
    assert_eq!(mean(&[]), None);
    assert_eq!(min_max(&[f64::NAN, 2.0, -1.0]), Some((-1.0, 2.0)));
}

#[test]
fn test_round_to_drops_negative_zero() {
    assert_eq!(round_to(0.12345, 2), 0.12);
    assert_eq!(round_to(-0.001, 2).to_string(), "0");
}
