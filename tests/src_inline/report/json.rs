use super::*;
use crate::pipeline::stage5_color::ColorScale;

#[test]
fn test_render_json_is_pretty_and_parses_back() {
    let scale = ColorScale {
        lower_bound: 0.1,
        upper_bound: 0.9,
    };
    let out = render_json(&scale).unwrap();
    assert!(out.contains('\n'));
    let back: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(back["upper_bound"], 0.9);

    let mut buf = Vec::new();
    write_json(&mut buf, &scale).unwrap();
    assert_eq!(String::from_utf8(buf).unwrap(), out);
}
