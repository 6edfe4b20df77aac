use std::io::Write;

use serde::Serialize;

pub fn render_json<T: Serialize>(payload: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(payload)
}

pub fn write_json<T: Serialize, W: Write>(out: W, payload: &T) -> Result<(), serde_json::Error> {
    serde_json::to_writer_pretty(out, payload)
}

#[cfg(test)]
#[path = "../../tests/src_inline/report/json.rs"]
mod tests;
