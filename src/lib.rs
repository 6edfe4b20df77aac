pub mod input;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod stats;
pub mod tracing;

pub use pipeline::{Engine, GmaeError};
