pub mod cache;
pub mod engine;
pub mod stage1_resolve;
pub mod stage2_load;
pub mod stage3_derive;
pub mod stage4_group;
pub mod stage5_color;
pub mod stage6_aggregate;
pub mod stage7_order;

pub use engine::Engine;

use crate::input::InputError;

pub const USER_FAILURE_NOTICE: &str = "Failed to produce plot. Please contact the maintainer.";

#[derive(Debug, thiserror::Error)]
pub enum GmaeError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("no data: {0}")]
    NoData(String),
    #[error("degenerate input: {0}")]
    DegenerateInput(String),
    #[error("invalid identifier for {field}: {value:?}")]
    InvalidIdentifier { field: &'static str, value: String },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("failed to aggregate: {0}")]
    FailedToAggregate(String),
    #[error(transparent)]
    Source(InputError),
}

impl From<InputError> for GmaeError {
    fn from(value: InputError) -> Self {
        match value {
            InputError::InvalidIdentifier { field, value } => {
                GmaeError::InvalidIdentifier { field, value }
            }
            other => GmaeError::Source(other),
        }
    }
}

impl GmaeError {
    /// Text shown to end users. Internal detail stays in the logs.
    pub fn user_message(&self) -> String {
        match self {
            GmaeError::NotFound(what) => format!("Not found: {what}"),
            GmaeError::NoData(_) => "No data for the selected genes and cells.".to_string(),
            GmaeError::InvalidRequest(msg) => format!("Invalid request: {msg}"),
            _ => USER_FAILURE_NOTICE.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/fixtures.rs"]
pub(crate) mod fixtures;
