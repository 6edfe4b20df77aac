pub mod gene;
pub mod grouping;
pub mod modality;
pub mod params;
pub mod table;

pub use gene::{GeneMatch, GeneRecord};
pub use grouping::GroupingScheme;
pub use modality::{Level, MetricKind, Modality};
pub use params::{EngineConfig, PlotRequest};
pub use table::{CellTable, Column};
