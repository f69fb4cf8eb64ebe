mod engine;
mod features;
mod flow;
mod stats;

pub use engine::{process_capture, process_captures};
pub use features::{feature_names, FlowFeatures};
pub use flow::Flow;
pub use stats::{LenHistogram, SummaryStats, LEN_BUCKETS};
