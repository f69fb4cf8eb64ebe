use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::processor::FlowFeatures;

/// Per-session aggregation knobs. Timeouts are in microseconds.
#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct FlowConfig {
    /// Gap above which the session is considered to have gone idle.
    pub activity_timeout: u64,
    /// Gap above which a new subflow is counted.
    pub sub_flow_timeout: u64,
    /// Payload sample matrix rows (packets captured per session).
    pub packet_num_max: usize,
    /// Payload sample matrix columns (bytes captured per packet).
    pub packet_len_max: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            activity_timeout: 5_000_000,
            sub_flow_timeout: 1_000_000,
            packet_num_max: 16,
            packet_len_max: 128,
        }
    }
}

/// Everything one finished capture produces: the feature row and the
/// fixed-shape payload sample matrix.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub features: FlowFeatures,
    pub payloads: Array2<u8>,
}
