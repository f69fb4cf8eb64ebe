//! Session-level flow feature extraction from pcap captures.
//!
//! Each capture is assumed to hold the packets of exactly one session. The
//! pipeline reads raw frames out of the capture container, decodes
//! Ethernet/IPv4/(TCP|UDP) headers into packet records, folds them into a
//! [`Flow`] aggregator, and finally flattens the session into a fixed-schema
//! numeric row plus a fixed-shape payload sample matrix.
//!
//! ```no_run
//! use flowvec::{process_capture, FlowConfig};
//!
//! let data = std::fs::read("session.pcap").unwrap();
//! if let Some(record) = process_capture(&data, &FlowConfig::default()).unwrap() {
//!     let row = record.features.to_row();
//!     assert_eq!(record.payloads.dim(), (16, 128));
//!     assert_eq!(row.len(), 378);
//! }
//! ```

pub mod capture;
pub mod processor;
pub mod types;

pub use capture::{decode_frame, CaptureReader, PacketRecord, TcpMeta, IPPROTO_TCP, IPPROTO_UDP};
pub use processor::{
    feature_names, process_capture, process_captures, Flow, FlowFeatures, LenHistogram,
    SummaryStats, LEN_BUCKETS,
};
pub use types::{FlowConfig, SessionRecord};
