mod decoder;
mod reader;

pub use decoder::{decode_frame, PacketRecord, TcpMeta, IPPROTO_TCP, IPPROTO_UDP};
pub use reader::CaptureReader;
