use anyhow::{bail, Result};
use tracing::trace;

const GLOBAL_HEADER_LEN: usize = 24;
const RECORD_HEADER_LEN: usize = 16;

const MAGIC_BIG_ENDIAN: u32 = 0xA1B2_C3D4;
const MAGIC_LITTLE_ENDIAN: u32 = 0xD4C3_B2A1;
const LINKTYPE_ETHERNET: u32 = 1;

/// Byte order of the capture's global and record headers, selected by the
/// magic number. Frame contents are always network byte order regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderOrder {
    Big,
    Little,
}

impl HeaderOrder {
    fn read_u32(self, bytes: &[u8]) -> u32 {
        let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
        match self {
            HeaderOrder::Big => u32::from_be_bytes(raw),
            HeaderOrder::Little => u32::from_le_bytes(raw),
        }
    }
}

/// Sequential reader over one in-memory capture file.
///
/// Validates the 24-byte global header up front, then yields
/// `(timestamp_us, frame)` pairs until the buffer is exhausted. The only
/// state carried between calls is the read cursor.
pub struct CaptureReader<'a> {
    data: &'a [u8],
    pos: usize,
    order: HeaderOrder,
}

impl<'a> CaptureReader<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.len() < GLOBAL_HEADER_LEN {
            bail!(
                "capture is {} bytes, shorter than the {GLOBAL_HEADER_LEN}-byte global header",
                data.len()
            );
        }

        let magic = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        let order = match magic {
            MAGIC_BIG_ENDIAN => HeaderOrder::Big,
            MAGIC_LITTLE_ENDIAN => HeaderOrder::Little,
            other => bail!("bad capture magic {other:#010x}, not a pcap file"),
        };

        let link_type = order.read_u32(&data[20..24]);
        if link_type != LINKTYPE_ETHERNET {
            bail!("unsupported link type {link_type}, only Ethernet (1) is handled");
        }

        Ok(Self {
            data,
            pos: GLOBAL_HEADER_LEN,
            order,
        })
    }

    /// Next raw frame with its absolute timestamp in microseconds.
    ///
    /// A truncated trailing record header ends iteration; a frame whose
    /// captured length overruns the buffer is clamped to what is there.
    pub fn next_frame(&mut self) -> Option<(u64, &'a [u8])> {
        if self.pos + RECORD_HEADER_LEN > self.data.len() {
            return None;
        }

        let header = &self.data[self.pos..self.pos + RECORD_HEADER_LEN];
        let secs = self.order.read_u32(&header[0..4]) as u64;
        let micros = self.order.read_u32(&header[4..8]) as u64;
        let captured_len = self.order.read_u32(&header[8..12]) as usize;

        let start = self.pos + RECORD_HEADER_LEN;
        let end = (start + captured_len).min(self.data.len());
        self.pos = start + captured_len;

        let timestamp = secs * 1_000_000 + micros;
        trace!(timestamp, len = end - start, "frame");
        Some((timestamp, &self.data[start..end]))
    }
}

impl<'a> Iterator for CaptureReader<'a> {
    type Item = (u64, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global_header(magic: [u8; 4], link_type_bytes: [u8; 4]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&magic);
        buf.extend_from_slice(&[0u8; 16]); // version, zone, sigfigs, snaplen
        buf.extend_from_slice(&link_type_bytes);
        buf
    }

    fn be_record(secs: u32, micros: u32, frame: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&secs.to_be_bytes());
        buf.extend_from_slice(&micros.to_be_bytes());
        buf.extend_from_slice(&(frame.len() as u32).to_be_bytes());
        buf.extend_from_slice(&(frame.len() as u32).to_be_bytes());
        buf.extend_from_slice(frame);
        buf
    }

    #[test]
    fn reads_big_endian_capture() {
        let mut data = global_header([0xA1, 0xB2, 0xC3, 0xD4], [0, 0, 0, 1]);
        data.extend(be_record(3, 250, b"abc"));
        data.extend(be_record(4, 0, b"defg"));

        let mut reader = CaptureReader::new(&data).unwrap();
        assert_eq!(reader.next_frame(), Some((3_000_250, &b"abc"[..])));
        assert_eq!(reader.next_frame(), Some((4_000_000, &b"defg"[..])));
        assert_eq!(reader.next_frame(), None);
    }

    #[test]
    fn reads_little_endian_capture() {
        let mut data = global_header([0xD4, 0xC3, 0xB2, 0xA1], [1, 0, 0, 0]);
        let frame = b"xy";
        data.extend_from_slice(&7u32.to_le_bytes());
        data.extend_from_slice(&9u32.to_le_bytes());
        data.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        data.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        data.extend_from_slice(frame);

        let frames: Vec<_> = CaptureReader::new(&data).unwrap().collect();
        assert_eq!(frames, vec![(7_000_009, &b"xy"[..])]);
    }

    #[test]
    fn rejects_short_capture() {
        assert!(CaptureReader::new(&[0u8; 23]).is_err());
    }

    #[test]
    fn rejects_bad_magic() {
        let data = global_header([0xDE, 0xAD, 0xBE, 0xEF], [0, 0, 0, 1]);
        assert!(CaptureReader::new(&data).is_err());
    }

    #[test]
    fn rejects_non_ethernet_link_type() {
        let data = global_header([0xA1, 0xB2, 0xC3, 0xD4], [0, 0, 0, 101]);
        assert!(CaptureReader::new(&data).is_err());
    }

    #[test]
    fn truncated_trailing_record_ends_iteration() {
        let mut data = global_header([0xA1, 0xB2, 0xC3, 0xD4], [0, 0, 0, 1]);
        data.extend(be_record(1, 0, b"ok"));
        data.extend_from_slice(&[0u8; 10]); // partial record header

        let frames: Vec<_> = CaptureReader::new(&data).unwrap().collect();
        assert_eq!(frames, vec![(1_000_000, &b"ok"[..])]);
    }

    #[test]
    fn overrunning_frame_is_clamped() {
        let mut data = global_header([0xA1, 0xB2, 0xC3, 0xD4], [0, 0, 0, 1]);
        data.extend_from_slice(&2u32.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(&100u32.to_be_bytes()); // claims 100 bytes
        data.extend_from_slice(&100u32.to_be_bytes());
        data.extend_from_slice(b"short");

        let frames: Vec<_> = CaptureReader::new(&data).unwrap().collect();
        assert_eq!(frames, vec![(2_000_000, &b"short"[..])]);
    }
}
