use std::net::Ipv4Addr;

pub const IPPROTO_TCP: u8 = 6;
pub const IPPROTO_UDP: u8 = 17;

const ETH_HEADER_LEN: usize = 14;
const ETHERTYPE_IPV4: [u8; 2] = [0x08, 0x00];
const IPV4_MIN_HEADER_LEN: usize = 20;
const TCP_MIN_HEADER_LEN: usize = 20;
const UDP_HEADER_LEN: usize = 8;

/// TCP-only header state; absent on UDP records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpMeta {
    pub flags: u8,
    pub sequence: u32,
    pub acknowledgment: u32,
    pub window: u16,
}

/// One decoded packet, immutable once built.
#[derive(Debug, Clone)]
pub struct PacketRecord {
    pub id: u64,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
    pub protocol: u8,
    /// Absolute capture timestamp in microseconds.
    pub timestamp: u64,
    /// IP total length as claimed by the IP header.
    pub ip_length: u16,
    /// Transport header length (UDP is a fixed 8).
    pub head_bytes: u32,
    pub payload: Vec<u8>,
    pub tcp: Option<TcpMeta>,
}

impl PacketRecord {
    pub fn payload_bytes(&self) -> usize {
        self.payload.len()
    }

    /// Session key in this packet's own tuple order.
    pub fn forward_flow_id(&self) -> String {
        format!(
            "{}-{}-{}-{}-{}",
            self.src_ip, self.src_port, self.dst_ip, self.dst_port, self.protocol
        )
    }

    /// Session key with the endpoints swapped.
    pub fn backward_flow_id(&self) -> String {
        format!(
            "{}-{}-{}-{}-{}",
            self.dst_ip, self.dst_port, self.src_ip, self.src_port, self.protocol
        )
    }

    /// Payload truncated or zero-padded to exactly `len` bytes.
    pub fn payload_snapshot(&self, len: usize) -> Vec<u8> {
        let mut snapshot = vec![0u8; len];
        let take = self.payload.len().min(len);
        snapshot[..take].copy_from_slice(&self.payload[..take]);
        snapshot
    }
}

fn read_u16(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Decode one Ethernet frame into a packet record.
///
/// Anything that is not IPv4-over-Ethernet carrying TCP or UDP, or that is
/// shorter than its own headers claim, yields `None`. The caller skips the
/// frame and keeps reading; a reject never aborts the capture.
pub fn decode_frame(id: u64, timestamp: u64, frame: &[u8]) -> Option<PacketRecord> {
    // Enough for the Ethernet header plus a minimal IPv4 header.
    if frame.len() < ETH_HEADER_LEN + IPV4_MIN_HEADER_LEN {
        return None;
    }
    if frame[12..14] != ETHERTYPE_IPV4 {
        return None;
    }

    let ip_head_len = ((frame[14] & 0x0F) as usize) * 4;
    let ip_length = read_u16(&frame[16..18]);
    let protocol = frame[23];
    if protocol != IPPROTO_TCP && protocol != IPPROTO_UDP {
        return None;
    }
    let src_ip = Ipv4Addr::new(frame[26], frame[27], frame[28], frame[29]);
    let dst_ip = Ipv4Addr::new(frame[30], frame[31], frame[32], frame[33]);

    let segment_start = ETH_HEADER_LEN + ip_head_len;
    let segment_end = ETH_HEADER_LEN + ip_length as usize;
    if segment_start > segment_end || segment_end > frame.len() {
        return None;
    }
    let segment = &frame[segment_start..segment_end];

    if protocol == IPPROTO_TCP {
        if segment.len() < TCP_MIN_HEADER_LEN {
            return None;
        }
        let tcp_head_len = (((segment[12] & 0xF0) >> 4) as usize) * 4;
        let payload = segment.get(tcp_head_len..).unwrap_or_default().to_vec();

        Some(PacketRecord {
            id,
            src_ip,
            dst_ip,
            src_port: read_u16(&segment[0..2]),
            dst_port: read_u16(&segment[2..4]),
            protocol,
            timestamp,
            ip_length,
            head_bytes: tcp_head_len as u32,
            payload,
            tcp: Some(TcpMeta {
                flags: segment[13],
                sequence: read_u32(&segment[4..8]),
                acknowledgment: read_u32(&segment[8..12]),
                window: read_u16(&segment[14..16]),
            }),
        })
    } else {
        if segment.len() < UDP_HEADER_LEN {
            return None;
        }

        Some(PacketRecord {
            id,
            src_ip,
            dst_ip,
            src_port: read_u16(&segment[0..2]),
            dst_port: read_u16(&segment[2..4]),
            protocol,
            timestamp,
            ip_length,
            head_bytes: UDP_HEADER_LEN as u32,
            payload: segment[UDP_HEADER_LEN..].to_vec(),
            tcp: None,
        })
    }
}
