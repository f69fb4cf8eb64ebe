use std::net::Ipv4Addr;

use ndarray::Array2;
use tracing::debug;

use crate::capture::{PacketRecord, IPPROTO_TCP};
use crate::types::FlowConfig;

use super::features::FlowFeatures;
use super::stats::{LenHistogram, SummaryStats};

/// Per-session aggregation state.
///
/// One instance per capture. The first packet fixes the session's endpoints,
/// and with them the direction of every later packet: forward means "same
/// source IP as the first packet". The instance exclusively owns all of its
/// accumulators, histograms and the payload buffer for the session lifetime.
#[derive(Debug, Clone)]
pub struct Flow {
    flow_id: String,
    src_ip: Ipv4Addr,
    src_port: u16,
    dst_ip: Ipv4Addr,
    dst_port: u16,
    protocol: u8,

    flow_start_ts: u64,
    flow_end_ts: u64,
    // Epoch-zero sentinels, not the first timestamp. The first sample of
    // each directional IAT series comes out as "time since zero" and is
    // removed by position at finalize.
    fwd_last_ts: u64,
    bwd_last_ts: u64,

    sub_flow_last_ts: u64,
    sub_flow_cnt: u64,
    start_active_ts: u64,
    end_active_ts: u64,

    flow_iat: SummaryStats,
    forward_iat: SummaryStats,
    backward_iat: SummaryStats,
    flow_active: SummaryStats,
    flow_idle: SummaryStats,

    fwd_head_stats: SummaryStats,
    bwd_head_stats: SummaryStats,
    fwd_pld_stats: SummaryStats,
    bwd_pld_stats: SummaryStats,
    flow_pld_stats: SummaryStats,
    fwd_len_dist: LenHistogram,
    bwd_len_dist: LenHistogram,

    fin_cnt: u64,
    syn_cnt: u64,
    rst_cnt: u64,
    psh_cnt: u64,
    ack_cnt: u64,
    urg_cnt: u64,
    ece_cnt: u64,
    cwr_cnt: u64,

    fwd_psh_cnt: u64,
    bwd_psh_cnt: u64,
    fwd_urg_cnt: u64,
    bwd_urg_cnt: u64,

    fwd_init_win_bytes: u32,
    bwd_init_win_bytes: u32,

    payloads: Vec<Vec<u8>>,
    cfg: FlowConfig,
}

impl Flow {
    /// Seed the session from its first packet. The packet itself still has
    /// to go through `add_packet` like every other one.
    pub fn new(first: &PacketRecord, cfg: FlowConfig) -> Self {
        let start_ts = first.timestamp;
        Self {
            flow_id: first.forward_flow_id(),
            src_ip: first.src_ip,
            src_port: first.src_port,
            dst_ip: first.dst_ip,
            dst_port: first.dst_port,
            protocol: first.protocol,
            flow_start_ts: start_ts,
            flow_end_ts: start_ts,
            fwd_last_ts: 0,
            bwd_last_ts: 0,
            sub_flow_last_ts: start_ts,
            sub_flow_cnt: 0,
            start_active_ts: start_ts,
            end_active_ts: start_ts,
            flow_iat: SummaryStats::new(),
            forward_iat: SummaryStats::new(),
            backward_iat: SummaryStats::new(),
            flow_active: SummaryStats::new(),
            flow_idle: SummaryStats::new(),
            fwd_head_stats: SummaryStats::new(),
            bwd_head_stats: SummaryStats::new(),
            fwd_pld_stats: SummaryStats::new(),
            bwd_pld_stats: SummaryStats::new(),
            flow_pld_stats: SummaryStats::new(),
            fwd_len_dist: LenHistogram::new(),
            bwd_len_dist: LenHistogram::new(),
            fin_cnt: 0,
            syn_cnt: 0,
            rst_cnt: 0,
            psh_cnt: 0,
            ack_cnt: 0,
            urg_cnt: 0,
            ece_cnt: 0,
            cwr_cnt: 0,
            fwd_psh_cnt: 0,
            bwd_psh_cnt: 0,
            fwd_urg_cnt: 0,
            bwd_urg_cnt: 0,
            fwd_init_win_bytes: 0,
            bwd_init_win_bytes: 0,
            payloads: Vec::new(),
            cfg,
        }
    }

    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }

    /// Fold one packet into the session, in arrival order. The session's
    /// first packet goes through here too.
    pub fn add_packet(&mut self, packet: &PacketRecord) {
        let current_ts = packet.timestamp;
        let pld_len = packet.payload_bytes();

        if packet.src_ip == self.src_ip {
            self.fwd_head_stats.add(packet.head_bytes as f64);
            self.fwd_len_dist.add(packet.ip_length);

            if self.protocol == IPPROTO_TCP {
                if let Some(tcp) = packet.tcp {
                    if tcp.flags & 0x08 != 0 {
                        self.fwd_psh_cnt += 1;
                    }
                    if tcp.flags & 0x20 != 0 {
                        self.fwd_urg_cnt += 1;
                    }
                    // Latched once, on the direction's first packet.
                    if self.fwd_head_stats.n() == 1 {
                        self.fwd_init_win_bytes = tcp.window as u32;
                    }
                }
            }

            if pld_len > 0 {
                self.fwd_pld_stats.add(pld_len as f64);
            }

            self.forward_iat
                .add(current_ts.saturating_sub(self.fwd_last_ts) as f64 / 1_000.0);
            self.fwd_last_ts = current_ts;
        } else if packet.src_ip == self.dst_ip {
            self.bwd_head_stats.add(packet.head_bytes as f64);
            self.bwd_len_dist.add(packet.ip_length);

            if self.protocol == IPPROTO_TCP {
                if let Some(tcp) = packet.tcp {
                    if tcp.flags & 0x08 != 0 {
                        self.bwd_psh_cnt += 1;
                    }
                    if tcp.flags & 0x20 != 0 {
                        self.bwd_urg_cnt += 1;
                    }
                    if self.bwd_head_stats.n() == 1 {
                        self.bwd_init_win_bytes = tcp.window as u32;
                    }
                }
            }

            if pld_len > 0 {
                self.bwd_pld_stats.add(pld_len as f64);
            }

            self.backward_iat
                .add(current_ts.saturating_sub(self.bwd_last_ts) as f64 / 1_000.0);
            self.bwd_last_ts = current_ts;
        }

        self.flow_iat
            .add(current_ts.saturating_sub(self.flow_end_ts) as f64 / 1_000.0);

        if pld_len > 0 {
            self.flow_pld_stats.add(pld_len as f64);
        }

        if self.payloads.len() < self.cfg.packet_num_max {
            self.payloads
                .push(packet.payload_snapshot(self.cfg.packet_len_max));
        }

        self.flow_end_ts = current_ts;

        if self.protocol == IPPROTO_TCP {
            if let Some(tcp) = packet.tcp {
                self.update_flags(tcp.flags);
            }
        }

        self.update_subflows(current_ts);
        self.update_active_idle(current_ts);
    }

    fn update_flags(&mut self, flags: u8) {
        if flags & 0x01 != 0 {
            self.fin_cnt += 1;
        }
        if flags & 0x02 != 0 {
            self.syn_cnt += 1;
        }
        if flags & 0x04 != 0 {
            self.rst_cnt += 1;
        }
        if flags & 0x08 != 0 {
            self.psh_cnt += 1;
        }
        if flags & 0x10 != 0 {
            self.ack_cnt += 1;
        }
        if flags & 0x20 != 0 {
            self.urg_cnt += 1;
        }
        if flags & 0x40 != 0 {
            self.ece_cnt += 1;
        }
        if flags & 0x80 != 0 {
            self.cwr_cnt += 1;
        }
    }

    fn update_subflows(&mut self, current_ts: u64) {
        let idle = current_ts.saturating_sub(self.sub_flow_last_ts);
        if idle > self.cfg.sub_flow_timeout {
            self.sub_flow_cnt += 1;
        }
        self.sub_flow_last_ts = current_ts;
    }

    fn update_active_idle(&mut self, current_ts: u64) {
        let idle = current_ts.saturating_sub(self.end_active_ts);
        if idle > self.cfg.activity_timeout {
            self.flow_idle.add(idle as f64 / 1_000.0);

            // An active interval needs more than one packet to have width.
            let active = self.end_active_ts.saturating_sub(self.start_active_ts);
            if active > 0 {
                self.flow_active.add(active as f64 / 1_000.0);
            }

            self.start_active_ts = current_ts;
        }
        self.end_active_ts = current_ts;
    }

    /// Close the session after the last packet: flush the still-open active
    /// interval. There is no matching idle flush at end of stream.
    pub fn end_session(&mut self) {
        let active = self.end_active_ts.saturating_sub(self.start_active_ts);
        if active > 0 {
            self.flow_active.add(active as f64 / 1_000.0);
        }
    }

    /// Assemble the feature vector. Returns `None` for a degenerate
    /// single-instant session (every packet shared one timestamp); the
    /// caller must skip emission rather than treat that as an error.
    ///
    /// Consumes the IAT accumulators' position-0 sentinel samples, so call
    /// at most once.
    pub fn features(&mut self) -> Option<FlowFeatures> {
        if self.flow_end_ts == self.flow_start_ts {
            debug!(flow_id = %self.flow_id, "zero-duration session, no feature row");
            return None;
        }

        let mut f = FlowFeatures::default();
        f.src_port = self.src_port;
        f.dst_port = self.dst_port;
        f.protocol = self.protocol;
        f.flow_duration = (self.flow_end_ts - self.flow_start_ts) as f64 / 1_000_000.0;

        f.fwd_pkt_num = self.fwd_head_stats.n() as u64;
        f.fwd_head_byte_mean = self.fwd_head_stats.mean();
        f.fwd_head_byte_std = self.fwd_head_stats.std();
        f.bwd_pkt_num = self.bwd_head_stats.n() as u64;
        f.bwd_head_byte_mean = self.bwd_head_stats.mean();
        f.bwd_head_byte_std = self.bwd_head_stats.std();

        f.flow_pkt_num_with_pld = self.flow_pld_stats.n() as u64;
        f.flow_pld_byte_sum = self.flow_pld_stats.sum();
        f.flow_pld_byte_max = self.flow_pld_stats.max();
        f.flow_pld_byte_min = self.flow_pld_stats.min();
        f.flow_pld_byte_mean = self.flow_pld_stats.mean();
        f.flow_pld_byte_std = self.flow_pld_stats.std();

        f.fwd_pkt_num_with_pld = self.fwd_pld_stats.n() as u64;
        f.fwd_pld_byte_sum = self.fwd_pld_stats.sum();
        f.fwd_pld_byte_max = self.fwd_pld_stats.max();
        f.fwd_pld_byte_min = self.fwd_pld_stats.min();
        f.fwd_pld_byte_mean = self.fwd_pld_stats.mean();
        f.fwd_pld_byte_std = self.fwd_pld_stats.std();

        f.bwd_pkt_num_with_pld = self.bwd_pld_stats.n() as u64;
        f.bwd_pld_byte_sum = self.bwd_pld_stats.sum();
        f.bwd_pld_byte_max = self.bwd_pld_stats.max();
        f.bwd_pld_byte_min = self.bwd_pld_stats.min();
        f.bwd_pld_byte_mean = self.bwd_pld_stats.mean();
        f.bwd_pld_byte_std = self.bwd_pld_stats.std();

        f.cal_rate();

        // Discard each series' position-0 sample: it measured the distance
        // from the epoch-zero sentinel (or the flow start), not a real gap.
        self.flow_iat.remove(0);
        f.flow_iat_max = self.flow_iat.max();
        f.flow_iat_min = self.flow_iat.min();
        f.flow_iat_mean = self.flow_iat.mean();
        f.flow_iat_std = self.flow_iat.std();

        self.forward_iat.remove(0);
        f.fwd_iat_max = self.forward_iat.max();
        f.fwd_iat_min = self.forward_iat.min();
        f.fwd_iat_mean = self.forward_iat.mean();
        f.fwd_iat_std = self.forward_iat.std();

        self.backward_iat.remove(0);
        f.bwd_iat_max = self.backward_iat.max();
        f.bwd_iat_min = self.backward_iat.min();
        f.bwd_iat_mean = self.backward_iat.mean();
        f.bwd_iat_std = self.backward_iat.std();

        f.fin_cnt = self.fin_cnt;
        f.syn_cnt = self.syn_cnt;
        f.rst_cnt = self.rst_cnt;
        f.psh_cnt = self.psh_cnt;
        f.ack_cnt = self.ack_cnt;
        f.urg_cnt = self.urg_cnt;
        f.ece_cnt = self.ece_cnt;
        f.cwr_cnt = self.cwr_cnt;

        f.fwd_psh_cnt = self.fwd_psh_cnt;
        f.bwd_psh_cnt = self.bwd_psh_cnt;
        f.fwd_urg_cnt = self.fwd_urg_cnt;
        f.bwd_urg_cnt = self.bwd_urg_cnt;

        f.fwd_init_win_bytes = self.fwd_init_win_bytes;
        f.bwd_init_win_bytes = self.bwd_init_win_bytes;

        f.cal_sub_flow(self.sub_flow_cnt);

        f.flow_act_num = self.flow_active.n() as u64;
        f.flow_act_sum = self.flow_active.sum();
        f.flow_act_max = self.flow_active.max();
        f.flow_act_min = self.flow_active.min();
        f.flow_act_mean = self.flow_active.mean();
        f.flow_act_std = self.flow_active.std();

        f.flow_idle_num = self.flow_idle.n() as u64;
        f.flow_idle_sum = self.flow_idle.sum();
        f.flow_idle_max = self.flow_idle.max();
        f.flow_idle_min = self.flow_idle.min();
        f.flow_idle_mean = self.flow_idle.mean();
        f.flow_idle_std = self.flow_idle.std();

        f.fwd_len_dist = self.fwd_len_dist.counts().to_vec();
        f.bwd_len_dist = self.bwd_len_dist.counts().to_vec();

        Some(f)
    }

    /// Fixed-shape payload sample matrix: exactly `packet_num_max` rows of
    /// `packet_len_max` bytes, missing rows all zero.
    pub fn payload_matrix(&self) -> Array2<u8> {
        let mut matrix = Array2::zeros((self.cfg.packet_num_max, self.cfg.packet_len_max));
        for (i, payload) in self.payloads.iter().enumerate() {
            for (j, byte) in payload.iter().enumerate() {
                matrix[[i, j]] = *byte;
            }
        }
        matrix
    }
}
