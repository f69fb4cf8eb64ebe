use serde::Serialize;

use super::stats::LEN_BUCKETS;

/// Column names for the scalar features, in emission order.
const SCALAR_COLUMNS: [&str; 78] = [
    "Src Port",
    "Dst Port",
    "Protocol",
    "Flow Duration(s)",
    "Fwd Pkt Num",
    "Fwd Head Byte Mean",
    "Fwd Head Byte Std",
    "Bwd Pkt Num",
    "Bwd Head Byte Mean",
    "Bwd Head Byte Std",
    "Flow Pkt Num With Pld",
    "Flow Pld Byte Sum",
    "Flow Pld Byte Max",
    "Flow Pld Byte Min",
    "Flow Pld Byte Mean",
    "Flow Pld Byte Std",
    "Fwd Pkt Num With Pld",
    "Fwd Pld Byte Sum",
    "Fwd Pld Byte Max",
    "Fwd Pld Byte Min",
    "Fwd Pld Byte Mean",
    "Fwd Pld Byte Std",
    "Bwd Pkt Num With Pld",
    "Bwd Pld Byte Sum",
    "Bwd Pld Byte Max",
    "Bwd Pld Byte Min",
    "Bwd Pld Byte Mean",
    "Bwd Pld Byte Std",
    "Flow Pkts/s",
    "Flow Pld Bytes/s",
    "Fwd Pkts/s",
    "Fwd Pld Bytes/s",
    "Bwd Pkts/s",
    "Bwd Pld Bytes/s",
    "Pkts Ratio",
    "Bytes Ratio",
    "Flow IAT Max",
    "Flow IAT Min",
    "Flow IAT Mean",
    "Flow IAT Std",
    "Fwd IAT Max",
    "Fwd IAT Min",
    "Fwd IAT Mean",
    "Fwd IAT Std",
    "Bwd IAT Max",
    "Bwd IAT Min",
    "Bwd IAT Mean",
    "Bwd IAT Std",
    "FIN Count",
    "SYN Count",
    "RST Count",
    "PSH Count",
    "ACK Count",
    "URG Count",
    "ECE Count",
    "CWR Count",
    "Fwd PSH Count",
    "Bwd PSH Count",
    "Fwd URG Count",
    "Bwd URG Count",
    "Fwd Init Win Bytes",
    "Bwd Init Win Bytes",
    "Sub Flow Fwd Pkts",
    "Sub Flow Fwd Bytes",
    "Sub Flow Bwd Pkts",
    "Sub Flow Bwd Bytes",
    "Flow Act Num",
    "Flow Act Sum",
    "Flow Act Max",
    "Flow Act Min",
    "Flow Act Mean",
    "Flow Act Std",
    "Flow Idle Num",
    "Flow Idle Sum",
    "Flow Idle Max",
    "Flow Idle Min",
    "Flow Idle Mean",
    "Flow Idle Std",
];

/// Ordered column schema consumed by an external writer: the scalar columns,
/// both 150-bucket length distributions, then the externally supplied label.
/// Process-wide constant data, not session state.
pub fn feature_names() -> Vec<String> {
    let mut names: Vec<String> = SCALAR_COLUMNS.iter().map(|s| s.to_string()).collect();
    for i in 0..LEN_BUCKETS {
        names.push(format!("FwdIPlen{i}"));
    }
    for i in 0..LEN_BUCKETS {
        names.push(format!("BwdIPlen{i}"));
    }
    names.push("Label".to_string());
    names
}

/// One finished session, ready to be flattened into the fixed column schema.
///
/// Field order matches `SCALAR_COLUMNS`; `to_row` relies on it. IAT, active
/// and idle figures are in milliseconds, duration in seconds.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FlowFeatures {
    pub src_port: u16,
    pub dst_port: u16,
    pub protocol: u8,
    pub flow_duration: f64,

    pub fwd_pkt_num: u64,
    pub fwd_head_byte_mean: f64,
    pub fwd_head_byte_std: f64,
    pub bwd_pkt_num: u64,
    pub bwd_head_byte_mean: f64,
    pub bwd_head_byte_std: f64,

    pub flow_pkt_num_with_pld: u64,
    pub flow_pld_byte_sum: f64,
    pub flow_pld_byte_max: f64,
    pub flow_pld_byte_min: f64,
    pub flow_pld_byte_mean: f64,
    pub flow_pld_byte_std: f64,

    pub fwd_pkt_num_with_pld: u64,
    pub fwd_pld_byte_sum: f64,
    pub fwd_pld_byte_max: f64,
    pub fwd_pld_byte_min: f64,
    pub fwd_pld_byte_mean: f64,
    pub fwd_pld_byte_std: f64,

    pub bwd_pkt_num_with_pld: u64,
    pub bwd_pld_byte_sum: f64,
    pub bwd_pld_byte_max: f64,
    pub bwd_pld_byte_min: f64,
    pub bwd_pld_byte_mean: f64,
    pub bwd_pld_byte_std: f64,

    pub flow_pkts_s: f64,
    pub flow_pld_bytes_s: f64,
    pub fwd_pkts_s: f64,
    pub fwd_pld_bytes_s: f64,
    pub bwd_pkts_s: f64,
    pub bwd_pld_bytes_s: f64,
    pub pkts_ratio: f64,
    pub bytes_ratio: f64,

    pub flow_iat_max: f64,
    pub flow_iat_min: f64,
    pub flow_iat_mean: f64,
    pub flow_iat_std: f64,
    pub fwd_iat_max: f64,
    pub fwd_iat_min: f64,
    pub fwd_iat_mean: f64,
    pub fwd_iat_std: f64,
    pub bwd_iat_max: f64,
    pub bwd_iat_min: f64,
    pub bwd_iat_mean: f64,
    pub bwd_iat_std: f64,

    pub fin_cnt: u64,
    pub syn_cnt: u64,
    pub rst_cnt: u64,
    pub psh_cnt: u64,
    pub ack_cnt: u64,
    pub urg_cnt: u64,
    pub ece_cnt: u64,
    pub cwr_cnt: u64,

    pub fwd_psh_cnt: u64,
    pub bwd_psh_cnt: u64,
    pub fwd_urg_cnt: u64,
    pub bwd_urg_cnt: u64,

    pub fwd_init_win_bytes: u32,
    pub bwd_init_win_bytes: u32,

    pub sub_flow_fwd_pkts: f64,
    pub sub_flow_fwd_pld_bytes: f64,
    pub sub_flow_bwd_pkts: f64,
    pub sub_flow_bwd_pld_bytes: f64,

    pub flow_act_num: u64,
    pub flow_act_sum: f64,
    pub flow_act_max: f64,
    pub flow_act_min: f64,
    pub flow_act_mean: f64,
    pub flow_act_std: f64,

    pub flow_idle_num: u64,
    pub flow_idle_sum: f64,
    pub flow_idle_max: f64,
    pub flow_idle_min: f64,
    pub flow_idle_mean: f64,
    pub flow_idle_std: f64,

    pub fwd_len_dist: Vec<u64>,
    pub bwd_len_dist: Vec<u64>,
}

impl FlowFeatures {
    /// Rate features. Call once the counts, sums and duration are in place;
    /// the ratios use Laplace smoothing so one-directional sessions do not
    /// divide by zero.
    pub(crate) fn cal_rate(&mut self) {
        self.fwd_pkts_s = self.fwd_pkt_num as f64 / self.flow_duration;
        self.fwd_pld_bytes_s = self.fwd_pld_byte_sum / self.flow_duration;
        self.bwd_pkts_s = self.bwd_pkt_num as f64 / self.flow_duration;
        self.bwd_pld_bytes_s = self.bwd_pld_byte_sum / self.flow_duration;
        self.flow_pkts_s = self.fwd_pkts_s + self.bwd_pkts_s;
        self.flow_pld_bytes_s = self.fwd_pld_bytes_s + self.bwd_pld_bytes_s;

        self.pkts_ratio = (self.bwd_pkt_num as f64 + 1.0) / (self.fwd_pkt_num as f64 + 1.0);
        self.bytes_ratio = (self.bwd_pld_byte_sum + 1.0) / (self.fwd_pld_byte_sum + 1.0);
    }

    /// Subflow-normalized features; zero defaults stand when the session
    /// never crossed the subflow timeout.
    pub(crate) fn cal_sub_flow(&mut self, sub_flow_cnt: u64) {
        if sub_flow_cnt > 0 {
            let n = sub_flow_cnt as f64;
            self.sub_flow_fwd_pkts = self.fwd_pkt_num as f64 / n;
            self.sub_flow_fwd_pld_bytes = self.fwd_pld_byte_sum / n;
            self.sub_flow_bwd_pkts = self.bwd_pkt_num as f64 / n;
            self.sub_flow_bwd_pld_bytes = self.bwd_pld_byte_sum / n;
        }
    }

    /// Flatten into the fixed column order: 78 scalars, then the forward and
    /// backward length distributions (378 values; the label column is
    /// appended by the writer).
    pub fn to_row(&self) -> Vec<f64> {
        let mut row = Vec::with_capacity(SCALAR_COLUMNS.len() + 2 * LEN_BUCKETS);
        row.push(self.src_port as f64);
        row.push(self.dst_port as f64);
        row.push(self.protocol as f64);
        row.push(self.flow_duration);

        row.push(self.fwd_pkt_num as f64);
        row.push(self.fwd_head_byte_mean);
        row.push(self.fwd_head_byte_std);
        row.push(self.bwd_pkt_num as f64);
        row.push(self.bwd_head_byte_mean);
        row.push(self.bwd_head_byte_std);

        row.push(self.flow_pkt_num_with_pld as f64);
        row.push(self.flow_pld_byte_sum);
        row.push(self.flow_pld_byte_max);
        row.push(self.flow_pld_byte_min);
        row.push(self.flow_pld_byte_mean);
        row.push(self.flow_pld_byte_std);

        row.push(self.fwd_pkt_num_with_pld as f64);
        row.push(self.fwd_pld_byte_sum);
        row.push(self.fwd_pld_byte_max);
        row.push(self.fwd_pld_byte_min);
        row.push(self.fwd_pld_byte_mean);
        row.push(self.fwd_pld_byte_std);

        row.push(self.bwd_pkt_num_with_pld as f64);
        row.push(self.bwd_pld_byte_sum);
        row.push(self.bwd_pld_byte_max);
        row.push(self.bwd_pld_byte_min);
        row.push(self.bwd_pld_byte_mean);
        row.push(self.bwd_pld_byte_std);

        row.push(self.flow_pkts_s);
        row.push(self.flow_pld_bytes_s);
        row.push(self.fwd_pkts_s);
        row.push(self.fwd_pld_bytes_s);
        row.push(self.bwd_pkts_s);
        row.push(self.bwd_pld_bytes_s);
        row.push(self.pkts_ratio);
        row.push(self.bytes_ratio);

        row.push(self.flow_iat_max);
        row.push(self.flow_iat_min);
        row.push(self.flow_iat_mean);
        row.push(self.flow_iat_std);
        row.push(self.fwd_iat_max);
        row.push(self.fwd_iat_min);
        row.push(self.fwd_iat_mean);
        row.push(self.fwd_iat_std);
        row.push(self.bwd_iat_max);
        row.push(self.bwd_iat_min);
        row.push(self.bwd_iat_mean);
        row.push(self.bwd_iat_std);

        row.push(self.fin_cnt as f64);
        row.push(self.syn_cnt as f64);
        row.push(self.rst_cnt as f64);
        row.push(self.psh_cnt as f64);
        row.push(self.ack_cnt as f64);
        row.push(self.urg_cnt as f64);
        row.push(self.ece_cnt as f64);
        row.push(self.cwr_cnt as f64);

        row.push(self.fwd_psh_cnt as f64);
        row.push(self.bwd_psh_cnt as f64);
        row.push(self.fwd_urg_cnt as f64);
        row.push(self.bwd_urg_cnt as f64);

        row.push(self.fwd_init_win_bytes as f64);
        row.push(self.bwd_init_win_bytes as f64);

        row.push(self.sub_flow_fwd_pkts);
        row.push(self.sub_flow_fwd_pld_bytes);
        row.push(self.sub_flow_bwd_pkts);
        row.push(self.sub_flow_bwd_pld_bytes);

        row.push(self.flow_act_num as f64);
        row.push(self.flow_act_sum);
        row.push(self.flow_act_max);
        row.push(self.flow_act_min);
        row.push(self.flow_act_mean);
        row.push(self.flow_act_std);

        row.push(self.flow_idle_num as f64);
        row.push(self.flow_idle_sum);
        row.push(self.flow_idle_max);
        row.push(self.flow_idle_min);
        row.push(self.flow_idle_mean);
        row.push(self.flow_idle_std);

        row.extend(self.fwd_len_dist.iter().map(|c| *c as f64));
        row.extend(self.bwd_len_dist.iter().map(|c| *c as f64));
        row
    }
}
