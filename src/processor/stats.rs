pub const LEN_BUCKETS: usize = 150;

/// Aggregate over a session-lifetime sequence of samples.
///
/// The raw values are retained for the whole session: finalization discards
/// samples by insertion position (`remove`), which an incremental form
/// cannot express. Mean and deviation use population formulas, and every
/// accessor reports 0 on an empty accumulator.
#[derive(Debug, Clone, Default)]
pub struct SummaryStats {
    values: Vec<f64>,
}

impl SummaryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        self.values.push(value);
    }

    pub fn n(&self) -> usize {
        self.values.len()
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn max(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().copied().fold(f64::MIN, f64::max)
    }

    pub fn min(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().copied().fold(f64::MAX, f64::min)
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.sum() / self.values.len() as f64
    }

    /// Population variance (divisor = count).
    pub fn variance(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let squared: f64 = self.values.iter().map(|v| (v - mean) * (v - mean)).sum();
        squared / self.values.len() as f64
    }

    /// Population standard deviation.
    pub fn std(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Drop the value at insertion-order position `idx`; no-op out of range.
    pub fn remove(&mut self, idx: usize) {
        if idx < self.values.len() {
            self.values.remove(idx);
        }
    }
}

/// Fixed 150-bucket frequency table over IP packet lengths.
///
/// On-wire IPv4 packets are normally 40..=1500 bytes, so that span maps to
/// one bucket per 10 bytes; everything shorter, and two coarse oversize
/// ranges, get dedicated buckets.
#[derive(Debug, Clone)]
pub struct LenHistogram {
    counts: [u64; LEN_BUCKETS],
    n: u64,
}

impl Default for LenHistogram {
    fn default() -> Self {
        Self {
            counts: [0; LEN_BUCKETS],
            n: 0,
        }
    }
}

impl LenHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, length: u16) {
        self.n += 1;
        let bucket = if length < 40 {
            0
        } else if length <= 1500 {
            (length / 10 - 3) as usize
        } else if length <= 2960 {
            148
        } else {
            149
        };
        self.counts[bucket] += 1;
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn counts(&self) -> &[u64; LEN_BUCKETS] {
        &self.counts
    }
}
