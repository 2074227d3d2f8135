use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

/// Running statistics of one station, all readings in tenths.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StationStats {
    pub min: i32,
    pub max: i32,
    pub total: i64,
    pub count: u64,
}

/// Station name to statistics. Keys are raw bytes so a borrowed `&[u8]` slice
/// of the input can look them up.
pub type StationMap = HashMap<Box<[u8]>, StationStats, FxBuildHasher>;

/// Stations seen by a single worker.
pub type ShardMap = StationMap;

/// Stations of the whole file after reduction.
pub type GlobalMap = StationMap;

impl StationStats {
    pub fn new(reading: i32) -> Self {
        Self {
            min: reading,
            max: reading,
            total: reading as i64,
            count: 1,
        }
    }

    #[inline]
    pub fn record(&mut self, reading: i32) {
        if reading < self.min {
            self.min = reading;
        } else if reading > self.max {
            self.max = reading;
        }
        self.total += reading as i64;
        self.count += 1;
    }

    pub fn merge(&mut self, other: StationStats) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.total += other.total;
        self.count += other.count;
    }

    /// Mean in tenths, rounded half away from zero.
    pub fn mean_tenths(&self) -> i64 {
        let total = self.total as i128;
        let count = self.count as i128;
        let rounded = (2 * total.abs() + count) / (2 * count);
        (if total < 0 { -rounded } else { rounded }) as i64
    }
}
