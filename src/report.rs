use std::fmt;
use std::time::Duration;

use crate::stats::{GlobalMap, StationStats};

/// A fixed-point tenths value shown with one fractional digit.
struct Tenths(i64);

impl fmt::Display for Tenths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{}", abs / 10, abs % 10)
    }
}

/// Renders `{name=min/mean/max, ...}` with names in byte order.
pub fn format_output(stats: &GlobalMap) -> String {
    let mut stations: Vec<(&[u8], &StationStats)> =
        stats.iter().map(|(name, stats)| (&name[..], stats)).collect();
    stations.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let mut output = String::from("{");
    for (count, (station, station_stats)) in stations.into_iter().enumerate() {
        if count != 0 {
            output.push_str(", ");
        }
        output.push_str(&format!(
            "{}={}/{}/{}",
            String::from_utf8_lossy(station),
            Tenths(station_stats.min as i64),
            Tenths(station_stats.mean_tenths()),
            Tenths(station_stats.max as i64),
        ));
    }
    output.push('}');

    output
}

/// Formats elapsed time as `MM:SS.mmm`.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    format!(
        "{:02}:{:02}.{:03}",
        total_seconds / 60,
        total_seconds % 60,
        duration.subsec_millis()
    )
}
