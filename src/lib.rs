//! Per-station min/mean/max over a `station;reading` measurements file.
//!
//! The file is cut into line-aligned spans, one per worker. Each worker scans
//! its span into a private map, the maps are reduced once every worker has
//! joined, and the result is rendered as a sorted summary.

pub mod chunk;
pub mod config;
pub mod error;
pub mod parse;
pub mod partition;
pub mod reduce;
pub mod report;
pub mod span;
pub mod stats;

use std::path::Path;

pub use config::{Config, MalformedPolicy, ReadMode};
pub use error::{Error, Result};
pub use partition::FileProcessor;
pub use report::{format_duration, format_output};
pub use stats::{GlobalMap, StationStats};

/// Aggregates `path` and renders the `{name=min/mean/max, ...}` summary.
pub fn aggregate(path: impl AsRef<Path>, config: &Config) -> Result<String> {
    let stations = FileProcessor::new(config.clone()).process(path.as_ref())?;
    Ok(format_output(&stations))
}
