use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::num::NonZeroUsize;
use std::path::Path;

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::chunk::{ChunkAggregator, Shard};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::reduce::reduce;
use crate::span::Span;
use crate::stats::GlobalMap;

/// Splits `[0, size)` into exactly `workers` spans that each end right after
/// a newline (or at `size`).
///
/// Every boundary starts from an even target and moves forward to the next
/// newline, so no line is cut and no byte is assigned twice. Trailing spans are
/// empty when the file has fewer lines than workers.
pub fn line_aligned_spans<R>(reader: &mut R, size: u64, workers: NonZeroUsize) -> io::Result<Vec<Span>>
where
    R: BufRead + Seek,
{
    let workers = workers.get();
    let target = size.div_ceil(workers as u64);

    let mut spans = Vec::with_capacity(workers);
    let mut start = 0;
    for _ in 0..workers {
        let hint = size.min(start + target);
        let end = if hint == size {
            size
        } else {
            reader.seek(SeekFrom::Start(hint))?;
            let skipped = reader.skip_until(b'\n')? as u64;
            size.min(hint + skipped)
        };
        spans.push(Span::new(start, end));
        start = end;
    }
    debug_assert_eq!(start, size);

    Ok(spans)
}

/// Partitions a file across a fixed pool of workers and reduces their shards.
pub struct FileProcessor {
    config: Config,
}

impl FileProcessor {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn spans(&self, path: &Path) -> Result<Vec<Span>> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let size = file.metadata().map_err(|e| Error::io(path, e))?.len();
        let mut reader = BufReader::new(file);
        line_aligned_spans(&mut reader, size, self.config.pool_size).map_err(|e| Error::io(path, e))
    }

    pub fn process(&self, path: &Path) -> Result<GlobalMap> {
        let spans = self.spans(path)?;
        debug!(?spans, "partitioned {}", path.display());

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.pool_size.get())
            .thread_name(|i| format!("brc-worker-{i}"))
            .build()?;

        let aggregator = ChunkAggregator::new(path, &self.config);
        let shards: Vec<Shard> = pool.install(|| {
            spans
                .par_iter()
                .map(|&span| aggregator.aggregate(span))
                .collect::<Result<_>>()
        })?;

        let lines: u64 = shards.iter().map(|shard| shard.lines).sum();
        let skipped: u64 = shards.iter().map(|shard| shard.skipped).sum();
        if skipped > 0 {
            warn!(skipped, "skipped malformed lines");
        }

        let global = reduce(shards.into_iter().map(|shard| shard.stations));
        info!(
            workers = self.config.pool_size.get(),
            lines,
            stations = global.len(),
            "aggregated {}",
            path.display()
        );
        Ok(global)
    }
}
