use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use memchr::memchr;
use memmap2::MmapOptions;
use tracing::{debug, trace};

use crate::config::{Config, MalformedPolicy, ReadMode};
use crate::error::{Error, Result};
use crate::parse::parse_line;
use crate::span::Span;
use crate::stats::{ShardMap, StationStats};

const BUF_CAPACITY: usize = 1 << 20;

/// What one worker produced from its span.
#[derive(Debug, Default)]
pub struct Shard {
    pub stations: ShardMap,
    pub lines: u64,
    pub skipped: u64,
}

impl Shard {
    /// Folds one line (terminator already stripped) into the shard. `offset`
    /// is where the line starts in the file and only feeds diagnostics.
    pub fn record_line(&mut self, line: &[u8], offset: u64, policy: MalformedPolicy) -> Result<()> {
        let Some((station, reading)) = parse_line(line) else {
            return match policy {
                MalformedPolicy::Fail => Err(Error::Malformed {
                    offset,
                    line: String::from_utf8_lossy(line).into_owned(),
                }),
                MalformedPolicy::Skip => {
                    trace!(offset, "skipping malformed line");
                    self.skipped += 1;
                    Ok(())
                }
            };
        };

        // entry_ref only allocates the owned key when the station is new
        self.stations
            .entry_ref(station)
            .and_modify(|stats| stats.record(reading))
            .or_insert_with(|| StationStats::new(reading));
        self.lines += 1;
        Ok(())
    }
}

/// Scans one line-aligned span of a file into a private [`Shard`].
pub struct ChunkAggregator<'a> {
    path: &'a Path,
    read_mode: ReadMode,
    on_malformed: MalformedPolicy,
}

impl<'a> ChunkAggregator<'a> {
    pub fn new(path: &'a Path, config: &Config) -> Self {
        Self {
            path,
            read_mode: config.read_mode,
            on_malformed: config.on_malformed,
        }
    }

    pub fn aggregate(&self, span: Span) -> Result<Shard> {
        let mut shard = Shard::default();
        if span.is_empty() {
            return Ok(shard);
        }

        let file = File::open(self.path).map_err(|e| Error::io(self.path, e))?;
        match self.read_mode {
            ReadMode::Mmap => self.scan_mapped(&file, span, &mut shard)?,
            ReadMode::Buffered => self.scan_buffered(file, span, &mut shard)?,
        }

        debug!(
            start = span.start(),
            end = span.end(),
            stations = shard.stations.len(),
            lines = shard.lines,
            skipped = shard.skipped,
            "chunk done"
        );
        Ok(shard)
    }

    fn scan_mapped(&self, file: &File, span: Span, shard: &mut Shard) -> Result<()> {
        let len = usize::try_from(span.len())
            .map_err(|e| Error::io(self.path, io::Error::new(io::ErrorKind::InvalidInput, e)))?;
        // SAFETY: the mapping is read-only and the source is not expected to
        // change while it is being aggregated.
        let mmap = unsafe { MmapOptions::new().offset(span.start()).len(len).map(file) }
            .map_err(|e| Error::io(self.path, e))?;

        let mut rest = &mmap[..];
        let mut offset = span.start();
        while !rest.is_empty() {
            let (line, consumed) = match memchr(b'\n', rest) {
                Some(pos) => (&rest[..pos], pos + 1),
                None => (rest, rest.len()),
            };
            shard.record_line(line, offset, self.on_malformed)?;
            rest = &rest[consumed..];
            offset += consumed as u64;
        }
        Ok(())
    }

    fn scan_buffered(&self, mut file: File, span: Span, shard: &mut Shard) -> Result<()> {
        file.seek(SeekFrom::Start(span.start()))
            .map_err(|e| Error::io(self.path, e))?;
        let mut reader = BufReader::with_capacity(BUF_CAPACITY, file.take(span.len()));

        let mut line = Vec::new();
        let mut offset = span.start();
        loop {
            let read = reader
                .read_until(b'\n', &mut line)
                .map_err(|e| Error::io(self.path, e))?;
            if read == 0 {
                break;
            }
            let content = line.strip_suffix(b"\n").unwrap_or(&line[..]);
            shard.record_line(content, offset, self.on_malformed)?;
            offset += read as u64;
            line.clear();
        }

        if offset != span.end() {
            let source = io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("span ended at byte {offset}, expected {}", span.end()),
            );
            return Err(Error::io(self.path, source));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::num::NonZeroUsize;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    fn config(read_mode: ReadMode, on_malformed: MalformedPolicy) -> Config {
        Config::new(NonZeroUsize::MIN)
            .with_read_mode(read_mode)
            .with_malformed_policy(on_malformed)
    }

    const MODES: [ReadMode; 2] = [ReadMode::Mmap, ReadMode::Buffered];

    #[test]
    fn aggregates_whole_file() {
        let input = b"A;1.0\nB;2.0\nA;3.0\n";
        let file = write_temp(input);
        for mode in MODES {
            let config = config(mode, MalformedPolicy::Fail);
            let shard = ChunkAggregator::new(file.path(), &config)
                .aggregate(Span::new(0, input.len() as u64))
                .unwrap();
            assert_eq!(shard.lines, 3);
            assert_eq!(shard.stations.len(), 2);
            let a = shard.stations[&b"A"[..]];
            assert_eq!((a.min, a.max, a.total, a.count), (10, 30, 40, 2));
            let b = shard.stations[&b"B"[..]];
            assert_eq!((b.min, b.max, b.total, b.count), (20, 20, 20, 1));
        }
    }

    #[test]
    fn reads_only_its_span() {
        // second line starts at byte 6 and ends at 12
        let input = b"A;1.0\nB;2.0\nC;3.0\n";
        let file = write_temp(input);
        for mode in MODES {
            let config = config(mode, MalformedPolicy::Fail);
            let shard = ChunkAggregator::new(file.path(), &config)
                .aggregate(Span::new(6, 12))
                .unwrap();
            assert_eq!(shard.lines, 1);
            assert!(shard.stations.contains_key(&b"B"[..]));
        }
    }

    #[test]
    fn last_line_without_newline_counts() {
        let input = b"A;1.0\nA;-2.5";
        let file = write_temp(input);
        for mode in MODES {
            let config = config(mode, MalformedPolicy::Fail);
            let shard = ChunkAggregator::new(file.path(), &config)
                .aggregate(Span::new(0, input.len() as u64))
                .unwrap();
            let a = shard.stations[&b"A"[..]];
            assert_eq!((a.min, a.max, a.count), (-25, 10, 2));
        }
    }

    #[test]
    fn empty_span_touches_nothing() {
        let config = config(ReadMode::Mmap, MalformedPolicy::Fail);
        let missing = Path::new("/definitely/not/here.txt");
        let shard = ChunkAggregator::new(missing, &config)
            .aggregate(Span::new(0, 0))
            .unwrap();
        assert!(shard.stations.is_empty());
        assert_eq!(shard.lines, 0);
    }

    #[test]
    fn malformed_line_fails_with_offset() {
        let input = b"A;1.0\nbroken\nA;2.0\n";
        let file = write_temp(input);
        for mode in MODES {
            let config = config(mode, MalformedPolicy::Fail);
            let err = ChunkAggregator::new(file.path(), &config)
                .aggregate(Span::new(0, input.len() as u64))
                .unwrap_err();
            match err {
                Error::Malformed { offset, line } => {
                    assert_eq!(offset, 6);
                    assert_eq!(line, "broken");
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn malformed_lines_are_skipped_and_counted() {
        let input = b"A;1.0\nbroken\nB;12.34\nA;2.0\n";
        let file = write_temp(input);
        for mode in MODES {
            let config = config(mode, MalformedPolicy::Skip);
            let shard = ChunkAggregator::new(file.path(), &config)
                .aggregate(Span::new(0, input.len() as u64))
                .unwrap();
            assert_eq!(shard.lines, 2);
            assert_eq!(shard.skipped, 2);
            assert!(!shard.stations.contains_key(&b"B"[..]));
            let a = shard.stations[&b"A"[..]];
            assert_eq!((a.min, a.max, a.count), (10, 20, 2));
        }
    }

    #[test]
    fn truncated_source_is_an_io_error() {
        let input = b"A;1.0\n";
        let file = write_temp(input);
        let config = config(ReadMode::Buffered, MalformedPolicy::Fail);
        let err = ChunkAggregator::new(file.path(), &config)
            .aggregate(Span::new(0, 64))
            .unwrap_err();
        match err {
            Error::Io { source, .. } => assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let config = config(ReadMode::Mmap, MalformedPolicy::Fail);
        let missing = Path::new("/definitely/not/here.txt");
        let err = ChunkAggregator::new(missing, &config)
            .aggregate(Span::new(0, 10))
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
