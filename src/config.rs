use std::num::NonZeroUsize;

use clap::ValueEnum;

/// How a worker pulls the bytes of its span off disk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ReadMode {
    /// Map the span into memory and split lines in place.
    #[default]
    Mmap,
    /// Seek to the span and read it line by line through a buffer.
    Buffered,
}

/// What to do with a line that is not `key;value`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum MalformedPolicy {
    #[default]
    Fail,
    Skip,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub pool_size: NonZeroUsize,
    pub read_mode: ReadMode,
    pub on_malformed: MalformedPolicy,
}

impl Config {
    pub fn new(pool_size: NonZeroUsize) -> Self {
        Self {
            pool_size,
            read_mode: ReadMode::default(),
            on_malformed: MalformedPolicy::default(),
        }
    }

    pub fn with_read_mode(mut self, read_mode: ReadMode) -> Self {
        self.read_mode = read_mode;
        self
    }

    pub fn with_malformed_policy(mut self, on_malformed: MalformedPolicy) -> Self {
        self.on_malformed = on_malformed;
        self
    }
}
