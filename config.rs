use std::path::PathBuf;
use std::thread;

/// Workers kept back for the driver and the aggregator.
const RESERVED_THREADS: usize = 2;

const LINE_QUEUE_CAPACITY: usize = 10;
const WORKER_QUEUE_CAPACITY: usize = 0; // rendezvous hand-off
const MERGED_QUEUE_CAPACITY: usize = 200;

/// Run settings, built once at startup and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// File to read; standard input when `None`.
    pub input: Option<PathBuf>,
    pub workers: usize,
    pub show_word_list: bool,
    pub show_summary: bool,
    pub debug: bool,
    pub cpu_profile: Option<PathBuf>,
    pub mem_profile: Option<PathBuf>,
    pub line_queue_capacity: usize,
    pub worker_queue_capacity: usize,
    pub merged_queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: None,
            workers: default_workers(),
            show_word_list: true,
            show_summary: true,
            debug: false,
            cpu_profile: None,
            mem_profile: None,
            line_queue_capacity: LINE_QUEUE_CAPACITY,
            worker_queue_capacity: WORKER_QUEUE_CAPACITY,
            merged_queue_capacity: MERGED_QUEUE_CAPACITY,
        }
    }
}

impl Config {
    /// Set the tokenizer count. Zero selects [`default_workers`].
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = if workers == 0 { default_workers() } else { workers };
        self
    }

    pub fn with_input(mut self, input: impl Into<PathBuf>) -> Self {
        self.input = Some(input.into());
        self
    }
}

/// All hardware threads but two, and never fewer than one.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get().saturating_sub(RESERVED_THREADS))
        .unwrap_or(1)
        .max(1)
}
