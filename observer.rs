//! Diagnostics hooks for the counting pipeline.
//!
//! The pipeline never logs on its own; it reports to whatever observer the
//! caller hands it. Hooks are called from pipeline threads, so observers must
//! be `Send + Sync`.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

/// What one tokenizer did before its input queue closed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerStats {
    pub worker: usize,
    pub lines: u64,
    pub words: u64,
    /// Time spent tokenizing and handing off tokens, excluding waits for input.
    pub busy: Duration,
}

impl WorkerStats {
    /// Words per line, or 0.0 for a worker that never received a line.
    pub fn average_words_per_line(&self) -> f64 {
        if self.lines == 0 {
            0.0
        } else {
            self.words as f64 / self.lines as f64
        }
    }
}

pub trait PipelineObserver: Send + Sync {
    fn worker_started(&self, _worker: usize) {}

    fn worker_finished(&self, _stats: &WorkerStats) {}

    /// Every tokenizer output has been forwarded and the merged queue is closed.
    fn producers_drained(&self) {}

    fn aggregation_finished(&self, _unique_words: usize, _total_words: u64) {}

    /// The driver read its last line and closed the line queue.
    fn feed_finished(&self, _lines: u64, _elapsed: Duration) {}

    /// The driver got the counts back after closing the line queue.
    fn drain_finished(&self, _waited: Duration) {}
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Emits every event as a `tracing` debug record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn worker_started(&self, worker: usize) {
        debug!(worker, "starting tokenizer");
    }

    fn worker_finished(&self, stats: &WorkerStats) {
        debug!(
            worker = stats.worker,
            lines = stats.lines,
            words = stats.words,
            avg = format_args!("{:.2}", stats.average_words_per_line()),
            busy = ?stats.busy,
            "leaving tokenizer"
        );
    }

    fn producers_drained(&self) {
        debug!("all tokenizers drained, merged queue closed");
    }

    fn aggregation_finished(&self, unique_words: usize, total_words: u64) {
        debug!(unique_words, total_words, "word map complete");
    }

    fn feed_finished(&self, lines: u64, elapsed: Duration) {
        debug!(lines, elapsed = ?elapsed, "input exhausted, line queue closed");
    }

    fn drain_finished(&self, waited: Duration) {
        debug!(waited = ?waited, "pipeline drained");
    }
}

impl<A, B> PipelineObserver for (A, B)
where
    A: PipelineObserver,
    B: PipelineObserver,
{
    fn worker_started(&self, worker: usize) {
        self.0.worker_started(worker);
        self.1.worker_started(worker);
    }

    fn worker_finished(&self, stats: &WorkerStats) {
        self.0.worker_finished(stats);
        self.1.worker_finished(stats);
    }

    fn producers_drained(&self) {
        self.0.producers_drained();
        self.1.producers_drained();
    }

    fn aggregation_finished(&self, unique_words: usize, total_words: u64) {
        self.0.aggregation_finished(unique_words, total_words);
        self.1.aggregation_finished(unique_words, total_words);
    }

    fn feed_finished(&self, lines: u64, elapsed: Duration) {
        self.0.feed_finished(lines, elapsed);
        self.1.feed_finished(lines, elapsed);
    }

    fn drain_finished(&self, waited: Duration) {
        self.0.drain_finished(waited);
        self.1.drain_finished(waited);
    }
}

impl<T: PipelineObserver + ?Sized> PipelineObserver for Arc<T> {
    fn worker_started(&self, worker: usize) {
        (**self).worker_started(worker);
    }

    fn worker_finished(&self, stats: &WorkerStats) {
        (**self).worker_finished(stats);
    }

    fn producers_drained(&self) {
        (**self).producers_drained();
    }

    fn aggregation_finished(&self, unique_words: usize, total_words: u64) {
        (**self).aggregation_finished(unique_words, total_words);
    }

    fn feed_finished(&self, lines: u64, elapsed: Duration) {
        (**self).feed_finished(lines, elapsed);
    }

    fn drain_finished(&self, waited: Duration) {
        (**self).drain_finished(waited);
    }
}
