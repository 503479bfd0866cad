//! Fan-out/fan-in word counting.
//!
//! ```text
//! lines ──▶ tokenizer-0 ──▶ merge-0 ──┐
//!       ──▶ tokenizer-1 ──▶ merge-1 ──┼──▶ aggregator ──▶ Completion
//!       ──▶ tokenizer-N ──▶ merge-N ──┘
//! ```
//!
//! All queues are bounded. The aggregator is the only thread that touches the
//! frequency map; it hands the finished map over through a one-shot
//! [`Completion`] once the merged queue is closed and drained.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, bounded};
use tracing::warn;

use crate::config::Config;
use crate::error::{Result, WordFreqError};
use crate::normalize::tokenize;
use crate::observer::{PipelineObserver, WorkerStats};

pub type FrequencyMap = HashMap<String, u64>;

/// Final counts produced by the aggregator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordCounts {
    words: FrequencyMap,
    total_words: u64,
}

impl WordCounts {
    fn record(&mut self, token: String) {
        *self.words.entry(token).or_insert(0) += 1;
        self.total_words += 1;
    }

    pub fn words(&self) -> &FrequencyMap {
        &self.words
    }

    pub fn into_words(self) -> FrequencyMap {
        self.words
    }

    pub fn total_words(&self) -> u64 {
        self.total_words
    }

    pub fn unique_words(&self) -> usize {
        self.words.len()
    }

    /// Occurrences of `token`, zero when it was never seen.
    pub fn count(&self, token: &str) -> u64 {
        self.words.get(token).copied().unwrap_or(0)
    }
}

fn spawn_stage<F>(name: String, body: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name)
        .spawn(body)
        .map_err(WordFreqError::Spawn)
}

/// Start one tokenizer reading from the shared line queue.
///
/// Returns the worker's private token queue; it closes when `lines` is closed
/// and fully consumed.
pub fn spawn_tokenizer(
    worker: usize,
    lines: Receiver<String>,
    capacity: usize,
    observer: Arc<dyn PipelineObserver>,
) -> Result<(Receiver<String>, JoinHandle<()>)> {
    let (out, tokens) = bounded(capacity);
    observer.worker_started(worker);

    let handle = spawn_stage(format!("tokenizer-{worker}"), move || {
        let mut stats = WorkerStats {
            worker,
            ..WorkerStats::default()
        };

        'lines: for line in lines.iter() {
            let started = Instant::now();
            let words = tokenize(&line);
            stats.lines += 1;
            stats.words += words.len() as u64;
            for word in words {
                if out.send(word).is_err() {
                    warn!(worker, "token queue closed early");
                    break 'lines;
                }
            }
            stats.busy += started.elapsed();
        }

        drop(out);
        observer.worker_finished(&stats);
    })?;

    Ok((tokens, handle))
}

/// Fan `inputs` into one queue of `capacity`.
///
/// Each input gets its own forwarding thread, so a slow producer never holds
/// up the others. The merged queue closes once the last forwarder is done.
pub fn merge(
    inputs: Vec<Receiver<String>>,
    capacity: usize,
    observer: Arc<dyn PipelineObserver>,
) -> Result<(Receiver<String>, Vec<JoinHandle<()>>)> {
    let (sink, merged) = bounded(capacity);
    if inputs.is_empty() {
        observer.producers_drained();
        return Ok((merged, Vec::new()));
    }

    let outstanding = Arc::new(AtomicUsize::new(inputs.len()));
    let mut handles = Vec::with_capacity(inputs.len());
    for (index, input) in inputs.into_iter().enumerate() {
        let sink: Sender<String> = sink.clone();
        let outstanding = Arc::clone(&outstanding);
        let observer = Arc::clone(&observer);
        handles.push(spawn_stage(format!("merge-{index}"), move || {
            for token in input.iter() {
                if sink.send(token).is_err() {
                    break;
                }
            }
            // Release the sender before counting down so the queue is
            // already closed when the last forwarder reports.
            drop(sink);
            if outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
                observer.producers_drained();
            }
        })?);
    }

    Ok((merged, handles))
}

/// One-shot handle on the aggregator's result.
#[derive(Debug)]
pub struct Completion {
    done: Receiver<WordCounts>,
    handle: JoinHandle<()>,
}

impl Completion {
    /// Block until the aggregator has drained its queue, then take the counts.
    pub fn wait(self) -> Result<WordCounts> {
        let counts = self.done.recv().map_err(|_| {
            WordFreqError::PipelineFailed("aggregator stopped before completing")
        })?;
        self.handle
            .join()
            .map_err(|_| WordFreqError::PipelineFailed("aggregator panicked"))?;
        Ok(counts)
    }
}

/// Start the single owner of the frequency map.
pub fn spawn_aggregator(
    tokens: Receiver<String>,
    observer: Arc<dyn PipelineObserver>,
) -> Result<Completion> {
    let (signal, done) = bounded(1);

    let handle = spawn_stage("aggregator".to_string(), move || {
        let mut counts = WordCounts::default();
        for token in tokens.iter() {
            counts.record(token);
        }
        observer.aggregation_finished(counts.unique_words(), counts.total_words());
        // The driver may have bailed out on a read error; nobody to tell then.
        let _ = signal.send(counts);
    })?;

    Ok(Completion { done, handle })
}

/// A running pipeline. Feed it lines, then [`finish`](Pipeline::finish).
pub struct Pipeline {
    lines: Sender<String>,
    workers: Vec<JoinHandle<()>>,
    forwarders: Vec<JoinHandle<()>>,
    completion: Completion,
}

impl Pipeline {
    pub fn start(config: &Config, observer: Arc<dyn PipelineObserver>) -> Result<Self> {
        let workers = config.workers.max(1);
        let (lines, queue) = bounded(config.line_queue_capacity);

        let mut outputs = Vec::with_capacity(workers);
        let mut worker_handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let (tokens, handle) = spawn_tokenizer(
                worker,
                queue.clone(),
                config.worker_queue_capacity,
                Arc::clone(&observer),
            )?;
            outputs.push(tokens);
            worker_handles.push(handle);
        }
        drop(queue);

        let (merged, forwarders) =
            merge(outputs, config.merged_queue_capacity, Arc::clone(&observer))?;
        let completion = spawn_aggregator(merged, observer)?;

        Ok(Self {
            lines,
            workers: worker_handles,
            forwarders,
            completion,
        })
    }

    /// Queue one line, blocking while the line queue is full.
    pub fn feed(&self, line: String) -> Result<()> {
        self.lines
            .send(line)
            .map_err(|_| WordFreqError::PipelineFailed("every tokenizer has stopped"))
    }

    /// Close the line queue and wait for the aggregator to finish.
    pub fn finish(self) -> Result<WordCounts> {
        let Pipeline {
            lines,
            workers,
            forwarders,
            completion,
        } = self;
        drop(lines);

        let counts = completion.wait()?;

        // A dead tokenizer closes its queue like a finished one, so the
        // counts above are only trustworthy if every stage exited cleanly.
        for handle in workers {
            handle
                .join()
                .map_err(|_| WordFreqError::PipelineFailed("tokenizer panicked"))?;
        }
        for handle in forwarders {
            handle
                .join()
                .map_err(|_| WordFreqError::PipelineFailed("merge forwarder panicked"))?;
        }

        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NoopObserver;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    fn noop() -> Arc<dyn PipelineObserver> {
        Arc::new(NoopObserver)
    }

    fn run(lines: &[&str], workers: usize) -> WordCounts {
        let config = Config::default().with_workers(workers);
        let pipeline = Pipeline::start(&config, noop()).unwrap();
        for line in lines {
            pipeline.feed(line.to_string()).unwrap();
        }
        pipeline.finish().unwrap()
    }

    fn corpus(lines: usize) -> Vec<String> {
        let vocabulary = [
            "Alpha", "beta,", "GAMMA!", "delta", "epsilon?", "zeta", "eta", "theta.",
        ];
        (0..lines)
            .map(|i| {
                (0..(i % 7))
                    .map(|j| vocabulary[(i * 3 + j * 5) % vocabulary.len()])
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }

    #[test]
    fn counts_hello_world() {
        let counts = run(&["Hello world", "hello, World!"], 2);
        assert_eq!(counts.count("hello"), 2);
        assert_eq!(counts.count("world"), 2);
        assert_eq!(counts.unique_words(), 2);
        assert_eq!(counts.total_words(), 4);
    }

    #[test]
    fn empty_input_gives_empty_map() {
        let counts = run(&[], 4);
        assert!(counts.words().is_empty());
        assert_eq!(counts.total_words(), 0);
    }

    #[test]
    fn punctuation_line_adds_nothing() {
        let counts = run(&["!!! ??? ..."], 1);
        assert_eq!(counts.total_words(), 0);
    }

    #[test]
    fn counts_sum_to_total_and_keys_never_exceed_it() {
        let lines = corpus(500);
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let counts = run(&refs, 3);
        let sum: u64 = counts.words().values().sum();
        assert_eq!(sum, counts.total_words());
        assert!(counts.unique_words() as u64 <= counts.total_words());
    }

    #[test]
    fn worker_count_does_not_change_the_result() {
        let lines = corpus(10_000);
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let single = run(&refs, 1);
        let many = run(&refs, 8);
        assert_eq!(single, many);
    }

    #[test]
    fn merge_forwards_every_token_once() {
        let mut inputs = Vec::new();
        let mut producers = Vec::new();
        for p in 0..4 {
            let (tx, rx) = bounded(0);
            inputs.push(rx);
            producers.push(thread::spawn(move || {
                for i in 0..250 {
                    tx.send(format!("p{p}-{i}")).unwrap();
                }
            }));
        }

        let (merged, forwarders) = merge(inputs, 8, noop()).unwrap();
        let mut seen: Vec<String> = merged.iter().collect();
        for handle in producers.into_iter().chain(forwarders) {
            handle.join().unwrap();
        }

        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn stalled_input_does_not_hold_up_the_others() {
        use crossbeam_channel::RecvTimeoutError;
        use std::time::Duration;

        let (stalled_tx, stalled_rx) = bounded::<String>(0);
        let (busy_tx, busy_rx) = bounded(0);
        let (merged, forwarders) = merge(vec![stalled_rx, busy_rx], 4, noop()).unwrap();

        let producer = thread::spawn(move || {
            for i in 0..100 {
                busy_tx.send(format!("w{i}")).unwrap();
            }
        });

        let mut received = 0;
        while received < 100 {
            merged.recv_timeout(Duration::from_secs(5)).unwrap();
            received += 1;
        }
        producer.join().unwrap();

        // The stalled sender is still alive, so the merged queue must stay open.
        assert_eq!(
            merged.recv_timeout(Duration::from_millis(50)),
            Err(RecvTimeoutError::Timeout)
        );

        drop(stalled_tx);
        assert_eq!(
            merged.recv_timeout(Duration::from_secs(5)),
            Err(RecvTimeoutError::Disconnected)
        );
        for handle in forwarders {
            handle.join().unwrap();
        }
    }

    #[test]
    fn merge_of_nothing_is_closed() {
        let (merged, forwarders) = merge(Vec::new(), 1, noop()).unwrap();
        assert!(forwarders.is_empty());
        assert!(merged.recv().is_err());
    }

    #[test]
    fn aggregator_signals_once_queue_closes() {
        let (tx, rx) = bounded(4);
        let completion = spawn_aggregator(rx, noop()).unwrap();
        for word in ["a", "b", "a"] {
            tx.send(word.to_string()).unwrap();
        }
        drop(tx);

        let counts = completion.wait().unwrap();
        assert_eq!(counts.count("a"), 2);
        assert_eq!(counts.count("b"), 1);
        assert_eq!(counts.count("c"), 0);
        assert_eq!(counts.total_words(), 3);
    }

    #[derive(Default)]
    struct Recorder {
        finished: Mutex<Vec<WorkerStats>>,
        drained: AtomicUsize,
        aggregated: Mutex<Option<(usize, u64)>>,
    }

    impl PipelineObserver for Recorder {
        fn worker_finished(&self, stats: &WorkerStats) {
            self.finished.lock().unwrap().push(stats.clone());
        }

        fn producers_drained(&self) {
            self.drained.fetch_add(1, Ordering::SeqCst);
        }

        fn aggregation_finished(&self, unique_words: usize, total_words: u64) {
            *self.aggregated.lock().unwrap() = Some((unique_words, total_words));
        }
    }

    #[test]
    fn observer_sees_every_worker_and_one_drain() {
        let recorder = Arc::new(Recorder::default());
        let config = Config::default().with_workers(4);
        let pipeline = Pipeline::start(&config, recorder.clone()).unwrap();
        for line in ["one two", "three", "", "four five six"] {
            pipeline.feed(line.to_string()).unwrap();
        }
        pipeline.finish().unwrap();

        let finished = recorder.finished.lock().unwrap();
        assert_eq!(finished.len(), 4);
        assert_eq!(finished.iter().map(|s| s.lines).sum::<u64>(), 4);
        assert_eq!(finished.iter().map(|s| s.words).sum::<u64>(), 6);
        assert_eq!(recorder.drained.load(Ordering::SeqCst), 1);
        assert_eq!(*recorder.aggregated.lock().unwrap(), Some((6, 6)));
    }
}
