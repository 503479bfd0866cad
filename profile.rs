//! Plain-text diagnostic reports behind `--cpuprofile` and `--memprofile`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use itertools::Itertools;
use tracing::info;

use crate::driver::Report;
use crate::error::{Result, WordFreqError};
use crate::observer::{PipelineObserver, WorkerStats};

/// Driver-side stage durations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimes {
    /// Reading input and pushing it into the line queue.
    pub feed: Duration,
    /// Waiting for the pipeline to drain after the line queue closed.
    pub drain: Duration,
}

/// Collects worker statistics and stage durations while counting runs.
#[derive(Debug, Default)]
pub struct ProfileRecorder {
    workers: Mutex<Vec<WorkerStats>>,
    stages: Mutex<StageTimes>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ProfileRecorder {
    pub fn workers(&self) -> Vec<WorkerStats> {
        locked(&self.workers).clone()
    }

    pub fn stages(&self) -> StageTimes {
        *locked(&self.stages)
    }
}

impl PipelineObserver for ProfileRecorder {
    fn worker_finished(&self, stats: &WorkerStats) {
        locked(&self.workers).push(stats.clone());
    }

    fn feed_finished(&self, _lines: u64, elapsed: Duration) {
        locked(&self.stages).feed = elapsed;
    }

    fn drain_finished(&self, waited: Duration) {
        locked(&self.stages).drain = waited;
    }
}

fn percent(part: Duration, total: Duration) -> f64 {
    if total.is_zero() {
        0.0
    } else {
        part.as_secs_f64() / total.as_secs_f64() * 100.0
    }
}

fn profile_error(path: &Path) -> impl FnOnce(std::io::Error) -> WordFreqError + '_ {
    move |source| WordFreqError::Profile {
        path: path.to_path_buf(),
        source,
    }
}

/// Timing report. The file is created up front so a bad path fails before
/// any input is read.
#[derive(Debug)]
pub struct CpuProfile {
    path: PathBuf,
    file: File,
    started: Instant,
    recorder: Arc<ProfileRecorder>,
}

impl CpuProfile {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(profile_error(path))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            started: Instant::now(),
            recorder: Arc::new(ProfileRecorder::default()),
        })
    }

    pub fn recorder(&self) -> &Arc<ProfileRecorder> {
        &self.recorder
    }

    /// Write the report given how long rendering took.
    pub fn finish(self, rendered: Duration) -> Result<()> {
        let total = self.started.elapsed();
        let stages = self.recorder.stages();
        let workers = self.recorder.workers();
        let mut out = BufWriter::new(self.file);
        write_cpu_report(&mut out, total, stages, rendered, &workers)
            .and_then(|()| out.flush())
            .map_err(profile_error(&self.path))?;
        info!(path = %self.path.display(), "wrote cpu profile");
        Ok(())
    }
}

fn write_cpu_report<W: Write>(
    out: &mut W,
    total: Duration,
    stages: StageTimes,
    rendered: Duration,
    workers: &[WorkerStats],
) -> std::io::Result<()> {
    let counted = stages.feed + stages.drain;
    writeln!(out, "Total time: {total:.2?}")?;
    writeln!(
        out,
        "Read+feed time: {:.2?} ({:.1}% of total)",
        stages.feed,
        percent(stages.feed, total)
    )?;
    writeln!(
        out,
        "Drain wait time: {:.2?} ({:.1}% of total)",
        stages.drain,
        percent(stages.drain, total)
    )?;
    writeln!(
        out,
        "Rendering time: {rendered:.2?} ({:.1}% of total)",
        percent(rendered, total)
    )?;
    writeln!(out)?;

    let busy: Duration = workers.iter().map(|s| s.busy).sum();
    writeln!(out, "Tokenizers: {} (busy {busy:.2?})", workers.len())?;
    for stats in workers.iter().sorted_by_key(|s| s.worker) {
        writeln!(
            out,
            "  worker {:>3}: lines {:>10} words {:>12} avg {:>6.2} busy {:.2?} ({:.1}% of counting)",
            stats.worker,
            stats.lines,
            stats.words,
            stats.average_words_per_line(),
            stats.busy,
            percent(stats.busy, counted),
        )?;
    }
    Ok(())
}

/// Footprint estimate of the finished frequency map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryProfile {
    pub unique_words: usize,
    pub key_bytes: usize,
    pub map_capacity: usize,
    pub estimated_bytes: usize,
}

impl MemoryProfile {
    pub fn capture(report: &Report) -> Self {
        let words = report.counts.words();
        let key_bytes = words.keys().map(String::len).sum();
        let slot = mem::size_of::<String>() + mem::size_of::<u64>() + 1;
        Self {
            unique_words: words.len(),
            key_bytes,
            map_capacity: words.capacity(),
            estimated_bytes: words.capacity() * slot + key_bytes,
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(profile_error(path))?;
        let mut out = BufWriter::new(file);
        self.write_to(&mut out)
            .and_then(|()| out.flush())
            .map_err(profile_error(path))?;
        info!(path = %path.display(), "wrote memory profile");
        Ok(())
    }

    fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "Unique words: {}", self.unique_words)?;
        writeln!(out, "Key bytes: {}", self.key_bytes)?;
        writeln!(out, "Map capacity: {}", self.map_capacity)?;
        writeln!(out, "Estimated map size: {} bytes", self.estimated_bytes)
    }
}
