use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, WordFreqError};
use crate::observer::{PipelineObserver, TracingObserver};
use crate::pipeline::{Pipeline, WordCounts};
use crate::profile::{CpuProfile, MemoryProfile};
use crate::report;

/// Longest accepted line, terminator excluded.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Everything the pipeline learned about one input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub counts: WordCounts,
    pub total_lines: u64,
}

/// Reads `\n`-terminated lines, dropping a trailing `\r` and decoding bytes as
/// UTF-8 with replacement.
pub struct LineReader<R> {
    inner: R,
    buf: Vec<u8>,
    line_no: u64,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(64 * 1024),
            line_no: 0,
        }
    }

    pub fn next_line(&mut self) -> Result<Option<String>> {
        self.buf.clear();
        // Room for a full-length line plus its "\r\n".
        let limit = (MAX_LINE_BYTES + 2) as u64;
        let read = (&mut self.inner)
            .take(limit)
            .read_until(b'\n', &mut self.buf)
            .map_err(WordFreqError::ReadInput)?;
        if read == 0 {
            return Ok(None);
        }
        self.line_no += 1;

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        if self.buf.len() > MAX_LINE_BYTES {
            return Err(WordFreqError::LineTooLong {
                line: self.line_no,
                limit: MAX_LINE_BYTES,
            });
        }

        let (text, malformed) = encoding_rs::UTF_8.decode_without_bom_handling(&self.buf);
        if malformed {
            debug!(line = self.line_no, "replaced invalid UTF-8");
        }
        Ok(Some(text.into_owned()))
    }
}

/// Push every line of `reader` through a fresh pipeline.
///
/// A read error abandons the pipeline; its threads wind down on their own
/// once the line queue is dropped.
pub fn count_reader<R: BufRead>(
    reader: R,
    config: &Config,
    observer: Arc<dyn PipelineObserver>,
) -> Result<Report> {
    let pipeline = Pipeline::start(config, Arc::clone(&observer))?;
    let mut lines = LineReader::new(reader);
    let mut total_lines = 0u64;

    let feeding = Instant::now();
    while let Some(line) = lines.next_line()? {
        pipeline.feed(line)?;
        total_lines += 1;
    }
    observer.feed_finished(total_lines, feeding.elapsed());

    let draining = Instant::now();
    let counts = pipeline.finish()?;
    observer.drain_finished(draining.elapsed());
    Ok(Report {
        counts,
        total_lines,
    })
}

/// Count the configured file, or standard input when none is set.
pub fn count_source(config: &Config, observer: Arc<dyn PipelineObserver>) -> Result<Report> {
    match &config.input {
        Some(path) => {
            let file = File::open(path).map_err(|source| WordFreqError::OpenInput {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), workers = config.workers, "counting file");
            count_reader(BufReader::new(file), config, observer)
        }
        None => {
            info!(workers = config.workers, "counting standard input");
            count_reader(io::stdin().lock(), config, observer)
        }
    }
}

/// The whole program: count, render to stdout, write any requested profiles.
pub fn run(config: &Config) -> Result<()> {
    let cpu_profile = config
        .cpu_profile
        .as_deref()
        .map(CpuProfile::create)
        .transpose()?;

    let report = match &cpu_profile {
        Some(profile) => {
            let observer: Arc<dyn PipelineObserver> =
                Arc::new((TracingObserver, Arc::clone(profile.recorder())));
            count_source(config, observer)?
        }
        None => count_source(config, Arc::new(TracingObserver))?,
    };

    let render_started = Instant::now();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    render(&mut out, &report, config)
        .and_then(|()| out.flush())
        .or_else(ignore_broken_pipe)
        .map_err(WordFreqError::Output)?;
    let rendered = render_started.elapsed();

    if let Some(profile) = cpu_profile {
        profile.finish(rendered)?;
    }
    if let Some(path) = &config.mem_profile {
        MemoryProfile::capture(&report).write(path)?;
    }
    Ok(())
}

/// Write the sections `config` asks for.
pub fn render<W: Write>(out: &mut W, report: &Report, config: &Config) -> io::Result<()> {
    if config.show_word_list {
        report::write_word_list(out, report.counts.words())?;
    }
    if config.show_summary {
        report::write_summary(out, &report::Summary::from(report))?;
    }
    Ok(())
}

fn ignore_broken_pipe(err: io::Error) -> io::Result<()> {
    if err.kind() == io::ErrorKind::BrokenPipe {
        Ok(())
    } else {
        Err(err)
    }
}
