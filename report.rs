use std::cmp::Ordering;
use std::io::{self, Write};

use rayon::prelude::*;

use crate::driver::Report;
use crate::pipeline::FrequencyMap;

/// Totals printed below the word list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub unique_words: usize,
    pub total_words: u64,
    pub total_lines: u64,
}

impl From<&Report> for Summary {
    fn from(report: &Report) -> Self {
        Self {
            unique_words: report.counts.unique_words(),
            total_words: report.counts.total_words(),
            total_lines: report.total_lines,
        }
    }
}

fn by_count_then_token(a: &(&str, u64), b: &(&str, u64)) -> Ordering {
    a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0))
}

/// Entries ordered by ascending count, ties by ascending token.
pub fn sorted_entries(words: &FrequencyMap) -> Vec<(&str, u64)> {
    let mut entries: Vec<(&str, u64)> = words
        .iter()
        .map(|(word, &count)| (word.as_str(), count))
        .collect();
    entries.par_sort_by(by_count_then_token);
    entries
}

/// One `<count>: <token>` line per distinct token.
pub fn write_word_list<W: Write>(out: &mut W, words: &FrequencyMap) -> io::Result<()> {
    for (word, count) in sorted_entries(words) {
        writeln!(out, "{count}: {word}")?;
    }
    Ok(())
}

pub fn write_summary<W: Write>(out: &mut W, summary: &Summary) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Total number of uniq words:{:>10}", summary.unique_words)?;
    writeln!(out, "Total number of words:{:>15}", summary.total_words)?;
    writeln!(out, "Total number of lines:{:>15}", summary.total_lines)?;
    Ok(())
}
