use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "wordfreq", version)]
#[command(about = "Count word frequencies in a file or standard input", long_about = None)]
pub struct Cli {
    /// File to read (defaults to standard input)
    pub file: Option<PathBuf>,

    /// Number of tokenizer threads (0 = all CPU threads but 2)
    #[arg(short = 'n', long, alias = "number-goroutines", default_value_t = 0)]
    pub workers: usize,

    /// Don't print the word list
    #[arg(long)]
    pub no_word_list: bool,

    /// Don't print the summary
    #[arg(long)]
    pub no_summary: bool,

    /// Show debug information
    #[arg(long)]
    pub debug: bool,

    /// Write a CPU timing profile to FILE
    #[arg(long, value_name = "FILE")]
    pub cpuprofile: Option<PathBuf>,

    /// Write a memory profile to FILE
    #[arg(long, value_name = "FILE")]
    pub memprofile: Option<PathBuf>,
}

impl Cli {
    pub fn into_config(self) -> Config {
        Config {
            input: self.file,
            show_word_list: !self.no_word_list,
            show_summary: !self.no_summary,
            debug: self.debug,
            cpu_profile: self.cpuprofile,
            mem_profile: self.memprofile,
            ..Config::default()
        }
        .with_workers(self.workers)
    }
}
