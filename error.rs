use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WordFreqError>;

#[derive(Error, Debug)]
pub enum WordFreqError {
    #[error("error opening file {}: {source}", path.display())]
    OpenInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid input: {0}")]
    ReadInput(#[source] io::Error),

    #[error("invalid input: line {line} is longer than {limit} bytes")]
    LineTooLong { line: u64, limit: usize },

    #[error("could not write profile {}: {source}", path.display())]
    Profile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not start pipeline thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("pipeline failed: {0}")]
    PipelineFailed(&'static str),

    #[error("could not write output: {0}")]
    Output(#[source] io::Error),
}
