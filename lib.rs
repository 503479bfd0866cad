//! Word frequency counting over a fan-out/fan-in thread pipeline.

pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod observer;
pub mod pipeline;
pub mod profile;
pub mod report;

pub use config::Config;
pub use driver::{Report, count_reader, count_source, run};
pub use error::{Result, WordFreqError};
pub use pipeline::{FrequencyMap, Pipeline, WordCounts};
