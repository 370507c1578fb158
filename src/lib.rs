//! Consolidates per-node security benchmark results into one deterministic cluster report.

pub mod config;
pub mod summarize;
pub mod utils;

pub use config::{ReportEncoding, SummarizerConfig};
pub use summarize::report::Report;
pub use summarize::{run_inspect, run_summarize, run_translate, Summarizer};
pub use utils::{CheckState, ObservedState, Result, Role, SummarizerError};
