//! Output module for sinks and crawl reports
//!
//! This module handles:
//! - Non-blocking handoff of fetched pages to archive sinks
//! - Recording periodic throughput samples
//! - Building, printing, and exporting the end-of-session summary

mod benchmark;
mod dispatch;
mod markdown;
mod summary;

pub use benchmark::{BenchmarkRecorder, BenchmarkSample};
pub use dispatch::{SinkDispatcher, SinkError, SinkHandle, SinkReport};
pub use markdown::{format_markdown_summary, write_markdown_summary};
pub use summary::{print_summary, CrawlSummary};
