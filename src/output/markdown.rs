//! Markdown summary generation
//!
//! This module renders a crawl summary as a human-readable markdown report.

use crate::output::summary::CrawlSummary;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown rendering of `summary` to `output_path`
pub fn write_markdown_summary(summary: &CrawlSummary, output_path: &Path) -> std::io::Result<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl summary as markdown
pub fn format_markdown_summary(summary: &CrawlSummary) -> String {
    let mut md = String::new();

    md.push_str("# Weft Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", summary.started_at.to_rfc3339()));
    md.push_str(&format!("- **Finished**: {}\n", summary.finished_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {:.2} seconds\n",
        summary.elapsed.as_secs_f64()
    ));
    md.push_str(&format!("- **Stopped Because**: {}\n", summary.stop_reason));
    md.push_str(&format!("- **Workers**: {}\n", summary.workers));
    md.push_str(&format!("- **Config Hash**: {}\n\n", summary.config_hash));

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Pages Fetched**: {}\n", summary.pages_fetched));
    md.push_str(&format!("- **Pages Failed**: {}\n", summary.pages_failed));
    md.push_str(&format!(
        "- **Throughput**: {:.2} pages/sec\n",
        summary.pages_per_second()
    ));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n",
        summary.success_rate()
    ));
    md.push_str(&format!("- **Hosts Seen**: {}\n", summary.hosts));
    md.push_str(&format!("- **URLs Admitted**: {}\n", summary.visited));
    md.push_str(&format!(
        "- **Links Discovered**: {}\n\n",
        summary.links_discovered
    ));

    // Frontier breakdown
    let q = &summary.queue;
    md.push_str("## Frontier\n\n");
    md.push_str("| Counter | Value |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Queued | {} |\n", q.total_queued));
    md.push_str(&format!("| Dequeued | {} |\n", q.total_dequeued));
    md.push_str(&format!("| Dropped | {} |\n", q.dropped));
    md.push_str(&format!("| Discarded | {} |\n", q.discarded));
    md.push_str(&format!("| High tier | {} |\n", q.queued_high));
    md.push_str(&format!("| Normal tier | {} |\n", q.queued_normal));
    md.push_str(&format!("| Low tier | {} |\n\n", q.queued_low));

    // Error summary
    if !summary.failures_by_kind.is_empty() {
        md.push_str("## Error Summary\n\n");
        md.push_str("| Error Kind | Count |\n");
        md.push_str("|------------|-------|\n");

        for (kind, count) in &summary.failures_by_kind {
            md.push_str(&format!("| {} | {} |\n", kind, count));
        }
        md.push('\n');
    }

    // Sinks
    md.push_str("## Sinks\n\n");
    md.push_str(&format!("- **Delivered**: {}\n", summary.sinks.delivered));
    md.push_str(&format!("- **Store Errors**: {}\n", summary.sinks.failed));
    md.push_str(&format!("- **Dropped**: {}\n\n", summary.sinks.dropped));

    // Benchmark samples
    if !summary.benchmark.is_empty() {
        md.push_str("## Benchmark\n\n");
        md.push_str("| Time | Pages | Queued |\n");
        md.push_str("|------|-------|--------|\n");

        for sample in &summary.benchmark {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                sample.timestamp.format("%H:%M:%S%.3f"),
                sample.pages,
                sample.queued
            ));
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::benchmark::BenchmarkSample;
    use crate::output::summary::tests::sample_summary;
    use chrono::Utc;

    #[test]
    fn test_format_markdown_summary() {
        let markdown = format_markdown_summary(&sample_summary());

        assert!(markdown.contains("# Weft Crawl Summary"));
        assert!(markdown.contains("Run Information"));
        assert!(markdown.contains("- **Pages Fetched**: 20"));
        assert!(markdown.contains("- **Stopped Because**: page budget reached"));
        assert!(markdown.contains("| Discarded | 97 |"));
    }

    #[test]
    fn test_markdown_error_table() {
        let markdown = format_markdown_summary(&sample_summary());

        assert!(markdown.contains("## Error Summary"));
        assert!(markdown.contains("| http-404 | 3 |"));
        assert!(markdown.contains("| timeout | 1 |"));
    }

    #[test]
    fn test_markdown_benchmark_section_only_with_samples() {
        let mut summary = sample_summary();
        assert!(!format_markdown_summary(&summary).contains("## Benchmark"));

        summary.benchmark.push(BenchmarkSample {
            timestamp: Utc::now(),
            pages: 7,
            queued: 42,
        });
        let markdown = format_markdown_summary(&summary);
        assert!(markdown.contains("## Benchmark"));
        assert!(markdown.contains("| 7 | 42 |"));
    }

    #[test]
    fn test_write_markdown_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.md");

        write_markdown_summary(&sample_summary(), &path).unwrap();

        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.starts_with("# Weft Crawl Summary"));
    }
}
