//! The machine-readable digest.

use std::io::Write;

use serde::Serialize;

use super::{FREQ_TOP, Report};
use crate::segment::SegType;

#[derive(Serialize)]
struct JsonReport<'a> {
    mode: &'a str,
    total_lines: usize,
    compressed_lines: usize,
    reduction_pct: f64,
    error_blocks: usize,
    warning_blocks: usize,
    summary: JsonSummary<'a>,
    frequency: Vec<JsonFrequency<'a>>,
    segments: Vec<JsonSegment<'a>>,
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    board: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    zephyr_version: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flash: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ram: Option<&'a str>,
    build_steps: usize,
    build_failed: bool,
}

#[derive(Serialize)]
struct JsonFrequency<'a> {
    count: usize,
    line: &'a str,
}

#[derive(Serialize)]
struct JsonSegment<'a> {
    #[serde(rename = "type")]
    seg_type: &'static str,
    /// One-based, inclusive.
    start_line: usize,
    end_line: usize,
    score: f64,
    lines: &'a [String],
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

/// Write the digest as pretty-printed JSON (RFC 8259).
///
/// # Errors
///
/// Returns an error when serialization or the underlying writer fails.
pub fn render<W: Write>(out: &mut W, report: &Report) -> anyhow::Result<()> {
    let total_lines = report.lines.len();
    let compressed_lines: usize = report.budget_segments().map(|seg| seg.line_count).sum();

    #[allow(clippy::cast_precision_loss)]
    let reduction_pct = if total_lines == 0 {
        0.0
    } else {
        (1.0 - compressed_lines as f64 / total_lines as f64) * 100.0
    };

    let sorted = report.dedup.sorted_by_frequency();
    let top = if report.raw_freq {
        sorted.len()
    } else {
        FREQ_TOP.min(sorted.len())
    };
    let frequency: Vec<JsonFrequency> = sorted[..top]
        .iter()
        .filter(|entry| entry.count > 1 || report.raw_freq)
        .map(|entry| JsonFrequency {
            count: entry.count,
            line: &entry.original,
        })
        .collect();

    let segments: Vec<JsonSegment> = report
        .budget_segments()
        .filter(|seg| {
            seg.seg_type != SegType::Boilerplate && seg.seg_type != SegType::BuildProgress
        })
        .map(|seg| JsonSegment {
            seg_type: seg.seg_type.name(),
            start_line: seg.start_line + 1,
            end_line: seg.end_line + 1,
            score: round1(f64::from(seg.score)),
            lines: seg.lines(report.lines),
        })
        .collect();

    let doc = JsonReport {
        mode: report.mode_name,
        total_lines,
        compressed_lines,
        reduction_pct: round1(reduction_pct),
        error_blocks: report.error_blocks,
        warning_blocks: report.warning_blocks,
        summary: JsonSummary {
            board: non_empty(&report.summary.board),
            zephyr_version: non_empty(&report.summary.zephyr_version),
            flash: non_empty(&report.summary.memory_flash),
            ram: non_empty(&report.summary.memory_ram),
            build_steps: report.summary.steps_total,
            build_failed: report.summary.build_failed,
        },
        frequency,
        segments,
    };

    serde_json::to_writer_pretty(&mut *out, &doc)?;
    writeln!(out)?;
    Ok(())
}
