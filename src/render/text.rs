//! The line-oriented text digest.

use std::io::Write;

use super::{FREQ_TOP, Report, TAIL_LINES, skip_in_text};
use crate::segment::{SegType, is_blank, is_boilerplate, is_build_progress};

/// Write the text digest.
///
/// # Errors
///
/// Returns an error only when the underlying writer fails.
pub fn render<W: Write>(out: &mut W, report: &Report) -> std::io::Result<()> {
    let total_lines = report.lines.len();
    let output_lines = estimate_output_lines(report);
    let reduction = reduction_pct(total_lines, output_lines);

    let real_errors = report
        .budget_segments()
        .filter(|seg| !skip_in_text(seg, report) && seg.seg_type == SegType::Error)
        .count();

    writeln!(
        out,
        "[LOGPARSE] mode: {} | {} lines -> ~{} lines ({:.1}% reduction)",
        report.mode_name, total_lines, output_lines, reduction
    )?;
    writeln!(
        out,
        "[STATS] {} errors | {} warnings",
        real_errors, report.warning_blocks
    )?;
    writeln!(out)?;

    render_summary(out, report)?;
    render_frequency(out, report)?;
    render_segments(out, report)?;
    render_tail(out, report)?;

    Ok(())
}

/// Lines the segment loop will actually emit, plus the summary header
/// allowance. Drives the reduction figure in the header.
fn estimate_output_lines(report: &Report) -> usize {
    let mut count = 0;
    for seg in report.budget_segments() {
        if skip_in_text(seg, report) {
            continue;
        }
        count += seg
            .lines(report.lines)
            .iter()
            .filter(|line| !is_build_progress(line) && !is_boilerplate(line, report.mode))
            .count();
    }
    count + 6
}

fn reduction_pct(total: usize, output: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let pct = (1.0 - output as f64 / total as f64) * 100.0;
    pct.max(0.0)
}

fn render_summary<W: Write>(out: &mut W, report: &Report) -> std::io::Result<()> {
    let s = report.summary;

    if !s.board.is_empty() {
        write!(out, "  Board: {}", s.board)?;
        if !s.zephyr_version.is_empty() {
            write!(out, " | Zephyr {}", s.zephyr_version)?;
        }
        if !s.toolchain.is_empty() {
            write!(out, " | {}", s.toolchain)?;
        }
        writeln!(out)?;
    }
    if !s.overlay.is_empty() {
        writeln!(out, "  Overlay: {}", s.overlay)?;
    }
    if s.steps_total > 0 {
        if report.error_blocks > 0 || s.build_failed {
            writeln!(
                out,
                "  Build: FAILED at step {}/{}",
                s.steps_seen, s.steps_total
            )?;
        } else {
            writeln!(out, "  Build: {}/{} steps OK", s.steps_seen, s.steps_total)?;
        }
    }
    if !s.memory_flash.is_empty() {
        writeln!(out, "  FLASH: {}", s.memory_flash)?;
    }
    if !s.memory_ram.is_empty() {
        writeln!(out, "  RAM:   {}", s.memory_ram)?;
    }
    if !s.output_file.is_empty() {
        writeln!(out, "  Output: {}", s.output_file)?;
    }
    writeln!(out)?;
    Ok(())
}

fn render_frequency<W: Write>(out: &mut W, report: &Report) -> std::io::Result<()> {
    let sorted = report.dedup.sorted_by_frequency();
    let top = if report.raw_freq {
        sorted.len()
    } else {
        FREQ_TOP.min(sorted.len())
    };

    let mut shown = 0;
    for entry in &sorted[..top] {
        if entry.count < 3 && !report.raw_freq {
            continue;
        }
        if is_build_progress(&entry.original) || is_blank(&entry.original) {
            continue;
        }
        if is_decorative(&entry.original) {
            continue;
        }
        writeln!(out, "[FREQ x{}] {}", entry.count, entry.original)?;
        shown += 1;
    }
    if shown > 0 {
        writeln!(out)?;
    }
    Ok(())
}

/// Separator art: nothing but spaces, dashes, and asterisks.
fn is_decorative(line: &str) -> bool {
    line.chars().all(|c| c == ' ' || c == '-' || c == '*')
}

fn render_segments<W: Write>(out: &mut W, report: &Report) -> std::io::Result<()> {
    for seg in report.budget_segments() {
        if skip_in_text(seg, report) {
            continue;
        }

        writeln!(
            out,
            "[{}] lines {}-{}",
            seg.seg_type.name(),
            seg.start_line + 1,
            seg.end_line + 1
        )?;

        let diagnostic = seg.seg_type == SegType::Error || seg.seg_type == SegType::Warning;
        for (offset, line) in seg.lines(report.lines).iter().enumerate() {
            if is_build_progress(line) || is_boilerplate(line, report.mode) {
                continue;
            }
            if !diagnostic && is_blank(line) {
                continue;
            }

            let line_num = seg.start_line + offset;
            match report.dedup.lookup_original(line) {
                Some(entry) if entry.count > 1 => {
                    // Annotate the first occurrence, suppress the rest.
                    if line_num == entry.first_line {
                        writeln!(out, "  [x{}] {}", entry.count, line)?;
                    }
                }
                _ => writeln!(out, "  {line}")?,
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

fn render_tail<W: Write>(out: &mut W, report: &Report) -> std::io::Result<()> {
    if !report.show_tail || report.lines.len() <= TAIL_LINES {
        return Ok(());
    }
    let start = report.lines.len() - TAIL_LINES;
    writeln!(
        out,
        "[TAIL] last {} of {} lines",
        TAIL_LINES,
        report.lines.len()
    )?;
    for line in &report.lines[start..] {
        writeln!(out, "  {line}")?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::budget;
    use crate::dedup::DedupTable;
    use crate::score::score_all;
    use crate::segment::detect_segments;
    use crate::summary::extract_summary;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    fn render_to_string(input: &[String], raw_freq: bool) -> String {
        let mut dedup = DedupTable::with_capacity_hint(input.len() / 2 + 64);
        for (i, line) in input.iter().enumerate() {
            dedup.insert(line, i, &[]);
        }
        let mut segments = detect_segments(input, None);
        score_all(&mut segments, input, None, &[], &dedup);
        let packed = budget::pack(&segments, 3000, 200);
        let error_blocks = segments
            .iter()
            .filter(|s| s.seg_type == SegType::Error)
            .count();
        let warning_blocks = segments
            .iter()
            .filter(|s| s.seg_type == SegType::Warning)
            .count();
        let summary = extract_summary(input);

        let report = Report {
            mode_name: "generic",
            mode: None,
            lines: input,
            dedup: &dedup,
            segments: &segments,
            budget: &packed,
            error_blocks,
            warning_blocks,
            summary: &summary,
            raw_freq,
            show_tail: false,
        };
        let mut buf = Vec::new();
        render(&mut buf, &report).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn header_names_mode_and_counts() {
        let out = render_to_string(&lines(&["error: bad thing"]), false);
        assert!(out.starts_with("[LOGPARSE] mode: generic | 1 lines"));
        assert!(out.contains("[STATS] 1 errors | 0 warnings"));
    }

    #[test]
    fn repeated_warning_annotated_once() {
        let input = lines(&["warning: foo", "warning: foo", "warning: foo"]);
        let out = render_to_string(&input, false);
        assert!(out.contains("[warning] lines 1-3"));
        assert_eq!(out.matches("[x3] warning: foo").count(), 1);
        // The suppressed repeats must not appear bare.
        assert!(!out.contains("\n  warning: foo\n"));
        assert!(out.contains("[FREQ x3] warning: foo"));
    }

    #[test]
    fn progress_segments_are_omitted() {
        let input = lines(&[
            "[1/3] Building a",
            "error: bad thing",
            "[2/3] Building b",
            "[3/3] Building c",
        ]);
        let out = render_to_string(&input, false);
        assert!(out.contains("[error] lines 2-2"));
        assert!(out.contains("  error: bad thing"));
        assert!(!out.contains("Building a"));
        assert!(!out.contains("Building c"));
    }

    #[test]
    fn wrapper_errors_are_suppressed() {
        let input = lines(&[
            "ninja: build stopped: subcommand failed.",
            "",
            "error: real diagnostic",
        ]);
        let out = render_to_string(&input, false);
        assert!(out.contains("error: real diagnostic"));
        assert!(!out.contains("ninja: build stopped"));
        assert!(out.contains("[STATS] 1 errors"));
    }

    #[test]
    fn summary_block_renders_found_facts() {
        let input = lines(&[
            "-- Board: nrf52840dk/nrf52840",
            "",
            "error: boom",
        ]);
        let out = render_to_string(&input, false);
        assert!(out.contains("  Board: nrf52840dk/nrf52840"));
    }

    #[test]
    fn failed_build_reports_step() {
        let input = lines(&[
            "[7/100] Building broken.c",
            "",
            "error: boom",
            "",
            "ninja: build stopped: subcommand failed.",
        ]);
        let out = render_to_string(&input, false);
        assert!(out.contains("  Build: FAILED at step 7/100"));
    }

    #[test]
    fn low_scoring_chatter_is_cut() {
        let input = lines(&["nothing interesting here at all"]);
        let out = render_to_string(&input, false);
        assert!(!out.contains("nothing interesting here at all"));
    }

    #[test]
    fn tail_appears_only_for_long_logs() {
        let mut items: Vec<String> = (0..30).map(|i| format!("line number {i}")).collect();
        items.push(String::new());
        items.push("error: at the end".to_string());

        let mut dedup = DedupTable::new();
        for (i, line) in items.iter().enumerate() {
            dedup.insert(line, i, &[]);
        }
        let mut segments = detect_segments(&items, None);
        score_all(&mut segments, &items, None, &[], &dedup);
        // A tight budget keeps the filler block out; the error is mandatory.
        let packed = budget::pack(&segments, 30, 200);
        let summary = extract_summary(&items);
        let report = Report {
            mode_name: "generic",
            mode: None,
            lines: &items,
            dedup: &dedup,
            segments: &segments,
            budget: &packed,
            error_blocks: 1,
            warning_blocks: 0,
            summary: &summary,
            raw_freq: false,
            show_tail: true,
        };
        let mut buf = Vec::new();
        render(&mut buf, &report).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("[TAIL] last 20 of 32 lines"));
        assert!(out.contains("  line number 29"));
        assert!(out.contains("  error: at the end"));
        assert!(!out.contains("  line number 5\n"));
    }

    #[test]
    fn decorative_lines_never_reach_the_frequency_table() {
        let mut items = Vec::new();
        for _ in 0..5 {
            items.push("----------------");
        }
        items.push("error: x");
        let out = render_to_string(&lines(&items), false);
        assert!(!out.contains("[FREQ x5] ----"));
    }
}
