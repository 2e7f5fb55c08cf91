//! Digest rendering: text and JSON back-ends over the shared pipeline
//! output.

pub mod json;
pub mod text;

use crate::budget::BudgetResult;
use crate::dedup::DedupTable;
use crate::mode::Mode;
use crate::segment::{SegType, Segment};
use crate::summary::BuildSummary;

/// Default number of frequency entries shown.
pub const FREQ_TOP: usize = 10;

/// Number of log-tail lines appended to the text digest.
pub const TAIL_LINES: usize = 20;

/// Non-diagnostic segments below this score are not worth their tokens.
const MIN_SEGMENT_SCORE: f32 = 3.0;

/// Build-system wrapper noise: an error segment made only of these carries
/// no compiler diagnostic.
const WRAPPER_MARKERS: [&str; 6] = [
    "ninja: build stopped",
    "FATAL ERROR:",
    "_sysbuild/sysbuild/images/",
    "cmd.exe /C",
    "cmake.exe --build",
    "cmake.EXE",
];

/// Content already captured by the build summary; segments holding nothing
/// else are redundant.
const SUMMARIZED_MARKERS: [&str; 9] = [
    "FLASH:",
    "RAM:",
    "IDT_LIST:",
    "Used Size",
    "Memory region",
    "Wrote ",
    "Converted to uf2",
    "Generating files from",
    "merged.hex",
];

/// Everything the back-ends need, computed once by the caller.
pub struct Report<'a> {
    pub mode_name: &'a str,
    pub mode: Option<&'a Mode>,
    pub lines: &'a [String],
    pub dedup: &'a DedupTable,
    pub segments: &'a [Segment],
    pub budget: &'a BudgetResult,
    /// Total ERROR segments (wrapper noise included).
    pub error_blocks: usize,
    pub warning_blocks: usize,
    pub summary: &'a BuildSummary,
    pub raw_freq: bool,
    pub show_tail: bool,
}

impl Report<'_> {
    fn budget_segments(&self) -> impl Iterator<Item = &Segment> {
        self.budget.indices.iter().map(|&i| &self.segments[i])
    }
}

/// An error segment whose every line is build-system wrapper scaffolding.
pub(crate) fn is_wrapper_error(seg: &Segment, lines: &[String]) -> bool {
    seg.seg_type == SegType::Error
        && seg
            .lines(lines)
            .iter()
            .all(|line| WRAPPER_MARKERS.iter().any(|m| line.contains(m)))
}

/// True when every content line of the segment duplicates summarized
/// material or boilerplate.
pub(crate) fn all_lines_summarized(seg: &Segment, report: &Report) -> bool {
    seg.lines(report.lines).iter().all(|line| {
        crate::segment::is_blank(line)
            || crate::segment::is_boilerplate(line, report.mode)
            || crate::segment::is_build_progress(line)
            || SUMMARIZED_MARKERS.iter().any(|m| line.contains(m))
    })
}

/// Shared skip rule for emitting a packed segment.
pub(crate) fn skip_in_text(seg: &Segment, report: &Report) -> bool {
    if seg.seg_type == SegType::BuildProgress || seg.seg_type == SegType::Boilerplate {
        return true;
    }
    if is_wrapper_error(seg, report.lines) {
        return true;
    }
    if seg.seg_type != SegType::Error && seg.seg_type != SegType::Warning {
        if seg.score < MIN_SEGMENT_SCORE {
            return true;
        }
        if all_lines_summarized(seg, report) {
            return true;
        }
    }
    false
}
