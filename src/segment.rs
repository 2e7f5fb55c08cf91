//! Block detection: partitions the line stream into typed segments.

use crate::mode::{Mode, is_block_trigger, is_phase_marker};
use crate::text::contains_ci;
use crate::token::estimate_tokens_lines;

/// Segment types. Declaration order drives the promotion comparison in the
/// segmenter (`Error` sorts first and upgrades anything).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SegType {
    Error,
    Warning,
    Info,
    /// Tabular data: memory maps, test summaries.
    Data,
    /// Phase boundary marker.
    Phase,
    /// Build step lines: `[N/M] Building ...`
    BuildProgress,
    /// Configure-time chatter with zero diagnostic value.
    Boilerplate,
    Normal,
}

impl SegType {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Data => "data",
            Self::Phase => "phase",
            Self::BuildProgress => "build",
            Self::Boilerplate => "boilerplate",
            Self::Normal => "block",
        }
    }
}

/// A contiguous block of non-blank lines. Line range is inclusive and
/// zero-based; only `score` mutates after detection.
#[derive(Debug, Clone)]
pub struct Segment {
    pub start_line: usize,
    pub end_line: usize,
    pub seg_type: SegType,
    pub label: String,
    pub line_count: usize,
    pub token_count: usize,
    pub score: f32,
}

impl Segment {
    /// The slice of input lines this segment covers.
    pub fn lines<'a>(&self, lines: &'a [String]) -> &'a [String] {
        &lines[self.start_line..=self.end_line]
    }
}

/// What the renderer does with an individual line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFate {
    /// Emit verbatim (errors, warnings, diagnostics).
    Keep,
    /// Emit once in the summary, suppress elsewhere.
    KeepOnce,
    /// Silently elide.
    Drop,
}

pub fn is_blank(line: &str) -> bool {
    line.bytes().all(|b| b.is_ascii_whitespace())
}

/// Leading whitespace width; a tab counts as 4 spaces.
pub fn indent_level(line: &str) -> i32 {
    let mut level = 0;
    for ch in line.chars() {
        match ch {
            ' ' => level += 1,
            '\t' => level += 4,
            _ => break,
        }
    }
    level
}

/// A build progress line: optional leading whitespace, then `[N/M]`.
pub fn is_build_progress(line: &str) -> bool {
    parse_progress(line).is_some()
}

/// Parse the `[N/M]` prefix of a build progress line.
pub fn parse_progress(line: &str) -> Option<(usize, usize)> {
    let rest = line.trim_start().strip_prefix('[')?;
    let (current, rest) = take_digits(rest)?;
    let rest = rest.strip_prefix('/')?;
    let (total, rest) = take_digits(rest)?;
    rest.strip_prefix(']')?;
    Some((current, total))
}

fn take_digits(s: &str) -> Option<(usize, &str)> {
    let end = s.bytes().take_while(u8::is_ascii_digit).count();
    if end == 0 {
        return None;
    }
    let value = s[..end].parse().ok()?;
    Some((value, &s[end..]))
}

/// Progress test that also honors the mode's `progress_pattern`, when set.
fn is_progress(line: &str, mode: Option<&Mode>) -> bool {
    if is_build_progress(line) {
        return true;
    }
    mode.and_then(|m| m.progress_pattern.as_ref())
        .is_some_and(|re| re.is_match(line))
}

/// True when the line matches any profile boilerplate pattern.
pub fn is_boilerplate(line: &str, mode: Option<&Mode>) -> bool {
    mode.is_some_and(|m| {
        m.boilerplate_patterns
            .iter()
            .any(|p| line.contains(p.as_str()))
    })
}

const COMPILER_COMMAND_MIN_LEN: usize = 300;
const COMPILER_EXECUTABLES: [&str; 6] = ["gcc", "g++", "clang", "cl.exe", "ld.exe", "armlink"];
const COMPILER_FLAG_MARKERS: [&str; 6] = [" -D", " -I", " -f", " -W", " /D", " /I"];

/// A long compiler/linker invocation line — high length, a known compiler
/// executable, and at least one flag marker.
pub fn is_compiler_command(line: &str) -> bool {
    line.len() >= COMPILER_COMMAND_MIN_LEN
        && COMPILER_EXECUTABLES.iter().any(|c| line.contains(c))
        && COMPILER_FLAG_MARKERS.iter().any(|f| line.contains(f))
}

/// Line-level classification: mode error patterns, mode warning patterns,
/// then the generic sentinels. All matches are case-insensitive substrings.
pub fn classify_line(line: &str, mode: Option<&Mode>) -> SegType {
    if let Some(m) = mode {
        if m.error_patterns.iter().any(|p| contains_ci(line, p)) {
            return SegType::Error;
        }
        if m.warning_patterns.iter().any(|p| contains_ci(line, p)) {
            return SegType::Warning;
        }
    }
    if contains_ci(line, "error:")
        || contains_ci(line, "fatal:")
        || contains_ci(line, "FAILED")
        || contains_ci(line, "undefined reference")
    {
        return SegType::Error;
    }
    if contains_ci(line, "warning:") {
        return SegType::Warning;
    }
    SegType::Normal
}

/// Decide whether a line survives to output.
pub fn line_fate(line: &str, mode: Option<&Mode>) -> LineFate {
    if is_blank(line) {
        return LineFate::Drop;
    }
    if classify_line(line, mode) != SegType::Normal {
        return LineFate::Keep;
    }
    if let Some(m) = mode {
        if m.drop_contains.iter().any(|p| line.contains(p.as_str())) {
            return LineFate::Drop;
        }
        if is_boilerplate(line, mode) {
            return LineFate::Drop;
        }
        if m.keep_once_contains.iter().any(|p| line.contains(p.as_str())) {
            return LineFate::KeepOnce;
        }
    }
    if is_progress(line, mode) {
        return LineFate::Drop;
    }
    if is_compiler_command(line) {
        return LineFate::Drop;
    }
    LineFate::Keep
}

/// Tabular data: at least three lines, and the first five contain rows with
/// two or more whitespace-separated column transitions.
pub fn is_tabular(lines: &[String]) -> bool {
    if lines.len() < 3 {
        return false;
    }
    let mut max_cols = 0;
    for line in lines.iter().take(5) {
        let mut ncols = 0;
        let mut in_space = false;
        for (pos, ch) in line.chars().enumerate() {
            if ch == ' ' || ch == '\t' {
                if !in_space && pos > 0 {
                    in_space = true;
                }
            } else if in_space {
                ncols += 1;
                in_space = false;
            }
        }
        max_cols = max_cols.max(ncols);
    }
    max_cols >= 2
}

/// Walk the line stream once and produce non-overlapping segments covering
/// every non-blank line.
pub fn detect_segments(lines: &[String], mode: Option<&Mode>) -> Vec<Segment> {
    let mut segments = Vec::new();
    let count = lines.len();
    let mut i = 0;

    while i < count {
        if is_blank(&lines[i]) {
            i += 1;
            continue;
        }

        let seg_start = i;
        let mut seg_type = SegType::Normal;
        let base_indent = indent_level(&lines[i]);
        let mut saw_error = false;

        if is_phase_marker(&lines[i], mode) {
            seg_type = SegType::Phase;
        }
        let first_progress = is_progress(&lines[i], mode);
        let first_type = classify_line(&lines[i], mode);
        if first_type == SegType::Error {
            seg_type = SegType::Error;
            saw_error = true;
        } else if first_type > seg_type {
            seg_type = first_type;
        }
        if first_progress && seg_type == SegType::Normal {
            seg_type = SegType::BuildProgress;
        }
        i += 1;

        while i < count {
            if is_blank(&lines[i]) {
                break;
            }
            if is_phase_marker(&lines[i], mode) && i > seg_start {
                break;
            }
            if indent_level(&lines[i]) < base_indent - 2 && i > seg_start + 1 {
                break;
            }

            let line_type = classify_line(&lines[i], mode);
            let progress = is_progress(&lines[i], mode);

            // Trailing build progress after an error belongs to a new block.
            if saw_error && progress && line_type == SegType::Normal {
                break;
            }
            // A progress run ends where a real error begins.
            if seg_type == SegType::BuildProgress && !progress && line_type == SegType::Error {
                break;
            }

            if line_type == SegType::Error {
                seg_type = SegType::Error;
                saw_error = true;
            } else if line_type == SegType::Warning && seg_type == SegType::Normal {
                seg_type = SegType::Warning;
            }

            if is_block_trigger(&lines[i], mode) && i > seg_start + 2 && seg_type == SegType::Normal
            {
                break;
            }
            i += 1;
        }

        let slice = &lines[seg_start..i];
        post_classify(slice, mode, &mut seg_type);

        segments.push(Segment {
            start_line: seg_start,
            end_line: i - 1,
            seg_type,
            label: seg_type.name().to_string(),
            line_count: slice.len(),
            token_count: estimate_tokens_lines(slice),
            score: 0.0,
        });
    }

    segments
}

/// Majority re-classification for blocks the line walk left untyped.
fn post_classify(slice: &[String], mode: Option<&Mode>, seg_type: &mut SegType) {
    if *seg_type != SegType::Normal && *seg_type != SegType::Data {
        return;
    }
    let n = slice.len();
    let boilerplate = slice.iter().filter(|l| is_boilerplate(l, mode)).count();
    if boilerplate * 2 >= n && *seg_type != SegType::Error {
        *seg_type = SegType::Boilerplate;
        return;
    }
    let progress = slice.iter().filter(|l| is_progress(l, mode)).count();
    if progress * 2 >= n && *seg_type == SegType::Normal {
        *seg_type = SegType::BuildProgress;
        return;
    }
    if is_tabular(slice) && *seg_type == SegType::Normal {
        *seg_type = SegType::Data;
    }
}
