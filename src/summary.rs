//! Named-fact extraction from the full log: board, toolchain, memory usage,
//! output artifacts, build-step counters, failure state.

use crate::segment::parse_progress;
use crate::text::contains_ci;

#[derive(Debug, Default, Clone)]
pub struct BuildSummary {
    pub board: String,
    pub zephyr_version: String,
    pub toolchain: String,
    pub overlay: String,
    pub memory_flash: String,
    pub memory_ram: String,
    pub output_file: String,
    /// Highest step number seen in `[a/b]` progress lines.
    pub steps_seen: usize,
    /// Highest step total seen in `[a/b]` progress lines.
    pub steps_total: usize,
    pub build_failed: bool,
}

/// Scan every line for the first occurrence of each fact. Fields stay empty
/// when the log never mentions them.
pub fn extract_summary(lines: &[String]) -> BuildSummary {
    let mut s = BuildSummary::default();

    for line in lines {
        if s.board.is_empty()
            && let Some(rest) = after(line, "-- Board: ")
        {
            s.board = rest.to_string();
        }

        if s.zephyr_version.is_empty()
            && let Some(rest) = after(line, "-- Zephyr version: ")
        {
            s.zephyr_version = rest.split(' ').next().unwrap_or("").to_string();
        }

        if s.overlay.is_empty()
            && let Some(rest) = after(line, "-- Found devicetree overlay: ")
        {
            // Shorten to the project-relative part when possible.
            s.overlay = rest
                .find("boards/")
                .map_or(rest, |pos| &rest[pos..])
                .to_string();
        }

        if s.toolchain.is_empty()
            && let Some(rest) = after(line, "The C compiler identification is ")
        {
            s.toolchain = rest.to_string();
        }

        if s.memory_flash.is_empty()
            && !line.contains("Used Size")
            && let Some(rest) = after(line, "FLASH:")
        {
            s.memory_flash = rest.trim().to_string();
        }

        if s.memory_ram.is_empty()
            && !line.contains("Used Size")
            && let Some(rest) = after(line, "RAM:")
        {
            s.memory_ram = rest.trim().to_string();
        }

        if s.output_file.is_empty()
            && let Some(pos) = line.find("Wrote ")
            && line[pos..].contains(" bytes to ")
        {
            s.output_file = line[pos..].to_string();
        }

        if let Some((current, total)) = parse_progress(line) {
            s.steps_seen = s.steps_seen.max(current);
            s.steps_total = s.steps_total.max(total);
        }

        if contains_ci(line, "ninja: build stopped")
            || (line.contains("FAILED:") && !line.contains("FAILED: _"))
            || line.contains("FATAL ERROR:")
        {
            s.build_failed = true;
        }
    }

    s
}

/// The text following the first occurrence of `anchor`, if present.
fn after<'a>(line: &'a str, anchor: &str) -> Option<&'a str> {
    line.find(anchor).map(|pos| &line[pos + anchor.len()..])
}
