//! Mode profiles: per-build-system configuration for detection,
//! normalization, segmentation, and scoring.

use std::path::Path;

use include_dir::{Dir, DirEntry, include_dir};
use regex::Regex;
use serde::Deserialize;

use crate::text::contains_ci;

/// Profiles shipped inside the binary, used when no modes directory exists
/// on disk.
static EMBEDDED_MODES: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/modes");

/// Number of head lines sniffed during auto-detection.
pub const SNIFF_LINES: usize = 50;

/// Mode name reported when no profile matches.
pub const GENERIC_MODE: &str = "generic";

/// On-disk TOML schema. Every section and key is optional; unknown keys are
/// ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModeFile {
    mode: MetaSection,
    detection: DetectionSection,
    dedup: DedupSection,
    segments: SegmentsSection,
    interest: InterestSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetaSection {
    name: String,
    description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DetectionSection {
    signatures: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DedupSection {
    strip_patterns: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SegmentsSection {
    phase_markers: Vec<String>,
    block_triggers: Vec<String>,
    boilerplate_patterns: Vec<String>,
    drop_contains: Vec<String>,
    keep_once_contains: Vec<String>,
    progress_pattern: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InterestSection {
    keywords: Vec<String>,
    error_patterns: Vec<String>,
    warning_patterns: Vec<String>,
}

/// A loaded, compiled mode profile. Read-only after load.
#[derive(Debug)]
pub struct Mode {
    pub name: String,
    pub description: String,
    pub signatures: Vec<String>,
    /// Compiled in file order; patterns that fail to compile are dropped.
    pub strip_patterns: Vec<Regex>,
    pub phase_markers: Vec<String>,
    pub block_triggers: Vec<String>,
    pub boilerplate_patterns: Vec<String>,
    pub drop_contains: Vec<String>,
    pub keep_once_contains: Vec<String>,
    pub keywords: Vec<String>,
    pub error_patterns: Vec<String>,
    pub warning_patterns: Vec<String>,
    pub progress_pattern: Option<Regex>,
}

impl From<ModeFile> for Mode {
    fn from(f: ModeFile) -> Self {
        let strip_patterns = f
            .dedup
            .strip_patterns
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        let progress_pattern = f
            .segments
            .progress_pattern
            .as_deref()
            .and_then(|p| Regex::new(p).ok());
        Self {
            name: f.mode.name,
            description: f.mode.description,
            signatures: f.detection.signatures,
            strip_patterns,
            phase_markers: f.segments.phase_markers,
            block_triggers: f.segments.block_triggers,
            boilerplate_patterns: f.segments.boilerplate_patterns,
            drop_contains: f.segments.drop_contains,
            keep_once_contains: f.segments.keep_once_contains,
            keywords: f.interest.keywords,
            error_patterns: f.interest.error_patterns,
            warning_patterns: f.interest.warning_patterns,
            progress_pattern,
        }
    }
}

/// Parse a mode profile from TOML text.
///
/// # Errors
///
/// Returns an error when the text is not valid TOML.
pub fn parse_mode(content: &str) -> anyhow::Result<Mode> {
    let file: ModeFile = toml::from_str(content)?;
    Ok(file.into())
}

/// Load a single mode profile from disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_mode(path: &Path) -> anyhow::Result<Mode> {
    use anyhow::Context;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read mode file: {}", path.display()))?;
    parse_mode(&content)
        .with_context(|| format!("failed to parse mode file: {}", path.display()))
}

/// Load every `.toml` profile in `dir`, sorted by file name. Malformed files
/// are skipped.
pub fn load_mode_dir(dir: &Path) -> Vec<Mode> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<_> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();
    paths.iter().filter_map(|p| load_mode(p).ok()).collect()
}

/// The profiles compiled into the binary, sorted by file name.
pub fn embedded_modes() -> Vec<Mode> {
    let Ok(entries) = EMBEDDED_MODES.find("*.toml") else {
        return Vec::new();
    };
    let mut files: Vec<_> = entries
        .filter_map(|entry| match entry {
            DirEntry::File(file) => Some(file),
            DirEntry::Dir(_) => None,
        })
        .collect();
    files.sort_by(|a, b| a.path().cmp(b.path()));
    files
        .iter()
        .filter_map(|f| f.contents_utf8())
        .filter_map(|content| parse_mode(content).ok())
        .collect()
}

/// Load the active mode set: the first modes directory found on disk, or the
/// embedded defaults when none exists.
pub fn load_modes() -> Vec<Mode> {
    crate::paths::modes_dir().map_or_else(embedded_modes, |dir| load_mode_dir(&dir))
}

/// Sniff the head of the input against every profile's signatures.
///
/// Scores one point per `(line, signature)` substring hit (case-sensitive);
/// the first-loaded profile wins ties, and `None` means nothing scored.
pub fn detect<'m>(first_lines: &[String], modes: &'m [Mode]) -> Option<&'m Mode> {
    let mut best: Option<&Mode> = None;
    let mut best_score = 0usize;
    for mode in modes {
        if mode.signatures.is_empty() {
            continue;
        }
        let score = first_lines
            .iter()
            .map(|line| {
                mode.signatures
                    .iter()
                    .filter(|sig| line.contains(sig.as_str()))
                    .count()
            })
            .sum();
        if score > best_score {
            best_score = score;
            best = Some(mode);
        }
    }
    best
}

/// Find a loaded mode by name.
pub fn find<'m>(modes: &'m [Mode], name: &str) -> Option<&'m Mode> {
    modes.iter().find(|m| m.name == name)
}

/// True when the line matches any phase marker (case-sensitive).
pub fn is_phase_marker(line: &str, mode: Option<&Mode>) -> bool {
    mode.is_some_and(|m| m.phase_markers.iter().any(|p| line.contains(p.as_str())))
}

/// True when the line matches any block trigger (case-insensitive).
pub fn is_block_trigger(line: &str, mode: Option<&Mode>) -> bool {
    mode.is_some_and(|m| m.block_triggers.iter().any(|t| contains_ci(line, t)))
}
