//! The fix knowledge base: flat YAML files mapping error patterns to known
//! remedies.
//!
//! Only the narrow YAML subset these files use is parsed: `key: value`
//! scalars (quoted or bare), `key: |` block scalars, `[a, b]` flow
//! sequences, comments, and `---` separators.

pub mod matcher;

use std::path::{Path, PathBuf};

use anyhow::Context;

/// One knowledge-base entry. `pattern`, `tags`, and `fix_text` are required
/// for a valid entry; validation is separate from parsing so `--validate`
/// can report incomplete files instead of dropping them silently.
#[derive(Debug, Default, Clone)]
pub struct Fix {
    /// Short substring that identifies the error.
    pub pattern: String,
    /// Optional regex for precise matching.
    pub regex: Option<String>,
    pub tags: Vec<String>,
    pub fix_text: String,
    /// When/why this was encountered.
    pub context: Option<String>,
    pub severity: Option<String>,
    /// Date the fix was confirmed, `YYYY-MM-DD`.
    pub resolved: Option<String>,
    pub commit_ref: Option<String>,
    /// Where this entry was loaded from.
    pub source_path: Option<PathBuf>,
}

impl Fix {
    /// Check the required fields.
    ///
    /// # Errors
    ///
    /// Returns the name of the first missing required field.
    pub fn validate(&self) -> Result<(), String> {
        if self.pattern.is_empty() {
            return Err("missing required field: pattern".to_string());
        }
        if self.tags.is_empty() {
            return Err("missing required field: tags".to_string());
        }
        if self.fix_text.is_empty() {
            return Err("missing required field: fix".to_string());
        }
        Ok(())
    }
}

/// Parse a fix entry from YAML text. Unknown keys are ignored; repeated keys
/// overwrite (so `---`-separated fragments merge into one entry).
pub fn parse_fix(text: &str) -> Fix {
    let mut fix = Fix::default();
    let lines: Vec<&str> = text.lines().collect();
    let mut i = 0;

    while i < lines.len() {
        let raw = lines[i];
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("---") {
            i += 1;
            continue;
        }
        let Some(colon) = raw.find(':') else {
            i += 1;
            continue;
        };
        let key = raw[..colon].trim();
        let rest = raw[colon + 1..].trim();

        if rest == "|" {
            let (block, next) = read_block_scalar(&lines, i + 1);
            match key {
                "fix" => fix.fix_text = block,
                "context" => fix.context = Some(block),
                _ => {}
            }
            i = next;
            continue;
        }

        if rest.starts_with('[') {
            if key == "tags" {
                fix.tags = parse_flow_sequence(rest);
            }
            i += 1;
            continue;
        }

        let value = parse_scalar(rest);
        match key {
            "pattern" => fix.pattern = value,
            "regex" => fix.regex = non_empty(value),
            "fix" => fix.fix_text = value,
            "context" => fix.context = non_empty(value),
            "severity" => fix.severity = non_empty(value),
            "resolved" => fix.resolved = non_empty(value),
            "commit_ref" => fix.commit_ref = non_empty(value),
            _ => {}
        }
        i += 1;
    }

    fix
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

/// A scalar: quoted (surrounding quotes removed, `\"` and `\\` unescaped) or
/// bare (cut at an inline comment, trimmed).
fn parse_scalar(rest: &str) -> String {
    if let Some(stripped) = rest.strip_prefix('"') {
        let body = stripped.strip_suffix('"').unwrap_or(stripped);
        return body.replace("\\\"", "\"").replace("\\\\", "\\");
    }
    let cut = rest.find('#').map_or(rest, |pos| &rest[..pos]);
    cut.trim().to_string()
}

/// `[a, b, c]` — single-line flow sequence, items trimmed and unquoted.
fn parse_flow_sequence(rest: &str) -> Vec<String> {
    let inner = rest
        .trim_start_matches('[')
        .trim_end_matches(']');
    inner
        .split(',')
        .map(|item| item.trim().trim_matches('"').to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Consume a `|` block scalar starting at `lines[start]`. The indentation of
/// the first non-blank content line sets the base; a dedent below it (or a
/// top-level key) ends the block. Returns the joined content and the index
/// of the first line after the block.
fn read_block_scalar(lines: &[&str], start: usize) -> (String, usize) {
    let base_indent = lines
        .get(start..)
        .into_iter()
        .flatten()
        .find(|l| !l.trim().is_empty())
        .map_or(0, |l| leading_spaces(l));

    let mut content: Vec<String> = Vec::new();
    let mut i = start;
    while i < lines.len() {
        let line = lines[i];
        if line.trim().is_empty() {
            content.push(String::new());
            i += 1;
            continue;
        }
        let indent = leading_spaces(line);
        if indent < base_indent || indent == 0 {
            break;
        }
        content.push(line.trim_start().to_string());
        i += 1;
    }
    while content.last().is_some_and(String::is_empty) {
        content.pop();
    }
    (content.join("\n"), i)
}

fn leading_spaces(line: &str) -> usize {
    line.bytes().take_while(|&b| b == b' ').count()
}

/// Load a fix entry from disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn load_fix(path: &Path) -> anyhow::Result<Fix> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read fix file: {}", path.display()))?;
    let mut fix = parse_fix(&content);
    fix.source_path = Some(path.to_path_buf());
    Ok(fix)
}

/// Recursively load every `.yaml` file under `dir`, sorted by path.
/// Unreadable files are skipped.
pub fn load_fix_dir(dir: &Path) -> Vec<Fix> {
    let mut paths = Vec::new();
    collect_yaml_files(dir, &mut paths);
    paths.sort();
    paths.iter().filter_map(|p| load_fix(p).ok()).collect()
}

fn collect_yaml_files(dir: &Path, paths: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        if path.is_dir() {
            collect_yaml_files(&path, paths);
        } else if path.extension().is_some_and(|ext| ext == "yaml") {
            paths.push(path);
        }
    }
}

/// Load the full knowledge base: the local fixes directory (if any) merged
/// with the machine-global one.
pub fn load_all_fixes() -> Vec<Fix> {
    let mut fixes = Vec::new();
    let local = crate::paths::fixes_dir();
    if let Some(dir) = &local {
        fixes.extend(load_fix_dir(dir));
    }
    if let Some(global) = crate::paths::global_fixes_dir()
        && local.as_deref() != Some(global.as_path())
    {
        fixes.extend(load_fix_dir(&global));
    }
    fixes
}

/// Write a fix entry as YAML, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error on any I/O failure.
pub fn write_fix(path: &Path, fix: &Fix) -> std::io::Result<()> {
    use std::fmt::Write as _;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut out = String::new();
    let _ = writeln!(out, "pattern: \"{}\"", fix.pattern);
    if let Some(regex) = &fix.regex {
        let _ = writeln!(out, "regex: \"{regex}\"");
    }
    if !fix.tags.is_empty() {
        let _ = writeln!(out, "tags: [{}]", fix.tags.join(", "));
    }
    if !fix.fix_text.is_empty() {
        out.push_str("fix: |\n");
        for line in fix.fix_text.lines() {
            let _ = writeln!(out, "  {line}");
        }
    }
    if let Some(context) = &fix.context {
        let _ = writeln!(out, "context: \"{context}\"");
    }
    if let Some(resolved) = &fix.resolved {
        let _ = writeln!(out, "resolved: {resolved}");
    }
    if let Some(commit_ref) = &fix.commit_ref {
        let _ = writeln!(out, "commit_ref: \"{commit_ref}\"");
    }
    if let Some(severity) = &fix.severity {
        let _ = writeln!(out, "severity: {severity}");
    }

    std::fs::write(path, out)
}

/// Slug for a new fix file name: lowercase alphanumerics, runs of anything
/// else collapsed to single dashes.
pub fn slugify(pattern: &str) -> String {
    let mut slug = String::new();
    for ch in pattern.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
        if slug.len() >= 58 {
            break;
        }
    }
    slug.trim_end_matches('-').to_string()
}
