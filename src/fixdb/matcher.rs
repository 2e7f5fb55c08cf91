//! Fuzzy matching of error text against the knowledge base.

use regex::Regex;

use super::Fix;
use crate::text::contains_ci;

/// Default confidence cutoff for reported matches.
pub const MIN_CONFIDENCE: f32 = 0.3;

const REGEX_CONFIDENCE: f32 = 0.9;
const SUBSTRING_CONFIDENCE: f32 = 0.85;

/// A fix with the confidence it matched at.
#[derive(Debug)]
pub struct FixMatch<'a> {
    pub fix: &'a Fix,
    pub confidence: f32,
}

/// Normalize text for similarity comparison: lowercase, elide filesystem
/// paths and hex literals, collapse digit runs to `#`.
pub fn normalize_for_match(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_path = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_path {
            if c == ' ' || c == ':' || c == '\n' {
                in_path = false;
                // The terminator itself is kept.
            } else {
                i += 1;
                continue;
            }
        }
        if (c == '/' || c == '\\') && i + 1 < chars.len() && chars[i + 1] != ' ' {
            in_path = true;
            i += 1;
            continue;
        }
        if c == '0' && i + 1 < chars.len() && chars[i + 1] == 'x' {
            i += 2;
            while i < chars.len() && chars[i].is_ascii_hexdigit() {
                i += 1;
            }
            out.push(' ');
            continue;
        }
        if c.is_ascii_digit() {
            while i + 1 < chars.len() && chars[i + 1].is_ascii_digit() {
                i += 1;
            }
            out.push('#');
            i += 1;
            continue;
        }
        out.push(c.to_ascii_lowercase());
        i += 1;
    }

    out
}

/// Longest common substring length (contiguous — not the subsequence DP),
/// computed with two rolling rows in O(|b|) space.
pub fn lcs_length(a: &[u8], b: &[u8]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    let mut best = 0;

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            if a[i - 1] == b[j - 1] {
                curr[j] = prev[j - 1] + 1;
                best = best.max(curr[j]);
            } else {
                curr[j] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    best
}

fn confidence_for(error_text: &str, norm_error: &str, fix: &Fix) -> f32 {
    let mut conf = 0.0f32;

    if let Some(pattern) = fix.regex.as_deref().filter(|r| !r.is_empty())
        && let Ok(re) = Regex::new(pattern)
        && re.is_match(error_text)
    {
        conf = REGEX_CONFIDENCE;
    }

    if conf < 0.5 && !fix.pattern.is_empty() {
        if contains_ci(error_text, &fix.pattern) {
            conf = SUBSTRING_CONFIDENCE;
        } else {
            let norm_pattern = normalize_for_match(&fix.pattern);
            let max_len = norm_error.len().max(norm_pattern.len());
            if max_len > 0 {
                let lcs = lcs_length(norm_error.as_bytes(), norm_pattern.as_bytes());
                let fuzzy = lcs as f32 / max_len as f32;
                conf = conf.max(fuzzy);
            }
        }
    }

    conf
}

/// Match `error_text` against every fix, returning matches at or above
/// `min_confidence` sorted by confidence descending (stable for ties).
pub fn match_fixes<'a>(
    error_text: &str,
    fixes: &'a [Fix],
    min_confidence: f32,
) -> Vec<FixMatch<'a>> {
    if error_text.is_empty() || fixes.is_empty() {
        return Vec::new();
    }
    let norm_error = normalize_for_match(error_text);

    let mut matches: Vec<FixMatch<'a>> = fixes
        .iter()
        .map(|fix| FixMatch {
            fix,
            confidence: confidence_for(error_text, &norm_error, fix),
        })
        .filter(|m| m.confidence >= min_confidence)
        .collect();

    matches.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    matches
}
