//! Model-token estimation (~4 chars/token, adjusted for whitespace).

/// Estimate the model-token cost of a single line.
///
/// Blends a content-based count (~4 non-whitespace bytes per token) with the
/// raw byte length so whitespace-heavy lines get discounted: 70% content,
/// 30% raw length.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    let len = text.len();
    let non_ws = text.bytes().filter(|b| !b.is_ascii_whitespace()).count();
    let base = len.div_ceil(4);
    let content = non_ws.div_ceil(4);
    (content * 7 + base * 3 + 5) / 10
}

/// Estimate the total token cost of a block of lines, charging one extra
/// token per line for the newline.
pub fn estimate_tokens_lines<S: AsRef<str>>(lines: &[S]) -> usize {
    lines
        .iter()
        .map(|l| estimate_tokens(l.as_ref()) + 1)
        .sum()
}
