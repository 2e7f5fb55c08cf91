//! Buffered line reading for log input.

use std::io::{BufRead, Read};
use std::path::Path;

/// Read every line from `reader`, stripping `\n` / `\r\n` terminators.
/// Invalid UTF-8 is replaced rather than rejected — build logs are not
/// always clean.
///
/// # Errors
///
/// Returns an error if the underlying reader fails.
pub fn read_lines<R: Read>(reader: R) -> std::io::Result<Vec<String>> {
    let mut buf_reader = std::io::BufReader::new(reader);
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = buf_reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            break;
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        lines.push(String::from_utf8_lossy(&buf).into_owned());
    }
    Ok(lines)
}

/// Read the whole input from a file, or stdin when no path is given.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn load_input(path: Option<&Path>) -> std::io::Result<Vec<String>> {
    match path {
        Some(p) => read_lines(std::fs::File::open(p)?),
        None => read_lines(std::io::stdin().lock()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::read_lines;

    #[test]
    fn splits_lf_and_crlf() {
        let data = b"one\r\ntwo\nthree";
        let lines = read_lines(&data[..]).unwrap();
        assert_eq!(lines, ["one", "two", "three"]);
    }

    #[test]
    fn empty_input_yields_no_lines() {
        let lines = read_lines(&b""[..]).unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn preserves_blank_lines() {
        let lines = read_lines(&b"a\n\nb\n"[..]).unwrap();
        assert_eq!(lines, ["a", "", "b"]);
    }
}
