//! Classification of raw log lines.

/// One classified line of `git log --pretty=raw` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// Zero-length line separating a header block from its message.
    Blank,

    /// Indented line; message body or a header continuation.
    Continuation(&'a str),

    /// `<keyword> <content>`, split at the first space.
    Header { keyword: &'a str, content: &'a str },
}

/// A non-blank, non-indented line with no keyword separator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognizable history line: {line}")]
pub struct MalformedLine {
    pub line: String,
}

/// Classify a single line (without its trailing newline).
pub fn classify(line: &str) -> Result<Line<'_>, MalformedLine> {
    if line.is_empty() {
        return Ok(Line::Blank);
    }
    if line.starts_with(' ') {
        return Ok(Line::Continuation(line));
    }
    match line.split_once(' ') {
        Some((keyword, content)) => Ok(Line::Header { keyword, content }),
        None => Err(MalformedLine {
            line: line.to_string(),
        }),
    }
}

/// Lazily classify every line of `text`, yielding 1-based line numbers.
///
/// A trailing `\r` is dropped so logs captured with CRLF endings classify the
/// same way.
pub fn classify_lines(
    text: &str,
) -> impl Iterator<Item = (usize, Result<Line<'_>, MalformedLine>)> {
    text.split('\n').enumerate().map(|(idx, line)| {
        let line = line.strip_suffix('\r').unwrap_or(line);
        (idx + 1, classify(line))
    })
}
