//! Splitting answers into literal text and inline math spans.

/// Character that opens and closes an inline math span.
pub const DELIMITER: char = '$';

/// A contiguous slice of an answer.
///
/// Marked-up segments hold a math span including both delimiters and must be
/// passed to the renderer untouched. Literal segments still need escaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub content: &'a str,
    pub marked_up: bool,
}

impl<'a> Segment<'a> {
    /// Create a literal segment.
    pub fn literal(content: &'a str) -> Self {
        Self {
            content,
            marked_up: false,
        }
    }

    /// Create a marked-up (math) segment.
    pub fn marked_up(content: &'a str) -> Self {
        Self {
            content,
            marked_up: true,
        }
    }
}

/// Split text into literal runs and `$`-delimited math spans.
///
/// Delimiters are counted left to right: odd occurrences open a span, even
/// ones close it. A single space directly after a closing delimiter belongs
/// to the math span so the renderer keeps it on the same line as the
/// formula. An unmatched opening delimiter is not an error; the rest of the
/// text comes back as a trailing literal segment.
///
/// Concatenating the returned contents reproduces the input exactly. The
/// result always ends with a literal segment, which is empty when the text is
/// empty or ends with a closed span.
///
/// # Examples
///
/// ```
/// use exambot::text::{Segment, split_segments};
///
/// assert_eq!(
///     split_segments("a$b$ c"),
///     vec![
///         Segment::literal("a"),
///         Segment::marked_up("$b$ "),
///         Segment::literal("c"),
///     ]
/// );
/// ```
pub fn split_segments(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut count = 0usize;

    for (i, c) in text.char_indices() {
        if c != DELIMITER {
            continue;
        }

        count += 1;
        if count % 2 == 1 {
            if i > start {
                segments.push(Segment::literal(&text[start..i]));
            }
            start = i;
        } else {
            let mut end = i + DELIMITER.len_utf8();
            if text[end..].starts_with(' ') {
                end += 1;
            }
            segments.push(Segment::marked_up(&text[start..end]));
            start = end;
        }
    }

    segments.push(Segment::literal(&text[start..]));
    segments
}
