//! Escaping literal text for LaTeX.

use std::borrow::Cow;

fn needs_escape(c: char) -> bool {
    matches!(
        c,
        '&' | '%' | '$' | '#' | '_' | '{' | '}' | '~' | '^' | '\\' | '\n' | '-' | '\u{a0}' | '['
            | ']'
    )
}

/// Escape characters that LaTeX would otherwise interpret.
///
/// Newlines become forced line breaks, hyphens are braced so that `--` does
/// not turn into a dash, and square brackets are braced so they cannot be
/// taken as optional arguments. Text without special characters is returned
/// borrowed.
///
/// # Examples
///
/// ```
/// use exambot::latex::escape_latex;
///
/// assert_eq!(escape_latex("50% of R&D"), "50\\% of R\\&D");
/// assert_eq!(escape_latex("plain"), "plain");
/// ```
pub fn escape_latex(text: &str) -> Cow<'_, str> {
    if !text.contains(needs_escape) {
        return Cow::Borrowed(text);
    }

    let mut result = String::with_capacity(text.len() + text.len() / 4);
    for c in text.chars() {
        match c {
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                result.push('\\');
                result.push(c);
            }
            '~' => result.push_str("\\textasciitilde{}"),
            '^' => result.push_str("\\^{}"),
            '\\' => result.push_str("\\textbackslash{}"),
            '\n' => result.push_str("\\newline%\n"),
            '-' => result.push_str("{-}"),
            '\u{a0}' => result.push('~'),
            '[' => result.push_str("{[}"),
            ']' => result.push_str("{]}"),
            _ => result.push(c),
        }
    }

    Cow::Owned(result)
}
