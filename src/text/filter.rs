//! Dropping characters the renderer cannot typeset.

use std::fmt;
use std::str::FromStr;

use encoding_rs::Encoding;

use super::segment::DELIMITER;
use crate::error::{Error, Result};

/// Character repertoire accepted by the downstream renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetEncoding {
    /// Every Unicode scalar value is kept.
    Utf8,
    /// Only the Basic Multilingual Plane is kept. Drops emoji and other
    /// supplementary-plane symbols that `pdflatex` has no glyphs for.
    #[default]
    Bmp,
    /// Only characters the given legacy encoding can represent are kept.
    Legacy(&'static Encoding),
}

impl TargetEncoding {
    /// Whether `c` survives filtering.
    pub fn can_represent(&self, c: char) -> bool {
        match self {
            TargetEncoding::Utf8 => true,
            TargetEncoding::Bmp => (c as u32) <= 0xFFFF,
            TargetEncoding::Legacy(encoding) => {
                let mut buf = [0u8; 4];
                let (_, _, unmappable) = encoding.encode(c.encode_utf8(&mut buf));
                !unmappable
            }
        }
    }
}

impl FromStr for TargetEncoding {
    type Err = Error;

    /// Parse `utf-8`, `bmp`, or any WHATWG encoding label such as
    /// `windows-1252` or `latin1`.
    fn from_str(label: &str) -> Result<Self> {
        let label = label.trim();
        if label.eq_ignore_ascii_case("bmp") {
            return Ok(TargetEncoding::Bmp);
        }
        match Encoding::for_label(label.as_bytes()) {
            Some(encoding) if encoding == encoding_rs::UTF_8 => Ok(TargetEncoding::Utf8),
            // UTF-16 encoders write UTF-8, so they would accept everything
            // while claiming a narrower repertoire.
            Some(encoding) if encoding.output_encoding() != encoding => {
                Err(Error::InvalidEncoding(label.to_string()))
            }
            Some(encoding) => Ok(TargetEncoding::Legacy(encoding)),
            None => Err(Error::InvalidEncoding(label.to_string())),
        }
    }
}

impl fmt::Display for TargetEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetEncoding::Utf8 => f.write_str("utf-8"),
            TargetEncoding::Bmp => f.write_str("bmp"),
            TargetEncoding::Legacy(encoding) => f.write_str(encoding.name()),
        }
    }
}

/// Result of [`filter_string`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filtered {
    /// The input with unrepresentable characters removed.
    pub text: String,
    /// True when the input holds a positive, even number of `$`, i.e. it
    /// probably contains inline math and should go through
    /// [`split_segments`](super::split_segments).
    pub looks_marked_up: bool,
}

/// Filter text against the default target ([`TargetEncoding::Bmp`]).
///
/// # Examples
///
/// ```
/// use exambot::text::filter_string;
///
/// let filtered = filter_string("Energy $E=mc^2$ 🚀");
/// assert_eq!(filtered.text, "Energy $E=mc^2$ ");
/// assert!(filtered.looks_marked_up);
/// ```
pub fn filter_string(text: &str) -> Filtered {
    filter_string_for(text, TargetEncoding::default())
}

/// Filter text against an explicit target encoding.
///
/// Unrepresentable characters are removed without a replacement character.
/// The math flag is computed on the original text.
pub fn filter_string_for(text: &str, target: TargetEncoding) -> Filtered {
    let delimiters = text.chars().filter(|&c| c == DELIMITER).count();
    let looks_marked_up = delimiters > 0 && delimiters % 2 == 0;

    let text = text.chars().filter(|&c| target.can_represent(c)).collect();

    Filtered {
        text,
        looks_marked_up,
    }
}
