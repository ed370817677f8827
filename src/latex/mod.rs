//! LaTeX source generation.
//!
//! - [`escape`]: escaping of literal text
//! - [`document`]: a small document model that renders to `.tex` source
//! - [`preamble`]: packages and environments used by exam protocols
//!
//! Only what the protocols need is modelled. Anything else can be pushed as
//! [`Fragment::Raw`].

mod document;
mod escape;
mod preamble;

pub use document::{Document, FontSize, Fragment};
pub use escape::escape_latex;
pub use preamble::{COLORBOX_ENV, protocol_preamble};
