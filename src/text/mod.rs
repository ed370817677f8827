//! Pure text utilities for free-text survey answers.
//!
//! Answers arrive as arbitrary Unicode typed into a web form. Before they can
//! be embedded in a LaTeX document two things happen:
//!
//! - [`filter`]: characters the renderer cannot typeset are dropped, and the
//!   answer is flagged when it looks like it carries inline math
//! - [`segment`]: flagged answers are split into literal runs and `$...$`
//!   math spans so that only the literal runs get escaped
//!
//! Both functions are total and side-effect free. The rendering layer
//! ([`crate::latex`]) decides what to do with the results.

mod filter;
mod segment;

pub use filter::{Filtered, TargetEncoding, filter_string, filter_string_for};
pub use segment::{DELIMITER, Segment, split_segments};
