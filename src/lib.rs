//! # exambot
//!
//! Generates one exam protocol per subject from survey responses and
//! publishes the resulting PDFs to cloud storage.
//!
//! ## Workflow
//!
//! 1. Export the response spreadsheet from storage ([`store`]) and read the
//!    response sheet ([`xlsx`]).
//! 2. Select subjects and group their responses by semester ([`survey`]).
//! 3. Filter every answer and split inline math from literal text
//!    ([`text`]), then lay out the protocol ([`protocol`], [`latex`]).
//! 4. Compile with `pdflatex` ([`compile`]).
//! 5. Replace the contents of the remote PDF folder ([`pipeline`]).
//!
//! ## Text handling
//!
//! The answer-level functions are pure and usable on their own:
//!
//! ```
//! use exambot::text::{filter_string, split_segments};
//!
//! let filtered = filter_string("Explain $H = p^2/2m$ 👍");
//! assert!(filtered.looks_marked_up);
//!
//! let segments = split_segments(&filtered.text);
//! assert_eq!(segments[1].content, "$H = p^2/2m$ ");
//! assert!(segments[1].marked_up);
//! ```

pub mod compile;
pub mod config;
pub mod error;
pub mod latex;
pub mod pipeline;
pub mod protocol;
pub mod store;
pub mod survey;
pub mod text;
pub mod xlsx;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{Report, RunOptions, run};
pub use text::{Filtered, Segment, filter_string, split_segments};
