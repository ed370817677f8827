//! Document model rendered to LaTeX source.

use std::fmt::Write as _;

use super::escape::escape_latex;
use crate::text::Segment;

/// Packages every document loads before its own preamble.
const BASE_PACKAGES: &[&str] = &[
    r"\usepackage[T1]{fontenc}",
    r"\usepackage[utf8]{inputenc}",
    r"\usepackage{lmodern}",
    r"\usepackage{textcomp}",
];

/// Font size switches used for headings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontSize {
    /// `\Large`
    Large,
    /// `\large`
    Medium,
}

impl FontSize {
    fn command(self) -> &'static str {
        match self {
            FontSize::Large => r"\Large",
            FontSize::Medium => r"\large",
        }
    }
}

/// A piece of document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// LaTeX source emitted as-is.
    Raw(String),
    /// Literal text, escaped on render.
    Text(String),
    /// Literal text in bold.
    Bold(String),
    /// A fragment inside a font size group.
    Sized(FontSize, Box<Fragment>),
    LineBreak,
    NewLine,
    NewPage,
}

impl Fragment {
    fn render_into(&self, out: &mut String) {
        match self {
            Fragment::Raw(source) => out.push_str(source),
            Fragment::Text(text) => out.push_str(&escape_latex(text)),
            Fragment::Bold(text) => {
                let _ = write!(out, r"\textbf{{{}}}", escape_latex(text));
            }
            Fragment::Sized(size, inner) => {
                out.push('{');
                out.push_str(size.command());
                out.push(' ');
                inner.render_into(out);
                out.push('}');
            }
            Fragment::LineBreak => out.push_str(r"\linebreak"),
            Fragment::NewLine => out.push_str(r"\newline"),
            Fragment::NewPage => out.push_str(r"\newpage"),
        }
    }
}

/// An `article` document under construction.
///
/// # Examples
///
/// ```
/// use exambot::latex::Document;
///
/// let mut doc = Document::new();
/// doc.bold("Summary:");
/// doc.text("50% passed");
///
/// let source = doc.render();
/// assert!(source.contains(r"\textbf{Summary:}"));
/// assert!(source.contains(r"50\% passed"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Document {
    preamble: Vec<String>,
    body: Vec<Fragment>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line to the preamble.
    pub fn preamble(&mut self, line: impl Into<String>) -> &mut Self {
        self.preamble.push(line.into());
        self
    }

    pub fn push(&mut self, fragment: Fragment) -> &mut Self {
        self.body.push(fragment);
        self
    }

    pub fn raw(&mut self, source: impl Into<String>) -> &mut Self {
        self.push(Fragment::Raw(source.into()))
    }

    pub fn text(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Fragment::Text(text.into()))
    }

    pub fn bold(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Fragment::Bold(text.into()))
    }

    pub fn begin(&mut self, environment: &str) -> &mut Self {
        self.raw(format!(r"\begin{{{environment}}}"))
    }

    pub fn end(&mut self, environment: &str) -> &mut Self {
        self.raw(format!(r"\end{{{environment}}}"))
    }

    /// Append split answer text: math spans raw, everything else escaped.
    /// Empty segments are skipped.
    pub fn segments(&mut self, segments: &[Segment<'_>]) -> &mut Self {
        for segment in segments.iter().filter(|s| !s.content.is_empty()) {
            if segment.marked_up {
                self.raw(segment.content);
            } else {
                self.text(segment.content);
            }
        }
        self
    }

    pub fn body(&self) -> &[Fragment] {
        &self.body
    }

    /// Render the complete `.tex` source.
    ///
    /// Every preamble line and body fragment is terminated by `%` so that
    /// line ends do not introduce stray spaces.
    pub fn render(&self) -> String {
        let mut out = String::from("\\documentclass{article}%\n");
        for line in BASE_PACKAGES
            .iter()
            .copied()
            .chain(self.preamble.iter().map(String::as_str))
        {
            out.push_str(line);
            out.push_str("%\n");
        }
        out.push_str("%\n\\begin{document}%\n\\normalsize%\n");
        for fragment in &self.body {
            fragment.render_into(&mut out);
            out.push_str("%\n");
        }
        out.push_str("%\n\\end{document}\n");
        out
    }
}
