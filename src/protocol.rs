//! Layout of a per-subject exam protocol.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::latex::{COLORBOX_ENV, Document, FontSize, Fragment, protocol_preamble};
use crate::survey::{Response, group_by_semester};
use crate::text::{TargetEncoding, filter_string_for, split_segments};

/// Placeholder for answers that were left blank.
const MISSING: &str = "-";

/// Rendering options shared by all protocols of a run.
#[derive(Debug, Clone, Default)]
pub struct ProtocolOptions {
    /// Characters outside this encoding are dropped from answers.
    pub encoding: TargetEncoding,
    /// File name of the watermark image, if any.
    pub watermark: Option<String>,
}

/// File stem for a subject's protocol, e.g. `2024_03_01_Quantum Mechanics II`.
///
/// Path separators in the subject are replaced so the stem stays a single
/// path component.
pub fn file_stem(date: NaiveDate, subject: &str) -> String {
    let subject: String = subject
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
        .collect();
    format!("{}_{subject}", date.format("%Y_%m_%d"))
}

/// Build the protocol document for one subject.
///
/// Semesters are listed latest first, each on its own page, with the
/// semester's examiner in the heading. Every other entry is shaded. Answers
/// that look like they contain inline math keep their `$...$` spans
/// unescaped.
pub fn render_subject(
    subject: &str,
    responses: &[&Response],
    options: &ProtocolOptions,
) -> Document {
    let mut doc = protocol_preamble(options.watermark.as_deref());

    doc.begin("center");
    doc.push(Fragment::Sized(
        FontSize::Large,
        Box::new(Fragment::Bold(subject.to_string())),
    ));
    doc.push(Fragment::LineBreak);
    doc.end("center");

    if responses.is_empty() {
        info!(subject, "no responses, protocol has a title only");
        return doc;
    }

    for group in group_by_semester(responses) {
        debug!(
            subject,
            semester = %group.semester,
            responses = group.responses.len(),
            "rendering semester"
        );

        doc.begin("center");
        doc.push(Fragment::Sized(
            FontSize::Medium,
            Box::new(Fragment::Bold(format!(
                "{}, Examiner: {}",
                group.semester,
                group.examiner.unwrap_or(MISSING)
            ))),
        ));
        doc.end("center");

        doc.begin("enumerate");
        for (i, response) in group.responses.iter().enumerate() {
            let shaded = i % 2 == 0;
            doc.raw(r"\item");
            if shaded {
                doc.begin(COLORBOX_ENV);
            }
            render_response(&mut doc, response, options.encoding);
            if shaded {
                doc.end(COLORBOX_ENV);
            }
        }
        doc.end("enumerate");
        doc.push(Fragment::NewPage);
    }

    doc
}

fn render_response(doc: &mut Document, response: &Response, encoding: TargetEncoding) {
    doc.bold("Summary:");
    doc.push(Fragment::NewLine);

    let summary = filter_string_for(response.summary.as_deref().unwrap_or(MISSING), encoding);
    if summary.looks_marked_up {
        doc.segments(&split_segments(&summary.text));
    } else {
        doc.text(summary.text);
    }

    if let Some(atmosphere) = response.atmosphere.as_deref() {
        let atmosphere = filter_string_for(atmosphere, encoding);
        doc.push(Fragment::NewLine);
        doc.push(Fragment::NewLine);
        doc.bold("Exam atmosphere:");
        doc.push(Fragment::NewLine);
        doc.text(atmosphere.text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(semester: &str, examiner: &str, summary: &str, atmosphere: Option<&str>) -> Response {
        Response {
            semester: Some(semester.to_string()),
            examiner: Some(examiner.to_string()),
            summary: Some(summary.to_string()),
            atmosphere: atmosphere.map(String::from),
        }
    }

    #[test]
    fn test_file_stem() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(file_stem(date, "Quantum Mechanics II"), "2024_03_01_Quantum Mechanics II");
        assert_eq!(file_stem(date, "Analysis I/II"), "2024_03_01_Analysis I-II");
    }

    #[test]
    fn test_title_only_without_responses() {
        let source = render_subject("Optics", &[], &ProtocolOptions::default()).render();
        assert!(source.contains(r"{\Large \textbf{Optics}}"));
        assert!(!source.contains(r"\begin{enumerate}"));
    }

    #[test]
    fn test_semesters_latest_first_with_examiner() {
        let old = response("Fall 2022", "Dr. B", "old", None);
        let new = response("Spring 2023", "Dr. A", "new", None);
        let source = render_subject("QM", &[&old, &new], &ProtocolOptions::default()).render();
        let spring = source.find("Spring 2023, Examiner: Dr. A").unwrap();
        let fall = source.find("Fall 2022, Examiner: Dr. B").unwrap();
        assert!(spring < fall);
        assert_eq!(source.matches(r"\newpage").count(), 2);
    }

    #[test]
    fn test_every_other_item_shaded() {
        let a = response("Fall 2023", "X", "first", None);
        let b = response("Fall 2023", "X", "second", None);
        let c = response("Fall 2023", "X", "third", None);
        let source = render_subject("QM", &[&a, &b, &c], &ProtocolOptions::default()).render();
        assert_eq!(source.matches(r"\item").count(), 3);
        assert_eq!(source.matches(r"\begin{mycolorbox}").count(), 2);
        assert_eq!(source.matches(r"\end{mycolorbox}").count(), 2);
    }

    #[test]
    fn test_math_kept_and_text_escaped() {
        let r = response("Fall 2023", "X", "Why expand $e^{ik_z}$ in 50% of cases?", None);
        let doc = render_subject("QM", &[&r], &ProtocolOptions::default());
        let source = doc.render();
        assert!(source.contains("$e^{ik_z}$ %\n"));
        assert!(source.contains(r"in 50\% of cases?"));
    }

    #[test]
    fn test_unpaired_dollar_escaped() {
        let r = response("Fall 2023", "X", "costs $5", None);
        let source = render_subject("QM", &[&r], &ProtocolOptions::default()).render();
        assert!(source.contains(r"costs \$5"));
    }

    #[test]
    fn test_atmosphere_block_and_filtering() {
        let r = response("Fall 2023", "X", "fine 🙂", Some("relaxed 😀"));
        let source = render_subject("QM", &[&r], &ProtocolOptions::default()).render();
        assert!(source.contains(r"\textbf{Exam atmosphere:}"));
        assert!(source.contains("relaxed %\n"));
        assert!(!source.contains('😀'));
        assert!(!source.contains('🙂'));
    }

    #[test]
    fn test_missing_summary_placeholder() {
        let r = Response {
            semester: Some("Fall 2023".to_string()),
            ..Response::default()
        };
        let source = render_subject("QM", &[&r], &ProtocolOptions::default()).render();
        assert!(source.contains("Fall 2023, Examiner: {-}"));
        assert!(source.contains("\\newline%\n{-}%\n"));
    }

    #[test]
    fn test_watermark_in_preamble() {
        let options = ProtocolOptions {
            watermark: Some("logo.png".to_string()),
            ..ProtocolOptions::default()
        };
        let source = render_subject("QM", &[], &options).render();
        assert!(source.contains("{logo.png}"));
    }
}
