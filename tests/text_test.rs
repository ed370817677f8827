use exambot::text::{Segment, TargetEncoding, filter_string, filter_string_for, split_segments};
use proptest::prelude::*;

fn pairs<'a>(segments: &[Segment<'a>]) -> Vec<(&'a str, bool)> {
    segments.iter().map(|s| (s.content, s.marked_up)).collect()
}

#[test]
fn test_paired_span() {
    assert_eq!(
        pairs(&split_segments("a$b$c")),
        vec![("a", false), ("$b$", true), ("c", false)]
    );
}

#[test]
fn test_trailing_space_absorbed() {
    assert_eq!(
        pairs(&split_segments("a$b$ c")),
        vec![("a", false), ("$b$ ", true), ("c", false)]
    );
}

#[test]
fn test_unmatched_opener_is_literal() {
    assert_eq!(pairs(&split_segments("a$b")), vec![("a", false), ("$b", false)]);
}

#[test]
fn test_empty_input() {
    assert_eq!(pairs(&split_segments("")), vec![("", false)]);
}

#[test]
fn test_only_delimiters() {
    assert_eq!(pairs(&split_segments("$$")), vec![("$$", true), ("", false)]);
    assert_eq!(
        pairs(&split_segments("$$$")),
        vec![("$$", true), ("$", false)]
    );
    assert_eq!(pairs(&split_segments("$")), vec![("$", false)]);
}

#[test]
fn test_filter_then_split_answer() {
    let filtered = filter_string("Die Frage war $\\int_0^1 x\\,dx$ 🙂 und dann $a^2$.");
    assert!(filtered.looks_marked_up);
    assert_eq!(
        pairs(&split_segments(&filtered.text)),
        vec![
            ("Die Frage war ", false),
            ("$\\int_0^1 x\\,dx$ ", true),
            (" und dann ", false),
            ("$a^2$", true),
            (".", false),
        ]
    );
}

#[test]
fn test_filter_is_encoding_specific() {
    let text = "Übung € ✓";
    assert_eq!(filter_string_for(text, TargetEncoding::Utf8).text, text);
    assert_eq!(filter_string_for(text, TargetEncoding::Bmp).text, text);

    let latin1: TargetEncoding = "iso-8859-1".parse().unwrap();
    // The WHATWG iso-8859-1 label is windows-1252, which has the euro sign.
    assert_eq!(filter_string_for(text, latin1).text, "Übung € ");
}

#[test]
fn test_split_from_many_threads() {
    let handles: Vec<_> = (0..4)
        .map(|i| {
            std::thread::spawn(move || {
                let text = format!("x{i} $y_{i}$ z");
                split_segments(&text).len()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 3);
    }
}

proptest! {
    #[test]
    fn prop_filter_keeps_representable_text(s in "[a-zA-Z0-9 $.,äöü]{0,64}") {
        let filtered = filter_string(&s);
        prop_assert_eq!(&filtered.text, &s);
        let count = s.matches('$').count();
        prop_assert_eq!(filtered.looks_marked_up, count > 0 && count % 2 == 0);
    }

    #[test]
    fn prop_filter_drops_only_astral(prefix in "[a-z $]{0,16}", suffix in "[a-z $]{0,16}") {
        let filtered = filter_string(&format!("{prefix}😀{suffix}"));
        prop_assert_eq!(filtered.text, format!("{prefix}{suffix}"));
    }

    #[test]
    fn prop_segments_borrow_in_order(s in "\\PC{0,64}") {
        let segments = split_segments(&s);
        let mut offset = 0;
        for segment in &segments {
            prop_assert!(s[offset..].starts_with(segment.content));
            offset += segment.content.len();
        }
        prop_assert_eq!(offset, s.len());
    }
}
