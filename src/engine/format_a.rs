//! Parser for the keyed-section layout:
//!
//! ```text
//! oldComment:
//! <text>
//! oldCode:
//! <text>
//!
//! newComment:
//! <text>
//! newCode:
//! <text>
//!
//! startline:<int>
//! ...
//! label:<int>
//! ```

use tracing::debug;

use crate::engine::normalize::{NormalizeOptions, normalize};
use crate::error::DriftError;
use crate::models::record::{ChangeRecord, Label, LabelSource, Section};

/// Start marker and terminator for each text section. Code bodies may contain
/// blank lines, so their terminators include the blank line before the next
/// marker.
const SECTIONS: [(Section, &str, &str); 4] = [
    (Section::OldComment, "oldComment:\n", "\noldCode:"),
    (Section::OldCode, "oldCode:\n", "\n\nnewComment:"),
    (Section::NewComment, "newComment:\n", "\nnewCode:"),
    (Section::NewCode, "newCode:\n", "\n\nstartline:"),
];

const LABEL_MARKER: &str = "label:";

/// Parse a Format A file.
///
/// Each section is extracted on its own: a missing marker, or a marker without
/// a terminator before the end of input, leaves that field unset and lists the
/// section in `missing`. Only input in which nothing at all can be found is an
/// error.
pub fn parse(text: &str, opts: &NormalizeOptions) -> Result<ChangeRecord, DriftError> {
    let mut missing = Vec::new();
    let mut fields: [Option<String>; 4] = Default::default();

    for (slot, (section, start, end)) in fields.iter_mut().zip(SECTIONS) {
        match extract_between(text, start, end) {
            Some(body) => *slot = normalize(Some(body.trim()), opts),
            None => missing.push(section),
        }
    }

    let label = match find_label_digits(text) {
        Some(digits) => parse_label(digits),
        None => {
            missing.push(Section::Label);
            None
        }
    };

    if missing.len() == SECTIONS.len() + 1 {
        return Err(DriftError::malformed(&missing));
    }
    if !missing.is_empty() {
        debug!(?missing, "format A record is partial");
    }

    let [old_comment, old_code, new_comment, new_code] = fields;
    Ok(ChangeRecord {
        old_comment,
        old_code,
        new_comment,
        new_code,
        label,
        label_source: LabelSource::Explicit,
        missing,
    })
}

/// Text between the first `start` and the first `end` that follows it.
fn extract_between<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let begin = text.find(start)? + start.len();
    let len = text[begin..].find(end)?;
    Some(&text[begin..begin + len])
}

/// Digits of the first `label:` marker that is followed by at least one digit.
pub(crate) fn find_label_digits(text: &str) -> Option<&str> {
    text.match_indices(LABEL_MARKER).find_map(|(pos, _)| {
        let rest = &text[pos + LABEL_MARKER.len()..];
        let len = rest.bytes().take_while(u8::is_ascii_digit).count();
        (len > 0).then(|| &rest[..len])
    })
}

fn parse_label(digits: &str) -> Option<Label> {
    let value = match digits.parse::<u64>() {
        Ok(v) => v,
        Err(_) => {
            debug!(digits, "label does not fit in an integer");
            return None;
        }
    };
    match Label::try_from(value) {
        Ok(label) => Some(label),
        Err(e) => {
            debug!(error = %e, "ignoring label");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "oldComment:\nfoo\noldCode:\nbar\n\nnewComment:\nfoo\nnewCode:\nbar\n\nstartline:1\n\nendline:2\n\nlabel:0";

    fn parse_default(text: &str) -> Result<ChangeRecord, DriftError> {
        parse(text, &NormalizeOptions::default())
    }

    #[test]
    fn parses_all_sections() {
        let record = parse_default(SAMPLE).unwrap();
        assert_eq!(record.old_comment.as_deref(), Some("foo"));
        assert_eq!(record.old_code.as_deref(), Some("bar"));
        assert_eq!(record.new_comment.as_deref(), Some("foo"));
        assert_eq!(record.new_code.as_deref(), Some("bar"));
        assert_eq!(record.label, Some(Label::Consistent));
        assert_eq!(record.label_source, LabelSource::Explicit);
        assert!(record.missing.is_empty());
    }

    #[test]
    fn parsing_is_deterministic() {
        assert_eq!(parse_default(SAMPLE).unwrap(), parse_default(SAMPLE).unwrap());
    }

    #[test]
    fn code_bodies_keep_blank_lines_until_terminator() {
        let text = "oldComment:\nReturns theCount\noldCode:\nint a = 1;\n\nint b = 2;\n\nnewComment:\nx\nnewCode:\nint c;\n\nreturn c;\n\nstartline:3\nlabel:1";
        let record = parse_default(text).unwrap();
        assert_eq!(record.old_comment.as_deref(), Some("Returns the Count"));
        assert_eq!(record.old_code.as_deref(), Some("int a = 1; int b = 2;"));
        assert_eq!(record.new_code.as_deref(), Some("int c; return c;"));
        assert_eq!(record.label, Some(Label::Stale));
    }

    #[test]
    fn missing_section_leaves_field_unset() {
        let text = "oldComment:\nfoo\noldCode:\nbar\n\nnewCode:\nbaz\n\nstartline:1\nlabel:1";
        let record = parse_default(text).unwrap();
        assert_eq!(record.old_comment.as_deref(), Some("foo"));
        // oldCode has no `newComment:` terminator.
        assert_eq!(record.old_code, None);
        assert_eq!(record.new_comment, None);
        assert_eq!(record.new_code.as_deref(), Some("baz"));
        assert_eq!(record.missing, vec![Section::OldCode, Section::NewComment]);
    }

    #[test]
    fn unterminated_trailing_section_is_unset() {
        let text = "oldComment:\nfoo\noldCode:\nbar\n\nnewComment:\nfoo\nnewCode:\nbar\nlabel:1";
        let record = parse_default(text).unwrap();
        assert_eq!(record.new_code, None);
        assert!(record.missing.contains(&Section::NewCode));
        assert_eq!(record.label, Some(Label::Stale));
    }

    #[test]
    fn missing_label_is_none() {
        let text = "oldComment:\nfoo\noldCode:\nbar\n\nnewComment:\nfoo\nnewCode:\nbar\n\nstartline:1";
        let record = parse_default(text).unwrap();
        assert_eq!(record.label, None);
        assert_eq!(record.missing, vec![Section::Label]);
    }

    #[test]
    fn label_skips_markers_without_digits() {
        assert_eq!(find_label_digits("label: none\nlabel:12x"), Some("12"));
        assert_eq!(find_label_digits("label:"), None);
    }

    #[test]
    fn out_of_range_label_is_none() {
        let text = SAMPLE.replace("label:0", "label:7");
        let record = parse_default(&text).unwrap();
        assert_eq!(record.label, None);
        assert!(record.missing.is_empty());
    }

    #[test]
    fn empty_section_is_none() {
        let text = "oldComment:\n\noldCode:\nbar\n\nnewComment:\nfoo\nnewCode:\nbar\n\nstartline:1\nlabel:0";
        let record = parse_default(text).unwrap();
        assert_eq!(record.old_comment, None);
        assert!(record.missing.is_empty());
    }

    #[test]
    fn unrelated_text_is_malformed() {
        let err = parse_default("just some text").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::MalformedRecord);
        assert!(err.message.contains("oldComment"));
    }
}
