use serde::{Deserialize, Serialize};

/// Optional post-steps applied after camel-case splitting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Lowercase the result.
    pub lowercase: bool,
    /// Replace everything except ASCII letters, digits and whitespace with a space.
    pub strip_punctuation: bool,
    /// Keep uppercase runs together (`parseHTTPResponse` -> `parse HTTP Response`).
    /// When off, every uppercase letter after the first character starts a word.
    pub keep_acronyms: bool,
}

/// Clean a code or comment field into embeddable text.
///
/// Returns `None` for absent input and for input that is empty once cleaned.
pub fn normalize(raw: Option<&str>, opts: &NormalizeOptions) -> Option<String> {
    let raw = raw?;
    let mut text = split_camel_case(raw, opts.keep_acronyms);

    if opts.strip_punctuation {
        text = text
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c.is_whitespace() {
                    c
                } else {
                    ' '
                }
            })
            .collect();
    }
    if opts.lowercase {
        text = text.to_lowercase();
    }

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Shorthand for `normalize(Some(raw), opts)`.
pub fn normalize_str(raw: &str, opts: &NormalizeOptions) -> Option<String> {
    normalize(Some(raw), opts)
}

/// Insert a space at camel-case and acronym boundaries.
fn split_camel_case(text: &str, keep_acronyms: bool) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + text.len() / 4);

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            let prev_upper = chars[i - 1].is_ascii_uppercase();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            let boundary = if keep_acronyms {
                !prev_upper || next_lower
            } else {
                true
            };
            if boundary {
                out.push(' ');
            }
        }
        out.push(c);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn default_norm(s: &str) -> Option<String> {
        normalize_str(s, &NormalizeOptions::default())
    }

    #[test]
    fn none_stays_none() {
        assert_eq!(normalize(None, &NormalizeOptions::default()), None);
    }

    #[test]
    fn empty_after_cleaning_is_none() {
        assert_eq!(default_norm(""), None);
        assert_eq!(default_norm("  \n\t "), None);
    }

    #[test]
    fn splits_camel_case_and_collapses_whitespace() {
        assert_eq!(
            default_norm("  getUserName(id)\n\n   return  x ").as_deref(),
            Some("get User Name(id) return x")
        );
    }

    #[test]
    fn default_splits_every_uppercase_letter() {
        assert_eq!(
            default_norm("parseHTTPResponse").as_deref(),
            Some("parse H T T P Response")
        );
    }

    #[test]
    fn keep_acronyms_splits_only_run_edges() {
        let opts = NormalizeOptions {
            keep_acronyms: true,
            ..NormalizeOptions::default()
        };
        assert_eq!(
            normalize_str("parseHTTPResponse", &opts).as_deref(),
            Some("parse HTTP Response")
        );
        assert_eq!(normalize_str("XMLParser", &opts).as_deref(), Some("XML Parser"));
    }

    #[test]
    fn leading_uppercase_gets_no_space() {
        assert_eq!(default_norm("Foo").as_deref(), Some("Foo"));
    }

    #[test]
    fn preserves_case_and_punctuation_by_default() {
        assert_eq!(default_norm("x=1; // Done!").as_deref(), Some("x=1; // Done!"));
    }

    #[test]
    fn optional_steps() {
        let opts = NormalizeOptions {
            lowercase: true,
            strip_punctuation: true,
            keep_acronyms: false,
        };
        assert_eq!(
            normalize_str("if (isReady) { runTask(); }", &opts).as_deref(),
            Some("if is ready run task")
        );
        assert_eq!(normalize_str("{};", &opts), None);
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in "[a-zA-Z0-9 _(){};=.\\t\\n]{0,64}") {
            let opts = NormalizeOptions::default();
            if let Some(once) = normalize_str(&s, &opts) {
                prop_assert_eq!(normalize_str(&once, &opts), Some(once.clone()));
            }
        }

        #[test]
        fn normalize_with_all_options_is_idempotent(s in "[a-zA-Z0-9 _(){};=.\\t\\n]{0,64}") {
            let opts = NormalizeOptions { lowercase: true, strip_punctuation: true, keep_acronyms: true };
            if let Some(once) = normalize_str(&s, &opts) {
                prop_assert_eq!(normalize_str(&once, &opts), Some(once.clone()));
            }
        }
    }
}
