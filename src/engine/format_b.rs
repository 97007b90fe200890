//! Parser for the before/after block layout:
//!
//! ```text
//! <old block>
//! ----
//! <new block>
//! ====
//! <metadata, ignored>
//! ```
//!
//! The label is not stored in the file. It is derived by comparing the comment
//! lines of the two blocks.

use serde::{Deserialize, Serialize};

use crate::engine::normalize::{NormalizeOptions, normalize, normalize_str};
use crate::error::DriftError;
use crate::models::record::{ChangeRecord, Label, LabelSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatBOptions {
    /// First non-whitespace character of a comment line.
    pub comment_leader: char,
}

impl Default for FormatBOptions {
    fn default() -> Self {
        Self {
            comment_leader: '#',
        }
    }
}

/// Parse a Format B file.
pub fn parse(
    text: &str,
    opts: &FormatBOptions,
    norm: &NormalizeOptions,
) -> Result<ChangeRecord, DriftError> {
    let (old_raw, rest) = split_at_rule(text, '-')
        .ok_or_else(|| DriftError::corrupt_delimiters("no hyphen line between old and new code"))?;
    let new_raw = match split_at_rule(rest, '=') {
        Some((new_block, _metadata)) => new_block,
        None => rest,
    };

    let old_block = old_raw.trim();
    let new_block = new_raw.trim();
    if old_block.is_empty() || new_block.is_empty() {
        return Err(DriftError::corrupt_delimiters(
            "old or new block is empty",
        ));
    }

    let old_comments = comment_lines(old_block, opts.comment_leader, norm);
    let new_comments = comment_lines(new_block, opts.comment_leader, norm);

    // Ordered comparison: reordering comments counts as a change.
    let label = if old_comments == new_comments {
        Label::Consistent
    } else {
        Label::Stale
    };

    Ok(ChangeRecord {
        old_comment: join_comments(&old_comments),
        old_code: normalize(Some(old_block), norm),
        new_comment: join_comments(&new_comments),
        new_code: normalize(Some(new_block), norm),
        label: Some(label),
        label_source: LabelSource::Derived,
        missing: Vec::new(),
    })
}

/// Normalized comment lines of a block, in order.
pub fn comment_lines(block: &str, leader: char, norm: &NormalizeOptions) -> Vec<String> {
    block
        .lines()
        .filter_map(|line| line.trim().strip_prefix(leader))
        .filter_map(|body| normalize_str(body.trim(), norm))
        .collect()
}

fn join_comments(comments: &[String]) -> Option<String> {
    if comments.is_empty() {
        None
    } else {
        Some(comments.join(" "))
    }
}

/// Split `text` around the first line made only of `rule` characters.
/// Returns the text before that line and the text after it.
fn split_at_rule(text: &str, rule: char) -> Option<(&str, &str)> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let content = line.trim();
        if !content.is_empty() && content.chars().all(|c| c == rule) {
            return Some((&text[..offset], &text[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}
