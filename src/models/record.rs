use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether the comment still matches the code after the edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Label {
    /// 0: the comment remains consistent with the new code.
    Consistent,
    /// 1: the comment is stale after the edit.
    Stale,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::Consistent, Label::Stale];

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Consistent => 0,
            Self::Stale => 1,
        }
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> u8 {
        label.as_u8()
    }
}

impl TryFrom<u8> for Label {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        <Label as TryFrom<u64>>::try_from(u64::from(value))
    }
}

impl TryFrom<u64> for Label {
    type Error = String;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Consistent),
            1 => Ok(Self::Stale),
            other => Err(format!("label out of range: {other}")),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Where a record's label came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelSource {
    /// Read from a `label:` field in the file.
    Explicit,
    /// Inferred from a comment diff; a heuristic, not ground truth.
    Derived,
}

/// Which intake layout a file uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RecordFormat {
    /// `oldComment:` / `oldCode:` / `newComment:` / `newCode:` / `label:` sections.
    A,
    /// Old block, hyphen line, new block, equals line, ignored metadata.
    B,
}

impl fmt::Display for RecordFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "a"),
            Self::B => write!(f, "b"),
        }
    }
}

/// Format A sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Section {
    #[serde(rename = "oldComment")]
    OldComment,
    #[serde(rename = "oldCode")]
    OldCode,
    #[serde(rename = "newComment")]
    NewComment,
    #[serde(rename = "newCode")]
    NewCode,
    #[serde(rename = "label")]
    Label,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::OldComment => "oldComment",
            Self::OldCode => "oldCode",
            Self::NewComment => "newComment",
            Self::NewCode => "newCode",
            Self::Label => "label",
        };
        write!(f, "{s}")
    }
}

/// One parsed before/after change with its comments and label.
///
/// Text fields hold normalized text; a field that was absent or empty after
/// normalization is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub old_comment: Option<String>,
    pub old_code: Option<String>,
    pub new_comment: Option<String>,
    pub new_code: Option<String>,
    pub label: Option<Label>,
    pub label_source: LabelSource,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub missing: Vec<Section>,
}

impl ChangeRecord {
    /// Number of fields among newCode, oldComment and oldCode that carry
    /// non-blank text.
    pub fn similarity_fields(&self) -> usize {
        self.similarity_texts().iter().flatten().count()
    }

    /// newCode, oldComment and oldCode, with blank text treated as absent.
    pub fn similarity_texts(&self) -> [Option<&str>; 3] {
        [&self.new_code, &self.old_comment, &self.old_code]
            .map(|f| f.as_deref().filter(|t| !t.trim().is_empty()))
    }
}
