use serde::{Deserialize, Serialize};

use super::record::Label;

/// Change metadata carried by a Format A file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeInfo {
    /// `type:` names a method-level comment.
    pub method_comment: bool,
    /// Value of `changeNum:`.
    pub change_num: u64,
    /// Distinct line numbers covered by all `change` ranges.
    pub changed_lines: u64,
    pub label: Option<Label>,
}

/// Size bucket used by the distribution histograms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeBucket {
    #[serde(rename = "1-3")]
    OneToThree,
    #[serde(rename = "4-6")]
    FourToSix,
    #[serde(rename = "7-9")]
    SevenToNine,
    #[serde(rename = "10-12")]
    TenToTwelve,
    #[serde(rename = "13-15")]
    ThirteenToFifteen,
    #[serde(rename = ">15")]
    OverFifteen,
}

impl SizeBucket {
    pub const ALL: [SizeBucket; 6] = [
        SizeBucket::OneToThree,
        SizeBucket::FourToSix,
        SizeBucket::SevenToNine,
        SizeBucket::TenToTwelve,
        SizeBucket::ThirteenToFifteen,
        SizeBucket::OverFifteen,
    ];

    /// Bucket for `n`; zero belongs to no bucket.
    pub fn of(n: u64) -> Option<Self> {
        match n {
            0 => None,
            1..=3 => Some(Self::OneToThree),
            4..=6 => Some(Self::FourToSix),
            7..=9 => Some(Self::SevenToNine),
            10..=12 => Some(Self::TenToTwelve),
            13..=15 => Some(Self::ThirteenToFifteen),
            _ => Some(Self::OverFifteen),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketCount {
    pub bucket: SizeBucket,
    pub stale: u64,
    pub consistent: u64,
    /// stale / (stale + consistent); absent when the bucket is empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_ratio: Option<f64>,
}

/// Label split by change size across a set of Format A files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeDistribution {
    pub files: u64,
    pub method_comments: u64,
    pub total_changes: u64,
    pub stale: u64,
    pub consistent: u64,
    pub stale_percent: f64,
    pub consistent_percent: f64,
    pub by_change_num: Vec<BucketCount>,
    pub by_changed_lines: Vec<BucketCount>,
}
