use tracing::debug;

use crate::models::change_info::{BucketCount, ChangeDistribution, ChangeInfo, SizeBucket};
use crate::models::record::Label;

/// Read the change metadata lines of a Format A file.
///
/// Only lines starting with a key are read; when `label:` appears on several
/// lines the last one wins.
pub fn parse_change_info(text: &str) -> ChangeInfo {
    let mut method_comment = false;
    let mut change_num = 0;
    let mut ranges: Vec<(u64, u64)> = Vec::new();
    let mut label = None;

    for line in text.lines() {
        if line.starts_with("type:") && line.contains("METHOD_COMMENT") {
            method_comment = true;
        }
        if let Some(value) = line.strip_prefix("changeNum:") {
            match value.trim().parse() {
                Ok(n) => change_num = n,
                Err(_) => debug!(line, "unreadable changeNum"),
            }
        }
        if line.starts_with("change ") {
            match parse_range(line) {
                Some(range) => ranges.push(range),
                None => debug!(line, "ignoring change range"),
            }
        }
        if let Some(value) = line.strip_prefix("label:") {
            match value.trim().parse::<u64>() {
                Ok(v) => label = Label::try_from(v).ok(),
                Err(_) => debug!(line, "unreadable label"),
            }
        }
    }

    ChangeInfo {
        method_comment,
        change_num,
        changed_lines: covered_lines(ranges),
        label,
    }
}

/// `change 2: 10, 14` -> (10, 14). Malformed and reversed ranges yield `None`.
fn parse_range(line: &str) -> Option<(u64, u64)> {
    let (_, range) = line.rsplit_once(':')?;
    let (start, end) = range.split_once(',')?;
    let start: u64 = start.trim().parse().ok()?;
    let end: u64 = end.trim().parse().ok()?;
    (start <= end).then_some((start, end))
}

/// Number of distinct line numbers covered by inclusive ranges.
fn covered_lines(mut ranges: Vec<(u64, u64)>) -> u64 {
    ranges.sort_unstable();
    let mut total = 0u64;
    let mut current: Option<(u64, u64)> = None;

    for (start, end) in ranges {
        current = match current {
            Some((s, e)) if start <= e.saturating_add(1) => Some((s, e.max(end))),
            Some((s, e)) => {
                total = total.saturating_add(span(s, e));
                Some((start, end))
            }
            None => Some((start, end)),
        };
    }
    if let Some((s, e)) = current {
        total = total.saturating_add(span(s, e));
    }
    total
}

fn span(start: u64, end: u64) -> u64 {
    (end - start).saturating_add(1)
}

/// Aggregate change sizes by label.
///
/// Method-level comments are counted but left out of the histograms. A file
/// without a readable label counts as consistent.
pub fn distribution<'a>(infos: impl IntoIterator<Item = &'a ChangeInfo>) -> ChangeDistribution {
    let mut files = 0;
    let mut method_comments = 0;
    let mut total_changes = 0;
    let mut stale = 0;
    let mut consistent = 0;
    let mut by_num = [(0u64, 0u64); 6];
    let mut by_lines = [(0u64, 0u64); 6];

    for info in infos {
        files += 1;
        let is_stale = info.label == Some(Label::Stale);
        if is_stale {
            stale += 1;
        } else {
            consistent += 1;
        }
        if info.method_comment {
            method_comments += 1;
            continue;
        }
        total_changes += info.change_num;

        for (counts, n) in [(&mut by_num, info.change_num), (&mut by_lines, info.changed_lines)] {
            if let Some(bucket) = SizeBucket::of(n) {
                let slot = &mut counts[bucket_index(bucket)];
                if is_stale {
                    slot.0 += 1;
                } else {
                    slot.1 += 1;
                }
            }
        }
    }

    let percent = |n: u64| {
        if files == 0 {
            0.0
        } else {
            n as f64 / files as f64 * 100.0
        }
    };

    ChangeDistribution {
        files,
        method_comments,
        total_changes,
        stale,
        consistent,
        stale_percent: percent(stale),
        consistent_percent: percent(consistent),
        by_change_num: bucket_counts(&by_num),
        by_changed_lines: bucket_counts(&by_lines),
    }
}

fn bucket_index(bucket: SizeBucket) -> usize {
    SizeBucket::ALL
        .iter()
        .position(|b| *b == bucket)
        .unwrap_or(0)
}

fn bucket_counts(counts: &[(u64, u64); 6]) -> Vec<BucketCount> {
    SizeBucket::ALL
        .iter()
        .zip(counts)
        .map(|(&bucket, &(stale, consistent))| BucketCount {
            bucket,
            stale,
            consistent,
            stale_ratio: (stale + consistent > 0)
                .then(|| stale as f64 / (stale + consistent) as f64),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const META: &str = "type:BLOCK_COMMENT\nchangeNum:2\nchange 1: 10, 12\nchange 2: 12, 13\nlabel:1\n";

    #[test]
    fn reads_metadata_lines() {
        let info = parse_change_info(META);
        assert!(!info.method_comment);
        assert_eq!(info.change_num, 2);
        // 10..=12 and 12..=13 overlap on line 12.
        assert_eq!(info.changed_lines, 4);
        assert_eq!(info.label, Some(Label::Stale));
    }

    #[test]
    fn method_comment_flag() {
        let info = parse_change_info("type:METHOD_COMMENT\nchangeNum:5\nlabel:0\n");
        assert!(info.method_comment);
        assert_eq!(info.label, Some(Label::Consistent));
    }

    #[test]
    fn malformed_change_lines_are_ignored() {
        let info = parse_change_info("changeNum:x\nchange 1: ten, 12\nchange 2 no colon\n");
        assert_eq!(info.change_num, 0);
        assert_eq!(info.changed_lines, 0);
        assert_eq!(info.label, None);
    }

    #[test]
    fn wide_ranges_are_counted_not_expanded() {
        let info = parse_change_info(
            "change 1: 1, 20000000\nchange 2: 5, 10\nchange 3: 20000001, 20000002\nchange 4: 0, 18446744073709551615\n",
        );
        assert_eq!(info.changed_lines, u64::MAX);

        let info = parse_change_info("change 1: 1, 20000000\nchange 2: 30000000, 30000009\n");
        assert_eq!(info.changed_lines, 20_000_010);
    }

    #[test]
    fn reversed_range_is_ignored() {
        let info = parse_change_info("change 1: 9, 3\nchange 2: 1, 2\n");
        assert_eq!(info.changed_lines, 2);
    }

    #[test]
    fn label_comes_from_last_label_line() {
        let text = "oldCode:\nint x = map.get(\"label:1\");\n\nlabel:0\n";
        assert_eq!(parse_change_info(text).label, Some(Label::Consistent));

        let twice = "label:0\nchangeNum:1\nlabel:1\n";
        assert_eq!(parse_change_info(twice).label, Some(Label::Stale));

        let inline_only = "x = \"label:1\"\n";
        assert_eq!(parse_change_info(inline_only).label, None);
    }

    #[test]
    fn distribution_buckets_by_label() {
        let infos = vec![
            parse_change_info(META),
            parse_change_info("changeNum:5\nchange 1: 1, 1\nlabel:0\n"),
            parse_change_info("changeNum:20\nchange 1: 1, 20\nlabel:1\n"),
            parse_change_info("type:METHOD_COMMENT\nchangeNum:3\nlabel:0\n"),
            parse_change_info("changeNum:1\n"),
        ];
        let dist = distribution(&infos);

        assert_eq!(dist.files, 5);
        assert_eq!(dist.method_comments, 1);
        assert_eq!(dist.total_changes, 2 + 5 + 20 + 1);
        assert_eq!(dist.stale, 2);
        assert_eq!(dist.consistent, 3);
        assert!((dist.stale_percent - 40.0).abs() < 1e-9);

        let one_to_three = &dist.by_change_num[0];
        assert_eq!(one_to_three.bucket, SizeBucket::OneToThree);
        assert_eq!((one_to_three.stale, one_to_three.consistent), (1, 1));
        assert_eq!(one_to_three.stale_ratio, Some(0.5));

        let four_to_six = &dist.by_change_num[1];
        assert_eq!((four_to_six.stale, four_to_six.consistent), (0, 1));

        let over = &dist.by_changed_lines[5];
        assert_eq!((over.stale, over.consistent), (1, 0));
        assert_eq!(dist.by_changed_lines[2].stale_ratio, None);
    }

    #[test]
    fn empty_distribution() {
        let dist = distribution(std::iter::empty());
        assert_eq!(dist.files, 0);
        assert_eq!(dist.stale_percent, 0.0);
        assert!(dist.by_change_num.iter().all(|b| b.stale_ratio.is_none()));
    }
}
