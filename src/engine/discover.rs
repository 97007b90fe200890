use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

use crate::config::DiscoveryConfig;
use crate::models::record::RecordFormat;

/// A record file and the parser that reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaggedFile {
    pub path: Utf8PathBuf,
    pub format: RecordFormat,
}

/// Pick the record format for a path, or `None` if it is not a record file.
pub fn format_for(path: &Utf8Path, rules: &DiscoveryConfig) -> Option<RecordFormat> {
    let ext = path.extension()?.to_lowercase();
    let name = path.file_name().unwrap_or("");

    if rules.format_b_extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
        return Some(RecordFormat::B);
    }
    if rules.format_a_extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
        let name_ok = rules
            .format_a_name_contains
            .as_deref()
            .is_none_or(|needle| name.contains(needle));
        if name_ok {
            return Some(RecordFormat::A);
        }
    }
    None
}

/// Walk `dir` and tag every record file, in a stable order.
pub fn collect_files(dir: &Path, rules: &DiscoveryConfig) -> Result<Vec<TaggedFile>> {
    use ignore::WalkBuilder;

    let mut builder = WalkBuilder::new(dir);
    builder
        .hidden(rules.respect_ignore)
        .git_ignore(rules.respect_ignore)
        .git_global(rules.respect_ignore)
        .git_exclude(rules.respect_ignore)
        .ignore(rules.respect_ignore)
        .parents(rules.respect_ignore)
        .sort_by_file_name(|a, b| a.cmp(b));

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = entry?;
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.into_path()) else {
            debug!("skipping non UTF-8 path");
            continue;
        };
        if let Some(format) = format_for(&path, rules) {
            files.push(TaggedFile { path, format });
        }
    }

    Ok(files)
}
