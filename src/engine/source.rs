use anyhow::Result;
use camino::Utf8Path;
use std::borrow::Cow;

use crate::error::{DriftError, ErrorCode};

/// Maximum record file size: 100 MB.
const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Files above this size are memory-mapped instead of copied.
const MMAP_THRESHOLD: u64 = 65536;

/// Zero-copy capable source buffer.
pub enum SourceBuf {
    Mmap(memmap2::Mmap),
    Vec(Vec<u8>),
}

impl SourceBuf {
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            SourceBuf::Mmap(m) => m,
            SourceBuf::Vec(v) => v,
        }
    }
}

impl std::ops::Deref for SourceBuf {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Read a file into a buffer (mmap for large files, Vec for small).
pub fn read_file(path: &Utf8Path) -> Result<SourceBuf> {
    use std::fs::File;
    let file =
        File::open(path.as_std_path()).map_err(|_| DriftError::file_not_found(path.as_str()))?;
    let metadata = file.metadata()?;

    if metadata.len() == 0 {
        return Ok(SourceBuf::Vec(Vec::new()));
    }

    if metadata.len() > MAX_FILE_SIZE {
        anyhow::bail!(DriftError::new(
            ErrorCode::InvalidRequest,
            format!(
                "File too large ({} bytes > {} bytes): {}",
                metadata.len(),
                MAX_FILE_SIZE,
                path
            ),
        ));
    }

    if metadata.len() > MMAP_THRESHOLD {
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        Ok(SourceBuf::Mmap(mmap))
    } else {
        use std::io::Read;
        let mut buf = Vec::with_capacity(metadata.len() as usize);
        let mut reader = std::io::BufReader::new(file);
        reader.read_to_end(&mut buf)?;
        Ok(SourceBuf::Vec(buf))
    }
}

/// Decode record text as UTF-8 with `\r\n` line endings folded to `\n`.
pub fn decode<'a>(path: &Utf8Path, bytes: &'a [u8]) -> Result<Cow<'a, str>> {
    let text = std::str::from_utf8(bytes).map_err(|e| {
        DriftError::new(
            ErrorCode::IoError,
            format!("Invalid UTF-8 in {path}: {e}"),
        )
    })?;
    Ok(normalize_newlines(text))
}

/// Fold `\r\n` and lone `\r` to `\n`.
pub fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}
