use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    FileNotFound,
    IoError,
    InvalidRequest,
    MalformedRecord,
    UnusableRecord,
    EmbeddingFailure,
    CorruptDelimiters,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileNotFound => write!(f, "FILE_NOT_FOUND"),
            Self::IoError => write!(f, "IO_ERROR"),
            Self::InvalidRequest => write!(f, "INVALID_REQUEST"),
            Self::MalformedRecord => write!(f, "MALFORMED_RECORD"),
            Self::UnusableRecord => write!(f, "UNUSABLE_RECORD"),
            Self::EmbeddingFailure => write!(f, "EMBEDDING_FAILURE"),
            Self::CorruptDelimiters => write!(f, "CORRUPT_DELIMITERS"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DriftError {
    pub code: ErrorCode,
    pub message: String,
}

impl fmt::Display for DriftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for DriftError {}

impl DriftError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn file_not_found(path: &str) -> Self {
        Self::new(ErrorCode::FileNotFound, format!("File not found: {path}"))
    }

    pub fn unknown_format(path: &str) -> Self {
        Self::new(
            ErrorCode::InvalidRequest,
            format!("No record format matches: {path}"),
        )
    }

    pub fn malformed(missing: &[impl fmt::Display]) -> Self {
        let names: Vec<String> = missing.iter().map(|s| s.to_string()).collect();
        Self::new(
            ErrorCode::MalformedRecord,
            format!("Missing sections: {}", names.join(", ")),
        )
    }

    pub fn corrupt_delimiters(reason: &str) -> Self {
        Self::new(ErrorCode::CorruptDelimiters, reason.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_screaming_code() {
        let err = DriftError::corrupt_delimiters("no hyphen line");
        assert_eq!(err.to_string(), "[CORRUPT_DELIMITERS] no hyphen line");
    }

    #[test]
    fn malformed_lists_sections() {
        let err = DriftError::malformed(&["oldCode", "label"]);
        assert_eq!(err.code, ErrorCode::MalformedRecord);
        assert_eq!(err.message, "Missing sections: oldCode, label");
    }
}
