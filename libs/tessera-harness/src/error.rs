use std::path::{Path, PathBuf};

use tessera_api::error::CodecError;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("schema violation at field '{field}' (index {index}): {detail}")]
    SchemaViolation {
        field: String,
        index: usize,
        detail: String,
    },

    #[error("encoding failed ({}): {source}", .path.display())]
    Encoding { path: PathBuf, source: CodecError },

    #[error("decoding failed ({}): {source}", .path.display())]
    Decode { path: PathBuf, source: CodecError },

    #[error("{message}: expected {expected} but was {actual}")]
    ComparisonMismatch {
        message: String,
        expected: String,
        actual: String,
    },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Deserialize(CodecError),

    #[error("io error ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl HarnessError {
    pub(crate) fn violation(field: &str, index: usize, detail: impl Into<String>) -> Self {
        HarnessError::SchemaViolation {
            field: field.to_string(),
            index,
            detail: detail.into(),
        }
    }

    /// Attach `path` to encode/decode errors raised before a path was known.
    pub fn with_path(self, path: &Path) -> Self {
        match self {
            HarnessError::Encoding { path: p, source } if p.as_os_str().is_empty() => {
                HarnessError::Encoding { path: path.to_path_buf(), source }
            }
            HarnessError::Decode { path: p, source } if p.as_os_str().is_empty() => {
                HarnessError::Decode { path: path.to_path_buf(), source }
            }
            other => other,
        }
    }
}

/// Codec errors surfacing from an event sink are encoding failures; the
/// write driver fills in the path.
impl From<CodecError> for HarnessError {
    fn from(source: CodecError) -> Self {
        HarnessError::Encoding {
            path: PathBuf::new(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_path_fills_only_missing_paths() {
        let err = HarnessError::from(CodecError::encode("bad event")).with_path(Path::new("/t/a.parquet"));
        assert_eq!(err.to_string(), "encoding failed (/t/a.parquet): encode: bad event");

        let err = HarnessError::Decode {
            path: PathBuf::from("/t/first"),
            source: CodecError::decode("eof"),
        }
        .with_path(Path::new("/t/second"));
        assert!(err.to_string().contains("/t/first"));
    }

    #[test]
    fn mismatch_shows_both_renderings() {
        let err = HarnessError::ComparisonMismatch {
            message: "record 0".into(),
            expected: "[1]".into(),
            actual: "[1.0]".into(),
        };
        assert_eq!(err.to_string(), "record 0: expected [1] but was [1.0]");
    }
}
