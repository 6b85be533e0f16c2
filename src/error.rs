//! Error handling for slicer-meta
//!
//! Parsing entry points return `anyhow::Result` so callers get the whole
//! context chain; the failure kinds a caller may want to match on are the
//! variants of [`SlicerMetaError`].

use anyhow::Context;
use std::path::{Path, PathBuf};

pub type Result<T> = anyhow::Result<T>;

/// Extension trait for Results to add context naming an archive entry
pub trait ResultExt<T> {
    fn with_entry_context(self, entry: &str) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error> + Send + Sync + 'static,
{
    fn with_entry_context(self, entry: &str) -> Result<T> {
        self.map_err(|e| e.into())
            .with_context(|| format!("Error processing archive entry {}", entry))
    }
}

/// Fatal failures; anything recoverable is reported as a
/// [`Diagnostic`](crate::diagnostics::Diagnostic) instead.
#[derive(Debug, thiserror::Error)]
pub enum SlicerMetaError {
    #[error("Cannot access file '{}': {reason}", path.display())]
    FileAccess { path: PathBuf, reason: String },

    #[error("Cannot process file: sliced by unknown software or format unrecognized (header: \"{header}\")")]
    UnknownFormat { header: String },

    #[error("Invalid XML structure in slice_info.config: {reason}")]
    InvalidContainer { reason: String },

    #[error("Embedded G-code is missing")]
    MissingEmbeddedPayload,

    #[error("Corrupt GX container: {reason}")]
    CorruptGx { reason: String },

    #[error("Unsupported file extension '{extension}' and G-code parsing failed: {reason}")]
    UnsupportedExtension { extension: String, reason: String },
}

impl SlicerMetaError {
    pub(crate) fn file_access(path: &Path, reason: impl ToString) -> Self {
        SlicerMetaError::FileAccess {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

/// Find the first [`SlicerMetaError`] in an error's context chain.
pub fn find_error(err: &anyhow::Error) -> Option<&SlicerMetaError> {
    err.chain().find_map(|cause| cause.downcast_ref::<SlicerMetaError>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_context_message() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Invalid checksum",
        ));
        let err = result.with_entry_context("Metadata/plate_1.png").unwrap_err();

        assert_eq!(
            err.to_string(),
            "Error processing archive entry Metadata/plate_1.png"
        );
        assert!(format!("{:#}", err).contains("Invalid checksum"));
    }

    #[test]
    fn test_find_error_through_context() {
        let err = anyhow::Error::new(SlicerMetaError::MissingEmbeddedPayload)
            .context("Failed to parse 3MF archive");

        assert!(matches!(
            find_error(&err),
            Some(SlicerMetaError::MissingEmbeddedPayload)
        ));
    }

    #[test]
    fn test_unsupported_extension_message() {
        let err = SlicerMetaError::UnsupportedExtension {
            extension: ".txt".to_string(),
            reason: "unknown software".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "Unsupported file extension '.txt' and G-code parsing failed: unknown software"
        );
    }
}
