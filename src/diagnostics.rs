//! Recoverable parse problems
//!
//! Parsers never print. Anything they recover from locally is pushed into a
//! [`Diagnostics`] collector, which logs it through `tracing` and hands the
//! list back to the caller on the final result.

use std::fmt;
use tracing::warn;

/// Category of a locally recovered problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// Header line missing or not in the expected token shape
    MalformedHeader,
    /// Header time could not be read as `HH:mm:ss`
    InvalidSliceTime,
    /// ETA comment present but no duration could be extracted
    UnparsableEta,
    /// Nothing to classify
    EmptyContent,
    /// First line matches no known slicer
    UnrecognizedHeader,
    /// Thumbnail payload could not be decoded
    InvalidThumbnail,
    /// Binary container header truncated or inconsistent
    CorruptContainer,
    /// 3MF archive has no `Metadata/slice_info.config`
    MissingSliceInfo,
    /// 3MF archive has no `Metadata/plate_<n>.png`
    MissingPlateImage,
    /// Extension not recognized, G-code parse attempted anyway
    UnknownExtension,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::MalformedHeader => "malformed-header",
            DiagnosticKind::InvalidSliceTime => "invalid-slice-time",
            DiagnosticKind::UnparsableEta => "unparsable-eta",
            DiagnosticKind::EmptyContent => "empty-content",
            DiagnosticKind::UnrecognizedHeader => "unrecognized-header",
            DiagnosticKind::InvalidThumbnail => "invalid-thumbnail",
            DiagnosticKind::CorruptContainer => "corrupt-container",
            DiagnosticKind::MissingSliceInfo => "missing-slice-info",
            DiagnosticKind::MissingPlateImage => "missing-plate-image",
            DiagnosticKind::UnknownExtension => "unknown-extension",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recovered problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Ordered collector owned by a single parse call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem and emit it as a warning
    pub fn warn(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        warn!(kind = kind.as_str(), "{}", message);
        self.entries.push(Diagnostic { kind, message });
    }

    pub fn contains(&self, kind: DiagnosticKind) -> bool {
        self.entries.iter().any(|d| d.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
