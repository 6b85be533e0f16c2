// SPDX-FileCopyrightText: 2025 HalfSweet
// SPDX-License-Identifier: Apache-2.0

//! slicer-meta - print metadata from sliced 3D-printing files
//!
//! Reads slicer identity, slice timestamp, estimated duration, printer model,
//! filament usage and a preview thumbnail from FlashPrint and Orca G-code,
//! legacy `.gx` containers and 3MF project archives.
//!
//! ```no_run
//! let result = slicer_meta::parse_slicer_file("benchy.3mf")?;
//! if let Some(slicer) = &result.slicer {
//!     println!("{} {}", slicer.slicer_name, slicer.slicer_version);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod archive;
pub mod diagnostics;
pub mod error;
pub mod gcode;
pub mod helpers;
pub mod meta;
pub mod sniffer;
pub mod threemf;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{Result, SlicerMetaError};
pub use gcode::{GCodeParser, ParsedGCode};
pub use meta::{FilamentInfo, SlicerFileMeta, SlicerMeta, SlicerType};
pub use threemf::{ThreeMfInfo, ThreeMfParser};

use std::path::Path;
use tracing::{debug, info};

/// Aggregated outcome of one parse
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseResult {
    pub slicer: Option<SlicerMeta>,
    pub file: Option<SlicerFileMeta>,
    /// Present for 3MF inputs only
    pub three_mf: Option<ThreeMfInfo>,
    /// Problems recovered from along the way, in order
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    ThreeMf,
    GCode,
    Other,
}

fn input_kind(extension: &str) -> InputKind {
    match extension.to_ascii_lowercase().as_str() {
        "3mf" => InputKind::ThreeMf,
        "gcode" | "g" | "gx" => InputKind::GCode,
        _ => InputKind::Other,
    }
}

/// Parse any supported file, dispatching on its extension.
///
/// Files with an unrecognized extension are still tried as G-code; only if
/// that fails is [`SlicerMetaError::UnsupportedExtension`] returned.
pub fn parse_slicer_file<P: AsRef<Path>>(path: P) -> Result<ParseResult> {
    let path = path.as_ref();
    info!("Parsing slicer file: {}", path.display());

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    let mut diagnostics = Diagnostics::new();

    let result = match input_kind(extension) {
        InputKind::ThreeMf => {
            let parsed = ThreeMfParser::parse(path, &mut diagnostics)?;
            ParseResult {
                slicer: Some(parsed.slicer),
                file: Some(parsed.file),
                three_mf: Some(parsed.info),
                diagnostics: Vec::new(),
            }
        }
        InputKind::GCode => {
            let parsed = GCodeParser::parse_file(path, &mut diagnostics)?;
            ParseResult {
                slicer: Some(parsed.slicer),
                file: Some(parsed.file),
                ..ParseResult::default()
            }
        }
        InputKind::Other => {
            let shown = if extension.is_empty() {
                String::new()
            } else {
                format!(".{}", extension)
            };
            diagnostics.warn(
                DiagnosticKind::UnknownExtension,
                format!(
                    "Unrecognized extension '{}', attempting to parse as G-code",
                    shown
                ),
            );

            let parsed = GCodeParser::parse_file(path, &mut diagnostics).map_err(|e| {
                SlicerMetaError::UnsupportedExtension {
                    extension: shown,
                    reason: format!("{:#}", e),
                }
            })?;
            ParseResult {
                slicer: Some(parsed.slicer),
                file: Some(parsed.file),
                ..ParseResult::default()
            }
        }
    };

    debug!(
        "Parsed {} with {} diagnostics",
        path.display(),
        diagnostics.len()
    );
    Ok(ParseResult {
        diagnostics: diagnostics.into_vec(),
        ..result
    })
}

/// [`parse_slicer_file`] on tokio's blocking pool
#[cfg(feature = "async")]
pub async fn parse_slicer_file_async<P: AsRef<Path>>(path: P) -> Result<ParseResult> {
    let path = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || parse_slicer_file(path)).await?
}
