//! G-code pipeline: sniff the slicer type, then hand off to its format parser
//!
//! Each supported lineage implements [`GCodeFormat`]. [`GCodeParser`] is the
//! entry point used by the facade and by the 3MF container for its embedded
//! payload.

use crate::diagnostics::Diagnostics;
use crate::error::{Result, SlicerMetaError};
use crate::meta::{HeaderLayout, SlicerFileMeta, SlicerMeta, SlicerType};
use crate::sniffer;
use anyhow::Context;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

pub mod flashprint;
pub mod gx;
pub mod orca;
pub mod scan;

pub use flashprint::FlashPrintFormat;
pub use gx::GxFormat;
pub use orca::OrcaFormat;

use scan::CommentScan;

/// Header and body metadata of one G-code payload
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedGCode {
    pub slicer: SlicerMeta,
    pub file: SlicerFileMeta,
}

/// A slicer-specific parser over already-available content
pub trait GCodeFormat {
    /// Slicer type reported by everything this format produces
    fn slicer_type(&self) -> SlicerType;

    fn parse_from_bytes(&self, content: &[u8], diagnostics: &mut Diagnostics)
        -> Result<ParsedGCode>;

    fn parse_file(&self, path: &Path, diagnostics: &mut Diagnostics) -> Result<ParsedGCode> {
        let content = fs::read(path).map_err(|e| SlicerMetaError::file_access(path, e))?;
        self.parse_from_bytes(&content, diagnostics)
    }
}

/// Sniffs content and dispatches to the matching [`GCodeFormat`]
pub struct GCodeParser;

impl GCodeParser {
    pub fn parse_file(path: &Path, diagnostics: &mut Diagnostics) -> Result<ParsedGCode> {
        info!("Parsing G-code file: {}", path.display());

        let (slicer, header) = sniffer::sniff_file_with_header(path, diagnostics)?;

        let format = Self::format_for(slicer, &header)?;
        format
            .parse_file(path, diagnostics)
            .with_context(|| format!("Failed to parse {} file", slicer))
    }

    pub fn parse_from_bytes(content: &[u8], diagnostics: &mut Diagnostics) -> Result<ParsedGCode> {
        let (slicer, header) = sniffer::sniff_bytes_with_header(content, diagnostics);

        let format = Self::format_for(slicer, &header)?;
        format
            .parse_from_bytes(content, diagnostics)
            .with_context(|| format!("Failed to parse {} content", slicer))
    }

    fn format_for(slicer: SlicerType, header: &str) -> Result<&'static dyn GCodeFormat> {
        let format: &'static dyn GCodeFormat = match slicer {
            SlicerType::FlashPrint => &FlashPrintFormat,
            SlicerType::OrcaFF => &OrcaFormat,
            SlicerType::LegacyGX => &GxFormat,
            SlicerType::Unknown => {
                return Err(SlicerMetaError::UnknownFormat {
                    header: header.to_string(),
                }
                .into())
            }
        };
        debug!("Dispatching to {} parser", slicer);
        Ok(format)
    }
}

/// Header record from the scanned `generated by` line, ETA applied afterwards
pub(crate) fn read_slicer_meta(
    scan: &CommentScan<'_>,
    slicer: SlicerType,
    layout: HeaderLayout,
    diagnostics: &mut Diagnostics,
) -> SlicerMeta {
    let meta = match scan.generated_by {
        Some(line) => SlicerMeta::from_generated_by(slicer, layout, line, diagnostics),
        None => SlicerMeta::missing_header(slicer, diagnostics),
    };
    meta.with_eta(scan.eta_lines.iter().copied(), diagnostics)
}
