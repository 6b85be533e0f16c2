//! Slicer type detection from the first line of a file

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{Result, SlicerMetaError};
use crate::meta::SlicerType;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Bytes of an in-memory buffer considered when sniffing
pub const SNIFF_WINDOW: usize = 512;

/// Upper bound on the first line read from disk (binary files may have none)
const MAX_FIRST_LINE: u64 = 64 * 1024;

const FLASHPRINT_PREFIXES: &[&str] = &[";generated by ffslicer"];
const ORCA_PREFIXES: &[&str] = &[
    "; HEADER_BLOCK_START",
    "; THUMBNAIL_BLOCK_START",
    "; thumbnail begin",
];
const GX_PREFIXES: &[&str] = &["xgcode 1.0"];

/// Classify an already-trimmed header line. Rules are ordered and
/// case-sensitive.
pub fn detect_type_from_header(header: &str) -> SlicerType {
    let starts_with_any = |prefixes: &[&str]| prefixes.iter().any(|p| header.starts_with(p));

    if starts_with_any(FLASHPRINT_PREFIXES) {
        SlicerType::FlashPrint
    } else if starts_with_any(ORCA_PREFIXES) {
        SlicerType::OrcaFF
    } else if starts_with_any(GX_PREFIXES) {
        SlicerType::LegacyGX
    } else {
        SlicerType::Unknown
    }
}

/// First line of the first [`SNIFF_WINDOW`] bytes, trimmed
pub fn header_line(content: &[u8]) -> String {
    let window = &content[..content.len().min(SNIFF_WINDOW)];
    let text = String::from_utf8_lossy(window);
    let line = match text.find('\n') {
        Some(index) => &text[..index],
        None => &text[..],
    };
    clean_line(line)
}

/// Trim a raw first line, dropping a UTF-8 byte order mark
fn clean_line(line: &str) -> String {
    line.trim_start_matches('\u{feff}').trim().to_string()
}

/// Classify in-memory content
pub fn sniff_bytes(content: &[u8], diagnostics: &mut Diagnostics) -> SlicerType {
    sniff_bytes_with_header(content, diagnostics).0
}

/// [`sniff_bytes`], also returning the header line it classified
pub fn sniff_bytes_with_header(
    content: &[u8],
    diagnostics: &mut Diagnostics,
) -> (SlicerType, String) {
    let header = header_line(content);
    (classify(&header, diagnostics), header)
}

/// Classify a file by reading only its first line.
///
/// The handle is dropped as soon as the line is captured, whether or not the
/// read succeeded.
pub fn sniff_file(path: &Path, diagnostics: &mut Diagnostics) -> Result<SlicerType> {
    sniff_file_with_header(path, diagnostics).map(|(slicer, _)| slicer)
}

/// [`sniff_file`], also returning the header line it classified
pub fn sniff_file_with_header(
    path: &Path,
    diagnostics: &mut Diagnostics,
) -> Result<(SlicerType, String)> {
    let header = read_first_line(path)?;
    Ok((classify(&header, diagnostics), header))
}

fn read_first_line(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| SlicerMetaError::file_access(path, e))?;
    let mut reader = BufReader::new(file.take(MAX_FIRST_LINE));

    let mut line = Vec::new();
    reader
        .read_until(b'\n', &mut line)
        .map_err(|e| SlicerMetaError::file_access(path, e))?;
    drop(reader);

    debug!("Read {} header bytes from {}", line.len(), path.display());
    Ok(clean_line(&String::from_utf8_lossy(&line)))
}

fn classify(header: &str, diagnostics: &mut Diagnostics) -> SlicerType {
    if header.is_empty() {
        diagnostics.warn(DiagnosticKind::EmptyContent, "G-code content seems empty");
        return SlicerType::Unknown;
    }

    let slicer = detect_type_from_header(header);
    if slicer == SlicerType::Unknown {
        diagnostics.warn(
            DiagnosticKind::UnrecognizedHeader,
            format!("Could not determine slicer type from header: \"{}\"", header),
        );
    } else {
        debug!("Detected {} from header", slicer);
    }
    slicer
}
