//! Legacy `.gx` container
//!
//! A fixed little-endian header, a BMP preview, then plain G-code text:
//!
//! ```text
//! 0x00  [u8; 16]  "xgcode 1.0\n" padded with NUL
//! 0x10  u32       bitmap offset
//! 0x14  u32       G-code offset
//! 0x18  u32       G-code offset (repeat)
//! 0x1C  u32       print time, seconds
//! 0x20  u32       filament used, right extruder, mm
//! 0x24  u32       filament used, left extruder, mm
//! 0x28  u16 x 9   extruder, layer, speed and temperature settings
//! 0x3A  BMP
//! ```
//!
//! FlashPrint writes the text in its own dialect. Files re-exported from Orca
//! carry an Orca header line and Orca config block instead.

use super::scan::CommentScan;
use super::{flashprint, orca, read_slicer_meta, GCodeFormat, ParsedGCode};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{Result, SlicerMetaError};
use crate::helpers::{format_duration, format_grams, format_meters, png_data_url};
use crate::meta::{FilamentInfo, HeaderLayout, SlicerType};
use image::ImageFormat;
use std::io::Cursor;
use tracing::debug;

pub const GX_MAGIC: &[u8] = b"xgcode 1.0\n";
pub const GX_HEADER_LEN: usize = 0x3A;

const TEXT_MARKERS: &[&[u8]] = &[
    b";generated by",
    b"; generated by",
    b"; HEADER_BLOCK_START",
    b"; THUMBNAIL_BLOCK_START",
    b";start gcode",
];

/// Fixed binary header of a `.gx` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GxHeader {
    pub bitmap_offset: u32,
    pub gcode_offset: u32,
    pub gcode_offset_repeat: u32,
    pub print_time_s: u32,
    pub filament_right_mm: u32,
    pub filament_left_mm: u32,
    pub settings: [u16; 9],
}

fn le_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes(raw.try_into().ok()?))
}

fn le_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let raw = bytes.get(offset..offset + 2)?;
    Some(u16::from_le_bytes(raw.try_into().ok()?))
}

impl GxHeader {
    /// `None` when the buffer is shorter than the fixed header
    pub fn read(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < GX_HEADER_LEN {
            return None;
        }

        let mut settings = [0u16; 9];
        for (index, setting) in settings.iter_mut().enumerate() {
            *setting = le_u16(bytes, 0x28 + index * 2)?;
        }

        Some(Self {
            bitmap_offset: le_u32(bytes, 0x10)?,
            gcode_offset: le_u32(bytes, 0x14)?,
            gcode_offset_repeat: le_u32(bytes, 0x18)?,
            print_time_s: le_u32(bytes, 0x1C)?,
            filament_right_mm: le_u32(bytes, 0x20)?,
            filament_left_mm: le_u32(bytes, 0x24)?,
            settings,
        })
    }

    pub fn filament_mm(&self) -> u64 {
        u64::from(self.filament_right_mm) + u64::from(self.filament_left_mm)
    }
}

/// A position that, after ASCII whitespace, starts with `;` or a letter
fn is_text_start(bytes: &[u8], offset: usize) -> bool {
    bytes
        .get(offset..)
        .and_then(|rest| rest.iter().find(|b| !b.is_ascii_whitespace()))
        .is_some_and(|&b| b == b';' || b.is_ascii_alphabetic())
}

/// Size a BMP declares for itself (`BM` then a little-endian u32)
fn bmp_size(bytes: &[u8], offset: usize) -> Option<usize> {
    if bytes.get(offset..offset + 2)? != b"BM" {
        return None;
    }
    le_u32(bytes, offset + 2).map(|size| size as usize)
}

fn find_marker(bytes: &[u8]) -> Option<usize> {
    let start = GX_MAGIC.len().min(bytes.len());
    let haystack = &bytes[start..];
    TEXT_MARKERS
        .iter()
        .filter_map(|marker| {
            haystack
                .windows(marker.len())
                .position(|window| window == *marker)
        })
        .min()
        .map(|position| start + position)
}

/// Offset where the embedded G-code text begins
pub fn locate_text(bytes: &[u8], header: Option<&GxHeader>) -> Result<usize> {
    let mut candidates: Vec<(&str, usize)> = Vec::new();
    if let Some(header) = header {
        candidates.push(("header offset", header.gcode_offset as usize));
        let bitmap = header.bitmap_offset as usize;
        if let Some(size) = bmp_size(bytes, bitmap) {
            candidates.push(("bitmap end", bitmap.saturating_add(size)));
        }
        // Text never starts inside the fixed header
        candidates.retain(|&(_, offset)| offset >= GX_HEADER_LEN);
    }
    if let Some(position) = find_marker(bytes) {
        candidates.push(("text marker", position));
    }

    candidates
        .into_iter()
        .find(|&(_, offset)| is_text_start(bytes, offset))
        .map(|(rule, offset)| {
            debug!("GX text starts at {:#x} ({})", offset, rule);
            offset
        })
        .ok_or_else(|| {
            SlicerMetaError::CorruptGx {
                reason: "cannot locate the embedded G-code text".to_string(),
            }
            .into()
        })
}

/// Re-encode the embedded BMP preview as a PNG data URL
fn bitmap_thumbnail(bmp: &[u8]) -> Result<String> {
    let image = image::load_from_memory_with_format(bmp, ImageFormat::Bmp)?;
    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png)?;
    Ok(png_data_url(png.get_ref()))
}

pub struct GxFormat;

impl GCodeFormat for GxFormat {
    fn slicer_type(&self) -> SlicerType {
        SlicerType::LegacyGX
    }

    fn parse_from_bytes(
        &self,
        content: &[u8],
        diagnostics: &mut Diagnostics,
    ) -> Result<ParsedGCode> {
        let header = GxHeader::read(content);
        if header.is_none() {
            diagnostics.warn(
                DiagnosticKind::CorruptContainer,
                format!("GX header truncated ({} bytes)", content.len()),
            );
        }

        let text_start = locate_text(content, header.as_ref())?;

        let bitmap = header
            .as_ref()
            .map(|h| h.bitmap_offset as usize)
            .filter(|&offset| offset < text_start)
            .map(|offset| &content[offset..text_start]);
        let bitmap_png = match bitmap {
            Some(bmp) => match bitmap_thumbnail(bmp) {
                Ok(png) => Some(png),
                Err(e) => {
                    diagnostics.warn(
                        DiagnosticKind::InvalidThumbnail,
                        format!("Cannot decode GX preview bitmap: {}", e),
                    );
                    None
                }
            },
            None => None,
        };

        let text = String::from_utf8_lossy(&content[text_start..]);
        let scan = CommentScan::scan(&text);
        let layout = scan
            .generated_by
            .map(HeaderLayout::detect)
            .unwrap_or(HeaderLayout::FlashPrint);
        debug!("GX body uses {:?} layout", layout);

        let mut slicer = read_slicer_meta(&scan, self.slicer_type(), layout, diagnostics);
        let mut file = match layout {
            HeaderLayout::FlashPrint => {
                flashprint::extract_body(&scan, self.slicer_type(), diagnostics)
            }
            HeaderLayout::Orca => orca::extract_body(&scan, self.slicer_type(), diagnostics),
        };
        if bitmap_png.is_some() {
            file.thumbnail = bitmap_png;
        }

        if let Some(header) = header {
            if slicer.print_eta.is_none() && header.print_time_s > 0 {
                slicer.print_eta = Some(format_duration(u64::from(header.print_time_s)));
            }
            let header_mm = header.filament_mm();
            if file.filament_used_mm == 0.0 && header_mm > 0 {
                file.filament_used_mm = header_mm as f64;
                file.filaments = vec![FilamentInfo {
                    id: "1".to_string(),
                    filament_type: file.filament_type.clone(),
                    color: None,
                    used_m: format_meters(file.filament_used_mm),
                    used_g: format_grams(file.filament_used_g),
                }];
            }
        }

        Ok(ParsedGCode { slicer, file })
    }
}
