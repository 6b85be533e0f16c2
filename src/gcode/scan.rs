//! Single pass over the `;` comments of a G-code body

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::helpers::png_data_url;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::collections::HashMap;

const ETA_MARKERS: &[&str] = &["estimated printing time", "total estimated time"];

/// Base64 payload of one embedded thumbnail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailBlock {
    pub width: u32,
    pub height: u32,
    pub data: String,
}

impl ThumbnailBlock {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Png,
    Skipped,
}

/// Everything the body extractors need, collected in one pass
#[derive(Debug, Default)]
pub struct CommentScan<'a> {
    fields: HashMap<&'a str, &'a str>,
    /// First comment whose body starts with `generated by`
    pub generated_by: Option<&'a str>,
    /// Comments mentioning an estimated time, in file order
    pub eta_lines: Vec<&'a str>,
    /// PNG thumbnail blocks, in file order
    pub thumbnails: Vec<ThumbnailBlock>,
}

impl<'a> CommentScan<'a> {
    pub fn scan(text: &'a str) -> Self {
        let mut scan = CommentScan::default();
        let mut block: Option<(BlockKind, ThumbnailBlock)> = None;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        for line in text.lines() {
            let trimmed = line.trim();
            let Some(body) = trimmed.strip_prefix(';').map(str::trim) else {
                continue;
            };

            if let Some((kind, mut current)) = block.take() {
                if is_block_end(body) {
                    if kind == BlockKind::Png {
                        scan.thumbnails.push(current);
                    }
                } else {
                    if kind == BlockKind::Png {
                        current.data.push_str(body);
                    }
                    block = Some((kind, current));
                }
                continue;
            }

            if let Some(started) = block_start(body) {
                block = Some(started);
                continue;
            }

            if scan.generated_by.is_none() && body.starts_with("generated by") {
                scan.generated_by = Some(trimmed);
            }

            if ETA_MARKERS.iter().any(|marker| body.contains(marker)) {
                scan.eta_lines.push(trimmed);
            }

            if let Some((key, value)) = split_field(body) {
                scan.fields.entry(key).or_insert(value);
            }
        }

        scan
    }

    /// Value of the first `key = value` or `key: value` comment
    pub fn field(&self, key: &str) -> Option<&'a str> {
        self.fields.get(key).copied()
    }

    /// First non-empty value among `keys`, in priority order
    pub fn first_field(&self, keys: &[&str]) -> Option<&'a str> {
        keys.iter()
            .filter_map(|key| self.field(key))
            .find(|value| !value.is_empty())
    }

    /// Largest decodable PNG thumbnail as a data URL.
    ///
    /// Blocks are tried by descending pixel area (ties keep file order); each
    /// undecodable payload is recorded and the next one tried.
    pub fn thumbnail(&self, diagnostics: &mut Diagnostics) -> Option<String> {
        let mut ordered: Vec<&ThumbnailBlock> = self.thumbnails.iter().collect();
        ordered.sort_by(|a, b| b.area().cmp(&a.area()));

        for block in ordered {
            match STANDARD.decode(block.data.as_bytes()) {
                Ok(png) if !png.is_empty() => return Some(png_data_url(&png)),
                Ok(_) => diagnostics.warn(
                    DiagnosticKind::InvalidThumbnail,
                    format!("Empty {}x{} thumbnail block", block.width, block.height),
                ),
                Err(e) => diagnostics.warn(
                    DiagnosticKind::InvalidThumbnail,
                    format!(
                        "Cannot decode {}x{} thumbnail block: {}",
                        block.width, block.height, e
                    ),
                ),
            }
        }
        None
    }
}

fn block_start(body: &str) -> Option<(BlockKind, ThumbnailBlock)> {
    let mut tokens = body.split_whitespace();
    let kind = match tokens.next()? {
        "thumbnail" | "thumbnail_PNG" => BlockKind::Png,
        name if name.starts_with("thumbnail_") => BlockKind::Skipped,
        _ => return None,
    };
    if tokens.next()? != "begin" {
        return None;
    }

    let (width, height) = tokens
        .next()
        .and_then(|dims| dims.split_once('x'))
        .map(|(w, h)| (w.parse().unwrap_or(0), h.parse().unwrap_or(0)))
        .unwrap_or((0, 0));

    Some((
        kind,
        ThumbnailBlock {
            width,
            height,
            data: String::new(),
        },
    ))
}

fn is_block_end(body: &str) -> bool {
    let mut tokens = body.split_whitespace();
    matches!(
        (tokens.next(), tokens.next()),
        (Some(name), Some("end")) if name.starts_with("thumbnail")
    )
}

/// Split at whichever of `=` or `:` comes first
fn split_field(body: &str) -> Option<(&str, &str)> {
    let index = body.find(&['=', ':'][..])?;
    let key = body[..index].trim();
    if key.is_empty() {
        return None;
    }
    Some((key, body[index + 1..].trim()))
}
