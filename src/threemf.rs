//! 3MF project archives
//!
//! Two sources describe the same print: the XML ledger in
//! `Metadata/slice_info.config` and the G-code embedded as
//! `Metadata/plate_<n>.gcode`. Slicer and file metadata always come from the
//! G-code; the ledger provides printer id, support flag, object names and the
//! filament table, patched from the G-code where it is incomplete.

use crate::archive::{PlateEntry, PlateKind, ProjectArchive, SLICE_INFO_ENTRY};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{Result, SlicerMetaError};
use crate::gcode::GCodeParser;
use crate::helpers::{format_grams, format_meters, png_data_url};
use crate::meta::{filter_used, FilamentInfo, SlicerFileMeta, SlicerMeta, UNKNOWN};
use anyhow::Context;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::{debug, info};

/// Archive-level metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ThreeMfInfo {
    pub printer_model_id: String,
    pub support_used: bool,
    pub file_names: Vec<String>,
    pub filaments: Vec<FilamentInfo>,
    /// `data:image/png;base64,...`
    pub plate_image: Option<String>,
}

impl Default for ThreeMfInfo {
    fn default() -> Self {
        Self {
            printer_model_id: UNKNOWN.to_string(),
            support_used: false,
            file_names: Vec::new(),
            filaments: Vec::new(),
            plate_image: None,
        }
    }
}

/// Everything read from one archive
#[derive(Debug, Clone, PartialEq)]
pub struct ThreeMfParse {
    pub info: ThreeMfInfo,
    pub slicer: SlicerMeta,
    pub file: SlicerFileMeta,
}

/// One `<plate>` of the ledger
#[derive(Debug, Clone, Default, PartialEq)]
struct PlateRecord {
    index: Option<u32>,
    printer_model_id: Option<String>,
    support_used: Option<bool>,
    object_names: Vec<String>,
    filaments: Vec<FilamentInfo>,
}

pub struct ThreeMfParser;

impl ThreeMfParser {
    pub fn parse(path: &Path, diagnostics: &mut Diagnostics) -> Result<ThreeMfParse> {
        info!("Parsing 3MF archive: {}", path.display());
        let mut archive = ProjectArchive::open(path)?;
        Self::parse_archive(&mut archive, diagnostics)
    }

    /// Parse an archive that is not backed by a path
    pub fn parse_reader<R: Read + Seek>(
        reader: R,
        diagnostics: &mut Diagnostics,
    ) -> Result<ThreeMfParse> {
        let mut archive = ProjectArchive::from_reader(reader)?;
        Self::parse_archive(&mut archive, diagnostics)
    }

    fn parse_archive<R: Read + Seek>(
        archive: &mut ProjectArchive<R>,
        diagnostics: &mut Diagnostics,
    ) -> Result<ThreeMfParse> {
        let gcode_plate = archive.plates(PlateKind::GCode).into_iter().next();
        let plate_index = gcode_plate.as_ref().map(|plate| plate.index);

        // Ledger
        let mut info = ThreeMfInfo::default();
        let mut candidates = Vec::new();
        match archive.read_entry(SLICE_INFO_ENTRY)? {
            Some(raw) => {
                let xml = String::from_utf8_lossy(&raw);
                let plates = parse_slice_info(&xml)
                    .map_err(|reason| SlicerMetaError::InvalidContainer { reason })?;
                if let Some(plate) = select_plate(plates, plate_index) {
                    debug!("Using ledger plate {:?}", plate.index);
                    apply_plate(&mut info, &mut candidates, plate);
                }
            }
            None => diagnostics.warn(
                DiagnosticKind::MissingSliceInfo,
                format!("{} not found in 3MF archive", SLICE_INFO_ENTRY),
            ),
        }

        // Preview
        let images = archive.plates(PlateKind::Image);
        let image = images
            .iter()
            .find(|plate| Some(plate.index) == plate_index)
            .or_else(|| images.first());
        info.plate_image = match image {
            Some(plate) => match archive.read_entry(&plate.name) {
                Ok(png) => png.map(|png| png_data_url(&png)),
                Err(e) => {
                    diagnostics.warn(
                        DiagnosticKind::InvalidThumbnail,
                        format!("Cannot extract plate image: {:#}", e),
                    );
                    None
                }
            },
            None => {
                diagnostics.warn(
                    DiagnosticKind::MissingPlateImage,
                    "Plate image (e.g. Metadata/plate_1.png) not found in 3MF archive",
                );
                None
            }
        };

        // Embedded G-code
        let PlateEntry { name, .. } = gcode_plate.ok_or(SlicerMetaError::MissingEmbeddedPayload)?;
        let content = archive
            .read_entry(&name)?
            .ok_or(SlicerMetaError::MissingEmbeddedPayload)?;
        let parsed = GCodeParser::parse_from_bytes(&content, diagnostics)
            .context("Failed to parse embedded G-code")?;

        let mut file = parsed.file;
        reconcile(&mut info, candidates, &mut file);

        Ok(ThreeMfParse {
            info,
            slicer: parsed.slicer,
            file,
        })
    }
}

/// Ledger plate matching the G-code plate, else the first one
fn select_plate(plates: Vec<PlateRecord>, index: Option<u32>) -> Option<PlateRecord> {
    let position = plates
        .iter()
        .position(|plate| index.is_some() && plate.index == index)
        .unwrap_or(0);
    plates.into_iter().nth(position)
}

fn apply_plate(info: &mut ThreeMfInfo, candidates: &mut Vec<FilamentInfo>, plate: PlateRecord) {
    if let Some(model) = plate.printer_model_id.filter(|m| !m.is_empty()) {
        info.printer_model_id = model;
    }
    if let Some(support) = plate.support_used {
        info.support_used = support;
    }
    info.file_names = plate.object_names;
    *candidates = plate.filaments;
}

/// Fill the ledger from the G-code, then filter both filament lists from the
/// same reconciled set
fn reconcile(info: &mut ThreeMfInfo, mut candidates: Vec<FilamentInfo>, file: &mut SlicerFileMeta) {
    if info.printer_model_id == UNKNOWN && file.printer_model != UNKNOWN {
        info.printer_model_id = file.printer_model.clone();
    }

    for candidate in candidates.iter_mut().filter(|c| !c.is_used()) {
        if let Some(slot) = file.filaments.iter().find(|f| f.id == candidate.id) {
            debug!("Filling usage of filament {} from G-code", candidate.id);
            candidate.used_m = slot.used_m.clone();
            candidate.used_g = slot.used_g.clone();
        }
    }

    if candidates.is_empty() && file.filament_type != UNKNOWN {
        candidates.push(FilamentInfo {
            id: "0".to_string(),
            filament_type: file.filament_type.clone(),
            color: None,
            used_m: format_meters(file.filament_used_mm),
            used_g: format_grams(file.filament_used_g),
        });
    }

    let used = filter_used(&candidates);
    info.filaments = used.clone();
    file.filaments = used;
}

type Attributes = Vec<(String, String)>;

fn attribute_map(element: &BytesStart<'_>) -> std::result::Result<Attributes, String> {
    element
        .attributes()
        .map(|attr| -> std::result::Result<(String, String), String> {
            let attr = attr.map_err(|e| format!("invalid attribute: {}", e))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| format!("invalid attribute value: {}", e))?
                .trim()
                .to_string();
            Ok((key, value))
        })
        .collect()
}

fn attribute<'a>(attributes: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn apply_element(plate: &mut PlateRecord, tag: &[u8], attributes: &[(String, String)]) {
    match tag {
        b"metadata" => {
            let value = attribute(attributes, "value").unwrap_or_default();
            match attribute(attributes, "key") {
                Some("index") => plate.index = value.parse().ok(),
                Some("printer_model_id") => plate.printer_model_id = Some(value.to_string()),
                Some("support_used") => plate.support_used = Some(value == "true" || value == "1"),
                _ => {}
            }
        }
        b"object" => {
            if let Some(name) = attribute(attributes, "name").filter(|n| !n.is_empty()) {
                plate.object_names.push(name.to_string());
            }
        }
        b"filament" => {
            let text = |key| attribute(attributes, key).unwrap_or_default().to_string();
            plate.filaments.push(FilamentInfo {
                id: text("id"),
                filament_type: text("type"),
                color: attribute(attributes, "color")
                    .filter(|c| !c.is_empty())
                    .map(str::to_string),
                used_m: text("used_m"),
                used_g: text("used_g"),
            });
        }
        _ => {}
    }
}

/// Plates of `slice_info.config`, in document order.
///
/// Errors describe why the document is not well-formed.
fn parse_slice_info(xml: &str) -> std::result::Result<Vec<PlateRecord>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut open: Vec<Vec<u8>> = Vec::new();
    let mut saw_root = false;
    let mut current: Option<PlateRecord> = None;
    let mut plates = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| format!("{} at position {}", e, reader.buffer_position()))?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                if open.is_empty() && saw_root {
                    return Err("multiple root elements".to_string());
                }
                saw_root = true;

                let tag = e.name().as_ref().to_vec();
                let attributes = attribute_map(e)?;

                if tag == b"plate" {
                    let plate = PlateRecord::default();
                    if is_empty {
                        plates.push(plate);
                    } else {
                        current = Some(plate);
                    }
                } else if let Some(plate) = current.as_mut() {
                    apply_element(plate, &tag, &attributes);
                }

                if !is_empty {
                    open.push(tag);
                }
            }
            Event::End(ref e) => {
                if open.pop().is_none() {
                    return Err("unexpected closing tag".to_string());
                }
                if e.name().as_ref() == b"plate" {
                    if let Some(plate) = current.take() {
                        plates.push(plate);
                    }
                }
            }
            Event::Text(ref text) if open.is_empty() && !text.is_empty() => {
                return Err("text outside of the root element".to_string());
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(tag) = open.last() {
        return Err(format!(
            "unclosed element <{}>",
            String::from_utf8_lossy(tag)
        ));
    }
    if !saw_root {
        return Err("no root element".to_string());
    }
    Ok(plates)
}
