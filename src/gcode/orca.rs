//! Orca-Flashforge / OrcaSlicer G-code
//!
//! Body fields are `; key = value` comments, most of them inside the config
//! block at the end of the file. Filament settings are per-extruder lists:
//! types and colours are `;`-separated, usage figures `,`-separated.

use super::scan::CommentScan;
use super::{read_slicer_meta, GCodeFormat, ParsedGCode};
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::helpers::{format_grams, format_meters, parse_float_or_default};
use crate::meta::{filter_used, FilamentInfo, HeaderLayout, SlicerFileMeta, SlicerType, UNKNOWN};

pub struct OrcaFormat;

impl GCodeFormat for OrcaFormat {
    fn slicer_type(&self) -> SlicerType {
        SlicerType::OrcaFF
    }

    fn parse_from_bytes(
        &self,
        content: &[u8],
        diagnostics: &mut Diagnostics,
    ) -> Result<ParsedGCode> {
        let text = String::from_utf8_lossy(content);
        let scan = CommentScan::scan(&text);

        let slicer = read_slicer_meta(&scan, self.slicer_type(), HeaderLayout::Orca, diagnostics);
        let file = extract_body(&scan, self.slicer_type(), diagnostics);

        Ok(ParsedGCode { slicer, file })
    }
}

fn split_list(value: Option<&str>, separator: char) -> Vec<&str> {
    value
        .map(|v| v.split(separator).map(str::trim).collect())
        .unwrap_or_default()
}

pub(crate) fn extract_body(
    scan: &CommentScan<'_>,
    slice_soft: SlicerType,
    diagnostics: &mut Diagnostics,
) -> SlicerFileMeta {
    let mut file = SlicerFileMeta::new(slice_soft);

    if let Some(model) = scan.field("printer_model").filter(|m| !m.is_empty()) {
        file.printer_model = model.to_string();
    }

    let types = split_list(scan.field("filament_type"), ';');
    let colours = split_list(scan.field("filament_colour"), ';');
    let used_mm = split_list(scan.field("filament used [mm]"), ',');
    let used_g = split_list(scan.field("filament used [g]"), ',');

    let slot_count = types.len().max(used_mm.len()).max(used_g.len());
    let mut slots = Vec::with_capacity(slot_count);
    let mut total_mm = 0.0;
    let mut total_g = 0.0;

    for index in 0..slot_count {
        let mm = parse_float_or_default(used_mm.get(index).copied());
        let grams = parse_float_or_default(used_g.get(index).copied());
        total_mm += mm;
        total_g += grams;

        slots.push(FilamentInfo {
            id: (index + 1).to_string(),
            filament_type: types
                .get(index)
                .filter(|t| !t.is_empty())
                .map_or_else(|| UNKNOWN.to_string(), |t| t.to_string()),
            color: colours
                .get(index)
                .filter(|c| !c.is_empty())
                .map(|c| c.to_string()),
            used_m: format_meters(mm),
            used_g: format_grams(grams),
        });
    }

    file.filament_used_mm = total_mm;
    file.filament_used_g = match scan.field("total filament used [g]") {
        Some(total) => parse_float_or_default(Some(total)),
        None => total_g,
    };
    file.filaments = filter_used(&slots);
    file.filament_type = summarize_types(&file.filaments, &types);
    file.thumbnail = scan.thumbnail(diagnostics);

    file
}

/// Distinct types of the used slots in slot order, else the first listed type
fn summarize_types(used: &[FilamentInfo], listed: &[&str]) -> String {
    let mut distinct: Vec<&str> = Vec::new();
    for filament in used {
        let name = filament.filament_type.as_str();
        if name != UNKNOWN && !distinct.contains(&name) {
            distinct.push(name);
        }
    }

    if !distinct.is_empty() {
        return distinct.join(";");
    }
    listed
        .iter()
        .find(|t| !t.is_empty())
        .map_or_else(|| UNKNOWN.to_string(), |t| t.to_string())
}
