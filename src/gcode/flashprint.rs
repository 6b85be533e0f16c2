//! FlashPrint (`ffslicer`) G-code

use super::scan::CommentScan;
use super::{read_slicer_meta, GCodeFormat, ParsedGCode};
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::meta::{HeaderLayout, SlicerFileMeta, SlicerType};

const MATERIAL_KEYS: &[&str] = &[
    "right_extruder_material",
    "left_extruder_material",
    "filament_type",
    "material",
];

pub struct FlashPrintFormat;

impl GCodeFormat for FlashPrintFormat {
    fn slicer_type(&self) -> SlicerType {
        SlicerType::FlashPrint
    }

    fn parse_from_bytes(
        &self,
        content: &[u8],
        diagnostics: &mut Diagnostics,
    ) -> Result<ParsedGCode> {
        let text = String::from_utf8_lossy(content);
        let scan = CommentScan::scan(&text);

        let slicer = read_slicer_meta(
            &scan,
            self.slicer_type(),
            HeaderLayout::FlashPrint,
            diagnostics,
        );
        let file = extract_body(&scan, self.slicer_type(), diagnostics);

        Ok(ParsedGCode { slicer, file })
    }
}

/// Body fields written as `;key: value`. FlashPrint reports no filament
/// usage, so the usage figures stay at zero.
pub(crate) fn extract_body(
    scan: &CommentScan<'_>,
    slice_soft: SlicerType,
    diagnostics: &mut Diagnostics,
) -> SlicerFileMeta {
    let mut file = SlicerFileMeta::new(slice_soft);

    if let Some(model) = scan.field("machine_type").filter(|m| !m.is_empty()) {
        file.printer_model = model.to_string();
    }
    if let Some(material) = scan.first_field(MATERIAL_KEYS) {
        file.filament_type = material.to_string();
    }
    file.thumbnail = scan.thumbnail(diagnostics);

    file
}
