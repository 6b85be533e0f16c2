//! Fixture builders shared by the integration tests

#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use xmlwriter::{Indent, Options, XmlWriter};
use zip::write::SimpleFileOptions;

pub const FLASHPRINT_GCODE: &str = ";generated by ffslicer 2.4.4 05/04/25 17:52:28\n\
;machine_type: Adventurer 5M Pro\n\
;right_extruder_material: PLA\n\
;left_extruder_material: PLA\n\
;layer_height: 0.2\n\
;start gcode\n\
M118 X62.00 Y62.00 Z0.20 T0\n\
G90\n\
G28\n";

pub const GX_NATIVE_TEXT: &str = ";generated by ffslicer 2.4.4 05/13/25 09:41:07\n\
;machine_type: Adventurer 4 Series\n\
;right_extruder_material: PLA\n\
;start gcode\n\
G28\n";

pub const GX_CONVERTED_TEXT: &str = "; HEADER_BLOCK_START\n\
; generated by OrcaSlicer 2.3.1-dev on 2025-05-12 at 21:32:19\n\
; model printing time: 3h 10m 2s; total estimated time: 3h 25m 34s\n\
; HEADER_BLOCK_END\n\
G28\n\
; filament used [mm] = 13440.11\n\
; filament used [g] = 40.09\n\
; total filament used [g] = 40.09\n\
; CONFIG_BLOCK_START\n\
; filament_type = PLA\n\
; filament_colour = #FFFFFF\n\
; printer_model = Flashforge Adventurer 4 Series\n\
; CONFIG_BLOCK_END\n";

/// A filament row of `slice_info.config`
pub struct LedgerFilament<'a> {
    pub id: &'a str,
    pub filament_type: &'a str,
    pub color: &'a str,
    pub used_m: &'a str,
    pub used_g: &'a str,
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Png)
}

pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Bmp)
}

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 16) as u8, (y * 16) as u8, 128])
    }));
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, format)
        .expect("Failed to encode test image");
    out.into_inner()
}

/// Orca-Flashforge G-code with one used filament slot
pub fn orca_gcode(with_thumbnail: bool) -> String {
    let mut text = String::from("; HEADER_BLOCK_START\n");
    text.push_str("; generated by Orca-Flashforge 1.1.0 on 2024-12-03 at 15:16:09\n");
    text.push_str("; total layer number: 42\n");
    text.push_str("; HEADER_BLOCK_END\n\n");

    if with_thumbnail {
        for (width, height) in [(16, 16), (64, 64)] {
            let payload = STANDARD.encode(png_bytes(width, height));
            text.push_str("; THUMBNAIL_BLOCK_START\n");
            text.push_str(&format!(
                "; thumbnail begin {}x{} {}\n",
                width,
                height,
                payload.len()
            ));
            for chunk in payload.as_bytes().chunks(78) {
                text.push_str("; ");
                text.push_str(std::str::from_utf8(chunk).expect("ascii payload"));
                text.push('\n');
            }
            text.push_str("; thumbnail end\n; THUMBNAIL_BLOCK_END\n\n");
        }
    }

    text.push_str("G28\nG1 Z5 F600\n");
    text.push_str("; filament used [mm] = 1219.86\n");
    text.push_str("; filament used [cm3] = 2.93\n");
    text.push_str("; filament used [g] = 3.64\n");
    text.push_str("; filament cost = 0.07\n");
    text.push_str("; total filament used [g] = 3.64\n");
    text.push_str("; estimated printing time (normal mode) = 7m 13s\n\n");
    text.push_str("; CONFIG_BLOCK_START\n");
    text.push_str("; filament_colour = #C0C0C0\n");
    text.push_str("; filament_type = PLA\n");
    text.push_str("; printer_model = Flashforge Adventurer 5M Pro\n");
    text.push_str("; CONFIG_BLOCK_END\n");
    text
}

/// A `.gx` container around `text`
pub fn gx_bytes(text: &str, print_time_s: u32, filament_mm: u32) -> Vec<u8> {
    let bmp = bmp_bytes(16, 16);
    let bitmap_offset: u32 = 0x3A;
    let gcode_offset = bitmap_offset + bmp.len() as u32;

    let mut bytes = Vec::new();
    let mut magic = [0u8; 16];
    magic[..11].copy_from_slice(b"xgcode 1.0\n");
    bytes.extend_from_slice(&magic);
    for value in [
        bitmap_offset,
        gcode_offset,
        gcode_offset,
        print_time_s,
        filament_mm,
        0,
    ] {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    for setting in [1u16, 200, 2, 60, 60, 210, 0, 0, 0] {
        bytes.extend_from_slice(&setting.to_le_bytes());
    }
    bytes.extend_from_slice(&bmp);
    bytes.extend_from_slice(text.as_bytes());
    bytes
}

/// `slice_info.config` with a single plate
pub fn slice_info(
    plate_index: u32,
    printer_model_id: &str,
    objects: &[&str],
    filaments: &[LedgerFilament<'_>],
) -> String {
    let mut writer = XmlWriter::new(Options {
        use_single_quote: false,
        indent: Indent::Spaces(2),
        attributes_indent: Indent::None,
    });

    writer.start_element("config");
    writer.start_element("header");
    writer.start_element("header_item");
    writer.write_attribute("key", "X-BBL-Client-Type");
    writer.write_attribute("value", "slicer");
    writer.end_element();
    writer.end_element();

    writer.start_element("plate");
    for (key, value) in [
        ("index", plate_index.to_string()),
        ("printer_model_id", printer_model_id.to_string()),
        ("support_used", "false".to_string()),
    ] {
        writer.start_element("metadata");
        writer.write_attribute("key", key);
        writer.write_attribute("value", &value);
        writer.end_element();
    }
    for name in objects {
        writer.start_element("object");
        writer.write_attribute("identify_id", "87");
        writer.write_attribute("name", name);
        writer.write_attribute("skipped", "false");
        writer.end_element();
    }
    for filament in filaments {
        writer.start_element("filament");
        writer.write_attribute("id", filament.id);
        writer.write_attribute("type", filament.filament_type);
        writer.write_attribute("color", filament.color);
        writer.write_attribute("used_m", filament.used_m);
        writer.write_attribute("used_g", filament.used_g);
        writer.end_element();
    }
    writer.end_element();
    writer.end_element();

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}",
        writer.end_document()
    )
}

/// Write a ZIP archive with the given entries
pub fn write_archive(path: &Path, entries: &[(&str, Vec<u8>)]) {
    let file = fs::File::create(path).expect("Failed to create archive");
    let mut zip = zip::ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, content) in entries {
        zip.start_file(*name, options)
            .expect("Failed to start archive entry");
        zip.write_all(content).expect("Failed to write archive entry");
    }
    zip.finish().expect("Failed to finish archive");
}

pub fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("Failed to write test file");
    path
}
