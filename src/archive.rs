//! Read access to ZIP-based project archives
//!
//! Entries are read straight into memory; nothing is extracted to disk.

use crate::error::{Result, ResultExt, SlicerMetaError};
use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::{debug, info};
use zip::result::ZipError;
use zip::ZipArchive;

pub const SLICE_INFO_ENTRY: &str = "Metadata/slice_info.config";

lazy_static! {
    static ref PLATE_IMAGE: Regex =
        Regex::new(r"^Metadata/plate_(\d+)\.png$").expect("valid plate image regex");
    static ref PLATE_GCODE: Regex =
        Regex::new(r"^Metadata/plate_(\d+)\.gcode$").expect("valid plate gcode regex");
}

/// Per-plate entry families stored under `Metadata/`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlateKind {
    Image,
    GCode,
}

impl PlateKind {
    fn pattern(&self) -> &'static Regex {
        match self {
            PlateKind::Image => &PLATE_IMAGE,
            PlateKind::GCode => &PLATE_GCODE,
        }
    }
}

/// `Metadata/plate_<index>.<ext>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlateEntry {
    pub index: u32,
    pub name: String,
}

/// A project archive opened for reading
pub struct ProjectArchive<R> {
    archive: ZipArchive<R>,
}

impl ProjectArchive<File> {
    /// Open an archive on disk
    pub fn open(path: &Path) -> Result<Self> {
        info!("Opening project archive: {}", path.display());

        let file = File::open(path).map_err(|e| SlicerMetaError::file_access(path, e))?;
        let archive = ZipArchive::new(file)
            .map_err(|e| SlicerMetaError::file_access(path, format!("Invalid ZIP file: {}", e)))?;

        debug!("Archive holds {} entries", archive.len());
        Ok(Self { archive })
    }
}

impl<R: Read + Seek> ProjectArchive<R> {
    /// Wrap an archive that is already in memory or otherwise open
    pub fn from_reader(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader).context("Invalid ZIP file")?;
        Ok(Self { archive })
    }

    /// Entry contents, or `None` when no such entry exists
    pub fn read_entry(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e).with_entry_context(name),
        };

        let mut content = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut content)
            .with_entry_context(name)?;

        debug!("Read {} bytes from {}", content.len(), name);
        Ok(Some(content))
    }

    /// Plate entries of one kind, by ascending plate index
    pub fn plates(&self, kind: PlateKind) -> Vec<PlateEntry> {
        let pattern = kind.pattern();
        let mut plates: Vec<PlateEntry> = self
            .archive
            .file_names()
            .filter_map(|name| {
                let index = pattern.captures(name)?.get(1)?.as_str().parse().ok()?;
                Some(PlateEntry {
                    index,
                    name: name.to_string(),
                })
            })
            .collect();
        plates.sort_by_key(|plate| plate.index);
        plates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    fn archive_with(entries: &[(&str, &str)]) -> ProjectArchive<Cursor<Vec<u8>>> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, content) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        let cursor = zip.finish().unwrap();
        ProjectArchive::from_reader(Cursor::new(cursor.into_inner())).unwrap()
    }

    #[test]
    fn test_plates_sorted_by_index() {
        let archive = archive_with(&[
            ("Metadata/plate_10.gcode", "; a"),
            ("Metadata/plate_2.gcode", "; b"),
            ("Metadata/plate_2.png", "png"),
            ("Metadata/plate_x.gcode", "; c"),
            ("Metadata/plate_3.gcode.md5", "abc"),
        ]);

        let indices: Vec<_> = archive
            .plates(PlateKind::GCode)
            .iter()
            .map(|p| p.index)
            .collect();
        assert_eq!(indices, vec![2, 10]);
        assert_eq!(archive.plates(PlateKind::Image)[0].name, "Metadata/plate_2.png");
    }

    #[test]
    fn test_read_entry() {
        let mut archive = archive_with(&[(SLICE_INFO_ENTRY, "<config/>")]);

        assert_eq!(
            archive.read_entry(SLICE_INFO_ENTRY).unwrap().as_deref(),
            Some(&b"<config/>"[..])
        );
        assert_eq!(archive.read_entry("Metadata/missing").unwrap(), None);
    }

    #[test]
    fn test_open_rejects_non_zip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"definitely not a zip").unwrap();

        let err = ProjectArchive::open(file.path()).err().expect("error");
        assert!(matches!(
            crate::error::find_error(&err),
            Some(SlicerMetaError::FileAccess { .. })
        ));
    }
}
