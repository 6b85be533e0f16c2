//! Metadata records produced by the parsers
//!
//! Every record starts from its sentinel defaults and is replaced wholesale
//! when a header cannot be read, never cleared field by field.

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::helpers::{compact_duration, parse_float_or_default, parse_slice_time};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

pub const UNKNOWN: &str = "Unknown";
pub const ERROR: &str = "Error";

lazy_static! {
    static ref ETA_PRINTING_TIME: Regex =
        Regex::new(r"estimated printing time(.*)=\s*((?:\d+h\s*)?(?:\d+m\s*)?(?:\d+s)?)")
            .expect("valid ETA regex");
    static ref ETA_TOTAL_TIME: Regex =
        Regex::new(r"total estimated time:\s*((?:\d+h\s*)?(?:\d+m\s*)?(?:\d+s)?)")
            .expect("valid ETA regex");
    static ref ETA_FALLBACK: Regex =
        Regex::new(r"=\s*((?:\d+h\s*)?(?:\d+m\s*)?(?:\d+s)?)").expect("valid ETA regex");
}

/// Slicer lineage a file was produced by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SlicerType {
    #[default]
    Unknown,
    FlashPrint,
    OrcaFF,
    LegacyGX,
}

impl SlicerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlicerType::Unknown => "Unknown",
            SlicerType::FlashPrint => "FlashPrint",
            SlicerType::OrcaFF => "OrcaFF",
            SlicerType::LegacyGX => "LegacyGX",
        }
    }
}

impl fmt::Display for SlicerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token layout of a `generated by` header line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLayout {
    /// `generated by <name> <version> <date> <time>`
    FlashPrint,
    /// `generated by <name> <version> on <date> at <time>`
    Orca,
}

impl HeaderLayout {
    /// The layout a slicer type writes; `None` for [`SlicerType::Unknown`]
    pub fn for_slicer(slicer: SlicerType) -> Option<Self> {
        match slicer {
            SlicerType::FlashPrint => Some(HeaderLayout::FlashPrint),
            SlicerType::OrcaFF | SlicerType::LegacyGX => Some(HeaderLayout::Orca),
            SlicerType::Unknown => None,
        }
    }

    /// Guess the layout from the line itself (`on` as the fifth token)
    pub fn detect(line: &str) -> Self {
        let tokens = header_tokens(line);
        if tokens.len() >= 8 && tokens[4] == "on" {
            HeaderLayout::Orca
        } else {
            HeaderLayout::FlashPrint
        }
    }
}

fn header_tokens(line: &str) -> Vec<&str> {
    let line = line.trim();
    line.strip_prefix(';')
        .unwrap_or(line)
        .split_whitespace()
        .collect()
}

/// Slicer identity and slice timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct SlicerMeta {
    pub slicer_name: String,
    pub slicer_version: String,
    pub slice_date: String,
    pub slice_time: String,
    /// Compact duration token such as `3h25m34s`
    pub print_eta: Option<String>,
    pub slicer: SlicerType,
}

impl Default for SlicerMeta {
    fn default() -> Self {
        Self {
            slicer_name: UNKNOWN.to_string(),
            slicer_version: ERROR.to_string(),
            slice_date: ERROR.to_string(),
            slice_time: ERROR.to_string(),
            print_eta: None,
            slicer: SlicerType::Unknown,
        }
    }
}

impl SlicerMeta {
    /// Build the record from a `generated by` header line.
    ///
    /// A line that does not fit `layout` yields the sentinel record and a
    /// [`DiagnosticKind::MalformedHeader`] warning.
    pub fn from_generated_by(
        slicer: SlicerType,
        layout: HeaderLayout,
        line: &str,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let tokens = header_tokens(line);

        let fields = match layout {
            // ;generated by ffslicer 2.4.4 12/03/24 15:13:28
            HeaderLayout::FlashPrint if tokens.len() >= 6 => {
                Some((tokens[2], tokens[3], tokens[4], tokens[5]))
            }
            // ; generated by Orca-Flashforge 1.1.0 on 2024-12-03 at 15:16:09
            HeaderLayout::Orca if tokens.len() >= 8 && tokens[1] == "by" => {
                Some((tokens[2], tokens[3], tokens[5], tokens[7]))
            }
            _ => None,
        };

        let Some((name, version, date, raw_time)) = fields else {
            diagnostics.warn(
                DiagnosticKind::MalformedHeader,
                format!("Invalid {} header line: \"{}\"", slicer, line.trim()),
            );
            return Self::default();
        };

        let slice_time = match parse_slice_time(raw_time) {
            Some(time) => time,
            None => {
                diagnostics.warn(
                    DiagnosticKind::InvalidSliceTime,
                    format!("Cannot parse slice time \"{}\"", raw_time),
                );
                ERROR.to_string()
            }
        };

        Self {
            slicer_name: name.to_string(),
            slicer_version: version.to_string(),
            slice_date: date.to_string(),
            slice_time,
            print_eta: None,
            slicer,
        }
    }

    /// Sentinel record for a file whose header line is missing entirely
    pub fn missing_header(slicer: SlicerType, diagnostics: &mut Diagnostics) -> Self {
        diagnostics.warn(
            DiagnosticKind::MalformedHeader,
            format!("No \"generated by\" line found in {} content", slicer),
        );
        Self::default()
    }

    /// Apply the first ETA line that yields a duration; warns for each line
    /// that does not.
    pub fn with_eta<'a, I>(mut self, eta_lines: I, diagnostics: &mut Diagnostics) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        for line in eta_lines {
            match parse_eta(line) {
                Some(eta) => {
                    self.print_eta = Some(eta);
                    break;
                }
                None => diagnostics.warn(
                    DiagnosticKind::UnparsableEta,
                    format!("Could not parse ETA line: \"{}\"", line.trim()),
                ),
            }
        }
        self
    }

    /// True when the four header fields hold parsed values
    pub fn has_header(&self) -> bool {
        self.slicer != SlicerType::Unknown
    }
}

/// Extract a compact duration from a single ETA comment line
pub fn parse_eta(line: &str) -> Option<String> {
    let cleaned = line.trim_start().trim_start_matches(';').trim();

    let candidates = [
        ETA_PRINTING_TIME.captures(cleaned).and_then(|c| c.get(2)),
        ETA_TOTAL_TIME.captures(cleaned).and_then(|c| c.get(1)),
        ETA_FALLBACK.captures(cleaned).and_then(|c| c.get(1)),
    ];

    candidates
        .into_iter()
        .flatten()
        .map(|m| compact_duration(m.as_str()))
        .find(|eta| !eta.is_empty())
}

/// One filament slot and its usage
#[derive(Debug, Clone, PartialEq)]
pub struct FilamentInfo {
    pub id: String,
    pub filament_type: String,
    pub color: Option<String>,
    /// Meters, two decimals
    pub used_m: String,
    /// Grams
    pub used_g: String,
}

impl FilamentInfo {
    pub fn used_m_value(&self) -> f64 {
        parse_float_or_default(Some(&self.used_m))
    }

    pub fn used_g_value(&self) -> f64 {
        parse_float_or_default(Some(&self.used_g))
    }

    /// A slot counts as used when either usage figure is positive
    pub fn is_used(&self) -> bool {
        self.used_m_value() > 0.0 || self.used_g_value() > 0.0
    }
}

/// Keep only the slots that were actually printed with
pub fn filter_used(filaments: &[FilamentInfo]) -> Vec<FilamentInfo> {
    filaments.iter().filter(|f| f.is_used()).cloned().collect()
}

/// Print-job metadata taken from the file body
#[derive(Debug, Clone, PartialEq)]
pub struct SlicerFileMeta {
    /// `data:image/png;base64,...`
    pub thumbnail: Option<String>,
    pub filament_used_mm: f64,
    pub filament_used_g: f64,
    pub filament_type: String,
    pub printer_model: String,
    pub slice_soft: SlicerType,
    pub filaments: Vec<FilamentInfo>,
}

impl SlicerFileMeta {
    pub fn new(slice_soft: SlicerType) -> Self {
        Self {
            thumbnail: None,
            filament_used_mm: 0.0,
            filament_used_g: 0.0,
            filament_type: UNKNOWN.to_string(),
            printer_model: UNKNOWN.to_string(),
            slice_soft,
            filaments: Vec::new(),
        }
    }
}

impl Default for SlicerFileMeta {
    fn default() -> Self {
        Self::new(SlicerType::Unknown)
    }
}
