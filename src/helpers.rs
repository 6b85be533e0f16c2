//! Stateless time, unit and encoding conversions shared by all parsers

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::NaiveTime;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LEADING_NUMBER: Regex =
        Regex::new(r"^\s*[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("valid number regex");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid whitespace regex");
}

/// Convert a 24-hour `HH:mm:ss` slice time to `h:mm AM/PM`
pub fn parse_slice_time(raw: &str) -> Option<String> {
    let time = NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S").ok()?;
    Some(time.format("%-I:%M %p").to_string())
}

/// Parse the leading number of a value, 0.0 when absent or unparsable.
///
/// Only the numeric prefix is read, so per-extruder lists such as
/// `"1219.86, 0.00"` yield their first entry.
pub fn parse_float_or_default(value: Option<&str>) -> f64 {
    value
        .and_then(|v| LEADING_NUMBER.find(v))
        .and_then(|m| m.as_str().trim().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

/// Millimeters to a meters string with exactly two decimals
pub fn format_meters(mm: f64) -> String {
    format!("{:.2}", mm / 1000.0)
}

pub fn format_grams(grams: f64) -> String {
    format!("{:.2}", grams)
}

/// Seconds to a compact duration token, leading zero units omitted
pub fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Prefix of every thumbnail and plate image handed to callers
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Wrap raw PNG bytes as a data URL
pub fn png_data_url(png: &[u8]) -> String {
    format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(png))
}

/// Remove all whitespace from a duration token ("37m 30s" -> "37m30s")
pub fn compact_duration(token: &str) -> String {
    WHITESPACE.replace_all(token.trim(), "").into_owned()
}
