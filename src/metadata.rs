// src/metadata.rs

use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub mod keys {
    pub const FILE_NAME: &str = "fileName";
    pub const FILE_SIZE: &str = "fileSize";
    pub const FILE_SIZE_BYTES: &str = "fileSizeBytes";
    pub const MIME_TYPE: &str = "mimeType";
    pub const EXTENSION: &str = "extension";
    pub const WIDTH: &str = "width";
    pub const HEIGHT: &str = "height";
    pub const ASPECT_RATIO: &str = "aspectRatio";
    pub const MAKE: &str = "make";
    pub const MODEL: &str = "model";
    pub const DATE_TAKEN: &str = "dateTaken";
    pub const DATE_TAKEN_RAW: &str = "dateTakenRaw";
    pub const EXPOSURE_TIME: &str = "exposureTime";
    pub const F_NUMBER: &str = "fNumber";
    pub const ISO: &str = "iso";
    pub const FOCAL_LENGTH: &str = "focalLength";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const ALTITUDE: &str = "altitude";
    pub const LOCATION_NAME: &str = "locationName";
}

/// A single primitive metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Null,
}

impl MetadataValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Integer(n) => Some(*n as f64),
            MetadataValue::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Converts a decoded JSON value into a primitive, serializing arrays and
    /// objects to their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => MetadataValue::Null,
            serde_json::Value::Bool(b) => MetadataValue::Text(b.to_string()),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => MetadataValue::Integer(i),
                None => n
                    .as_f64()
                    .map(MetadataValue::Float)
                    .unwrap_or(MetadataValue::Null),
            },
            serde_json::Value::String(s) => MetadataValue::Text(s.clone()),
            nested => MetadataValue::Text(nested.to_string()),
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Integer(n) => write!(f, "{}", n),
            MetadataValue::Float(n) => write!(f, "{}", n),
            MetadataValue::Text(s) => f.write_str(s),
            MetadataValue::Null => f.write_str("null"),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Text(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Text(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(n: i64) -> Self {
        MetadataValue::Integer(n)
    }
}

impl From<u32> for MetadataValue {
    fn from(n: u32) -> Self {
        MetadataValue::Integer(n as i64)
    }
}

impl From<f64> for MetadataValue {
    fn from(n: f64) -> Self {
        MetadataValue::Float(n)
    }
}

/// Flat, normalized metadata for one uploaded image.
///
/// Built once by the normalizer; read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataRecord {
    fields: BTreeMap<String, MetadataValue>,
}

impl MetadataRecord {
    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataValue)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn insert(&mut self, key: &str, value: impl Into<MetadataValue>) {
        self.fields.insert(key.to_string(), value.into());
    }

    /// Inserts unless the key is already set. Returns whether it was inserted.
    pub(crate) fn insert_if_absent(&mut self, key: &str, value: impl Into<MetadataValue>) -> bool {
        if self.fields.contains_key(key) {
            return false;
        }
        self.fields.insert(key.to_string(), value.into());
        true
    }
}

impl<K: Into<String>, V: Into<MetadataValue>> FromIterator<(K, V)> for MetadataRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        MetadataRecord {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

const SIZE_UNITS: [&str; 7] = ["Bytes", "KB", "MB", "GB", "TB", "PB", "EB"];

/// Formats a byte count with base-1024 units, e.g. `1536` -> `"1.5 KB"`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let mut rounded = round2(value);
    if rounded >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        rounded = round2(value / 1024.0);
        unit += 1;
    }

    format!("{} {}", trim_decimal(rounded), SIZE_UNITS[unit])
}

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn trim_decimal(value: f64) -> String {
    let text = format!("{:.2}", value);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

lazy_static! {
    static ref EXIF_TIMESTAMP: Regex =
        Regex::new(r"^\d{4}:\d{2}:\d{2} \d{2}:\d{2}:\d{2}$").unwrap();
    static ref LEADING_FLOAT: Regex =
        Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").unwrap();
    static ref LEADING_INTEGER: Regex = Regex::new(r"^[+-]?\d+").unwrap();
}

/// Reformats an EXIF `YYYY:MM:DD HH:MM:SS` timestamp as
/// `<Month> <day>, <year>, <HH>:<MM>`. Returns `None` when the input does not
/// match or names an impossible date.
pub fn format_exif_timestamp(raw: &str) -> Option<String> {
    if !EXIF_TIMESTAMP.is_match(raw) {
        return None;
    }
    let parsed = NaiveDateTime::parse_from_str(raw, "%Y:%m:%d %H:%M:%S").ok()?;
    Some(parsed.format("%B %-d, %Y, %H:%M").to_string())
}

/// Parses the numeric prefix of `text` as a float, ignoring trailing units.
pub fn parse_leading_float(text: &str) -> Option<f64> {
    let m = LEADING_FLOAT.find(text.trim_start())?;
    m.as_str().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses the numeric prefix of `text` as an integer.
pub fn parse_leading_integer(text: &str) -> Option<i64> {
    let m = LEADING_INTEGER.find(text.trim_start())?;
    m.as_str().parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size_units() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(1), "1 Bytes");
        assert_eq!(format_file_size(1023), "1023 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3 GB");
        assert_eq!(format_file_size(1_234_567), "1.18 MB");
        assert_eq!(format_file_size(1 << 40), "1 TB");
        assert_eq!(format_file_size(u64::MAX), "16 EB");
    }

    #[test]
    fn test_format_file_size_promotes_rounded_overflow() {
        // 1048575 bytes is 1023.999 KB, which rounds to 1024.
        assert_eq!(format_file_size(1_048_575), "1 MB");
    }

    #[test]
    fn test_format_file_size_magnitude_range() {
        for bytes in [
            1u64,
            999,
            1024,
            4096,
            100_000,
            1_048_576,
            52_428_800,
            1 << 33,
            (1 << 40) - 1,
            1 << 40,
            1 << 50,
            u64::MAX,
        ] {
            let formatted = format_file_size(bytes);
            let magnitude: f64 = formatted
                .split(' ')
                .next()
                .and_then(|n| n.parse().ok())
                .unwrap();
            assert!(
                (1.0..1024.0).contains(&magnitude),
                "{} formatted as {}",
                bytes,
                formatted
            );
        }
    }

    #[test]
    fn test_format_exif_timestamp() {
        assert_eq!(
            format_exif_timestamp("2023:05:01 14:07:09").as_deref(),
            Some("May 1, 2023, 14:07")
        );
        assert_eq!(
            format_exif_timestamp("2019:12:31 00:00:00").as_deref(),
            Some("December 31, 2019, 00:00")
        );
    }

    #[test]
    fn test_format_exif_timestamp_rejects_malformed() {
        assert_eq!(format_exif_timestamp("2023-05-01 14:07:09"), None);
        assert_eq!(format_exif_timestamp("2023:5:1 14:07:09"), None);
        assert_eq!(format_exif_timestamp("2023:13:01 14:07:09"), None);
        assert_eq!(format_exif_timestamp(""), None);
    }

    #[test]
    fn test_parse_leading_numbers() {
        assert_eq!(parse_leading_float("2.8"), Some(2.8));
        assert_eq!(parse_leading_float("50 mm"), Some(50.0));
        assert_eq!(parse_leading_float("-12.5"), Some(-12.5));
        assert_eq!(parse_leading_float("f/2.8"), None);
        assert_eq!(parse_leading_float("abc"), None);
        assert_eq!(parse_leading_integer("400"), Some(400));
        assert_eq!(parse_leading_integer("100, 200"), Some(100));
        assert_eq!(parse_leading_integer("ISO"), None);
    }

    #[test]
    fn test_metadata_value_from_json_flattens_nested() {
        assert_eq!(
            MetadataValue::from_json(&serde_json::json!([8, 8, 8])),
            MetadataValue::Text("[8,8,8]".to_string())
        );
        assert_eq!(
            MetadataValue::from_json(&serde_json::json!({"a": 1})),
            MetadataValue::Text("{\"a\":1}".to_string())
        );
        assert_eq!(
            MetadataValue::from_json(&serde_json::json!(3)),
            MetadataValue::Integer(3)
        );
        assert_eq!(
            MetadataValue::from_json(&serde_json::json!(null)),
            MetadataValue::Null
        );
    }

    #[test]
    fn test_record_serializes_flat() {
        let record: MetadataRecord = vec![
            (keys::FILE_NAME, MetadataValue::from("a.jpg")),
            (keys::WIDTH, MetadataValue::from(640u32)),
            (keys::ASPECT_RATIO, MetadataValue::from(1.33)),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"aspectRatio": 1.33, "fileName": "a.jpg", "width": 640})
        );
    }
}
