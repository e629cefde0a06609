use crate::decoder::{TagDecoder, TagDescriptor, TagMap};
use crate::error::AppError;
use exif::{Field, In, Rational, Reader, Tag, Value};
use serde_json::{Number, Value as JsonValue};
use std::io::Cursor;

/// `TagDecoder` backed by `kamadak-exif`.
///
/// Only primary-image fields are reported. Descriptions are plain JSON values:
/// text for ASCII tags, numbers for single numeric values, arrays for
/// multi-valued numeric tags, and GPS coordinates as unsigned decimal degrees.
#[derive(Debug, Default, Clone)]
pub struct ExifTagDecoder;

impl ExifTagDecoder {
    pub fn new() -> Self {
        ExifTagDecoder
    }
}

impl TagDecoder for ExifTagDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<TagMap, AppError> {
        let mut cursor = Cursor::new(bytes);
        let exif = Reader::new().read_from_container(&mut cursor)?;

        let mut tags = TagMap::new();
        for field in exif.fields().filter(|f| f.ifd_num == In::PRIMARY) {
            if field.tag == Tag::MakerNote {
                log::trace!("Skipping maker note");
                continue;
            }
            let name = field.tag.to_string();
            log::trace!("Decoded tag {}: {}", name, field.display_value());
            tags.insert(
                name,
                TagDescriptor {
                    description: describe(field),
                },
            );
        }

        log::debug!("Decoded {} EXIF tags", tags.len());
        Ok(tags)
    }
}

fn describe(field: &Field) -> JsonValue {
    if let Value::Rational(parts) = &field.value {
        if field.tag == Tag::GPSLatitude || field.tag == Tag::GPSLongitude {
            if let Some(degrees) = dms_to_degrees(parts) {
                return degrees;
            }
        }
        if field.tag == Tag::ExposureTime && parts.len() == 1 {
            if let Some(text) = exposure_text(&parts[0]) {
                return JsonValue::String(text);
            }
        }
    }

    match &field.value {
        Value::Ascii(parts) => JsonValue::String(ascii_text(parts)),
        Value::Byte(v) => integers(v.iter().map(|n| *n as i64)),
        Value::Short(v) => integers(v.iter().map(|n| *n as i64)),
        Value::Long(v) => integers(v.iter().map(|n| *n as i64)),
        Value::SByte(v) => integers(v.iter().map(|n| *n as i64)),
        Value::SShort(v) => integers(v.iter().map(|n| *n as i64)),
        Value::SLong(v) => integers(v.iter().map(|n| *n as i64)),
        Value::Rational(v) => floats(v.iter().map(|r| r.to_f64()))
            .unwrap_or_else(|| display(field)),
        Value::SRational(v) => floats(v.iter().map(|r| r.to_f64()))
            .unwrap_or_else(|| display(field)),
        Value::Float(v) => floats(v.iter().map(|n| *n as f64)).unwrap_or_else(|| display(field)),
        Value::Double(v) => floats(v.iter().copied()).unwrap_or_else(|| display(field)),
        _ => display(field),
    }
}

fn display(field: &Field) -> JsonValue {
    JsonValue::String(field.display_value().to_string())
}

fn ascii_text(parts: &[Vec<u8>]) -> String {
    parts
        .iter()
        .map(|p| String::from_utf8_lossy(p).trim_matches(char::from(0)).trim().to_string())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn integers(values: impl Iterator<Item = i64>) -> JsonValue {
    let mut numbers: Vec<JsonValue> = values.map(JsonValue::from).collect();
    if numbers.len() == 1 {
        numbers.remove(0)
    } else {
        JsonValue::Array(numbers)
    }
}

/// `None` when any value is not finite (zero denominators).
fn floats(values: impl Iterator<Item = f64>) -> Option<JsonValue> {
    let mut numbers = values
        .map(|v| Number::from_f64(v).map(JsonValue::Number))
        .collect::<Option<Vec<_>>>()?;
    match numbers.len() {
        0 => None,
        1 => Some(numbers.remove(0)),
        _ => Some(JsonValue::Array(numbers)),
    }
}

fn dms_to_degrees(parts: &[Rational]) -> Option<JsonValue> {
    if parts.len() < 3 || parts.iter().any(|r| r.denom == 0) {
        return None;
    }
    let degrees = parts[0].to_f64() + parts[1].to_f64() / 60.0 + parts[2].to_f64() / 3600.0;
    Number::from_f64(degrees).map(JsonValue::Number)
}

fn exposure_text(value: &Rational) -> Option<String> {
    if value.denom == 0 || value.num == 0 {
        return None;
    }
    let seconds = value.to_f64();
    if seconds < 1.0 {
        Some(format!("1/{}", (1.0 / seconds).round()))
    } else {
        Some(format!("{}", seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Little-endian TIFF with IFD0 holding Make="Canon" and Model="EOS".
    fn tiny_tiff() -> Vec<u8> {
        let mut bytes = vec![0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&[0x02, 0x00]);
        bytes.extend_from_slice(&[
            0x0F, 0x01, 0x02, 0x00, 0x06, 0x00, 0x00, 0x00, 0x26, 0x00, 0x00, 0x00,
        ]);
        bytes.extend_from_slice(&[
            0x10, 0x01, 0x02, 0x00, 0x04, 0x00, 0x00, 0x00, b'E', b'O', b'S', 0x00,
        ]);
        bytes.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        bytes.extend_from_slice(b"Canon\0");
        bytes
    }

    #[test]
    fn test_decode_tiff_ascii_tags() {
        let tags = ExifTagDecoder::new().decode(&tiny_tiff()).unwrap();

        assert_eq!(tags.get("Make").and_then(|t| t.as_text()).as_deref(), Some("Canon"));
        assert_eq!(tags.get("Model").and_then(|t| t.as_text()).as_deref(), Some("EOS"));
    }

    #[test]
    fn test_decode_rejects_non_image_bytes() {
        assert!(ExifTagDecoder::new().decode(b"definitely not an image").is_err());
    }

    #[test]
    fn test_dms_to_degrees() {
        let parts = vec![
            Rational { num: 10, denom: 1 },
            Rational { num: 30, denom: 1 },
            Rational { num: 0, denom: 1 },
        ];
        assert_eq!(dms_to_degrees(&parts), Some(serde_json::json!(10.5)));
        assert_eq!(dms_to_degrees(&parts[..2]), None);
    }

    #[test]
    fn test_exposure_text() {
        assert_eq!(exposure_text(&Rational { num: 1, denom: 125 }).as_deref(), Some("1/125"));
        assert_eq!(exposure_text(&Rational { num: 10, denom: 2500 }).as_deref(), Some("1/250"));
        assert_eq!(exposure_text(&Rational { num: 2, denom: 1 }).as_deref(), Some("2"));
        assert_eq!(exposure_text(&Rational { num: 1, denom: 0 }), None);
    }

    #[test]
    fn test_numeric_shapes() {
        assert_eq!(integers(vec![8i64].into_iter()), serde_json::json!(8));
        assert_eq!(integers(vec![8i64, 8, 8].into_iter()), serde_json::json!([8, 8, 8]));
        assert_eq!(floats(vec![2.8].into_iter()), Some(serde_json::json!(2.8)));
        assert_eq!(floats(vec![f64::INFINITY].into_iter()), None);
    }

    #[test]
    fn test_ascii_text_strips_nuls() {
        let parts = vec![b"Canon\0".to_vec(), Vec::new()];
        assert_eq!(ascii_text(&parts), "Canon");
    }
}
