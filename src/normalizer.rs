use crate::decoder::{ImageProbe, TagDecoder, TagMap};
use crate::error::AppError;
use crate::geocoder::PlaceResolver;
use crate::metadata::{
    format_exif_timestamp, format_file_size, keys, parse_leading_float, parse_leading_integer,
    round2, MetadataRecord, MetadataValue,
};
use crate::upload::UploadedImage;
use std::sync::Arc;

/// Builds a flat `MetadataRecord` from an uploaded file.
///
/// Normalization never fails: decode errors are logged and the record falls
/// back to whatever could be read, at minimum the file attributes.
#[derive(Clone)]
pub struct MetadataNormalizer {
    tag_decoder: Arc<dyn TagDecoder>,
    image_probe: Arc<dyn ImageProbe>,
    place_resolver: Option<Arc<dyn PlaceResolver>>,
}

impl MetadataNormalizer {
    pub fn new(tag_decoder: Arc<dyn TagDecoder>, image_probe: Arc<dyn ImageProbe>) -> Self {
        Self {
            tag_decoder,
            image_probe,
            place_resolver: None,
        }
    }

    pub fn with_place_resolver(mut self, resolver: Arc<dyn PlaceResolver>) -> Self {
        self.place_resolver = Some(resolver);
        self
    }

    pub async fn normalize(&self, upload: &UploadedImage) -> MetadataRecord {
        log::info!(
            "Normalizing metadata for {} ({} bytes)",
            upload.file_name,
            upload.len()
        );
        let mut record = file_attributes(upload);

        let probe = self.image_probe.clone();
        let probe_bytes = upload.bytes.clone();
        let dimensions_task = tokio::task::spawn_blocking(move || probe.dimensions(&probe_bytes));

        let decoder = self.tag_decoder.clone();
        let decoder_bytes = upload.bytes.clone();
        let tags_task = tokio::task::spawn_blocking(move || decoder.decode(&decoder_bytes));

        let (dimensions, tags) = futures::join!(dimensions_task, tags_task);

        match dimensions {
            Ok(Ok((width, height))) => insert_dimensions(&mut record, width as i64, height as i64),
            Ok(Err(e)) => log::warn!("Could not read dimensions of {}: {}", upload.file_name, e),
            Err(e) => log::error!("Dimension probe task failed: {}", e),
        }

        let tags = match tags {
            Ok(Ok(tags)) => tags,
            Ok(Err(e)) => {
                log::debug!("No metadata tags in {}: {}", upload.file_name, e);
                TagMap::new()
            }
            Err(e) => {
                log::error!("Tag decode task failed: {}", e);
                TagMap::new()
            }
        };
        apply_tags(&mut record, tags);

        if let Some(resolver) = &self.place_resolver {
            resolve_place(&mut record, resolver.as_ref()).await;
        }

        log::debug!("Normalized {} metadata fields for {}", record.len(), upload.file_name);
        record
    }
}

fn file_attributes(upload: &UploadedImage) -> MetadataRecord {
    let mut record = MetadataRecord::default();
    record.insert(keys::FILE_NAME, upload.file_name.as_str());
    record.insert(keys::FILE_SIZE, format_file_size(upload.len() as u64));
    record.insert(keys::FILE_SIZE_BYTES, upload.len() as i64);
    record.insert(keys::MIME_TYPE, upload.mime_type.as_str());
    record.insert(keys::EXTENSION, upload.extension());
    record
}

fn insert_dimensions(record: &mut MetadataRecord, width: i64, height: i64) {
    let inserted_width = record.insert_if_absent(keys::WIDTH, width);
    let inserted_height = record.insert_if_absent(keys::HEIGHT, height);
    if inserted_width && inserted_height && height > 0 {
        record.insert_if_absent(keys::ASPECT_RATIO, round2(width as f64 / height as f64));
    }
}

fn take_text(tags: &mut TagMap, name: &str) -> Option<String> {
    tags.remove(name).and_then(|t| t.as_text())
}

/// Folds decoded tags into the record. Well-known tags are reshaped, the
/// rest pass through under their own names. Existing keys are never replaced.
pub(crate) fn apply_tags(record: &mut MetadataRecord, mut tags: TagMap) {
    if let Some(make) = take_text(&mut tags, "Make") {
        record.insert_if_absent(keys::MAKE, make);
    }
    if let Some(model) = take_text(&mut tags, "Model") {
        record.insert_if_absent(keys::MODEL, model);
    }

    let original = take_text(&mut tags, "DateTimeOriginal");
    let timestamp = match original {
        Some(ts) => Some(ts),
        None => take_text(&mut tags, "DateTime"),
    };
    if let Some(raw) = timestamp {
        let display = format_exif_timestamp(&raw).unwrap_or_else(|| {
            log::debug!("Keeping unrecognized timestamp as-is: {}", raw);
            raw.clone()
        });
        record.insert_if_absent(keys::DATE_TAKEN, display);
        record.insert_if_absent(keys::DATE_TAKEN_RAW, raw);
    }

    if let Some(exposure) = take_text(&mut tags, "ExposureTime") {
        record.insert_if_absent(keys::EXPOSURE_TIME, exposure);
    }
    if let Some(f_number) = take_text(&mut tags, "FNumber").and_then(|t| parse_leading_float(&t)) {
        record.insert_if_absent(keys::F_NUMBER, f_number);
    }
    if let Some(iso) =
        take_text(&mut tags, "PhotographicSensitivity").and_then(|t| parse_leading_integer(&t))
    {
        record.insert_if_absent(keys::ISO, iso);
    }
    if let Some(focal) =
        take_text(&mut tags, "FocalLength").and_then(|t| parse_leading_float(&t))
    {
        record.insert_if_absent(keys::FOCAL_LENGTH, focal);
    }

    let latitude = take_text(&mut tags, "GPSLatitude").and_then(|t| parse_leading_float(&t));
    let latitude_ref = take_text(&mut tags, "GPSLatitudeRef");
    let longitude = take_text(&mut tags, "GPSLongitude").and_then(|t| parse_leading_float(&t));
    let longitude_ref = take_text(&mut tags, "GPSLongitudeRef");
    if let (Some(lat), Some(lon)) = (latitude, longitude) {
        let (lat, lon) = signed_coordinates(
            lat,
            latitude_ref.as_deref(),
            lon,
            longitude_ref.as_deref(),
        );
        record.insert_if_absent(keys::LATITUDE, lat);
        record.insert_if_absent(keys::LONGITUDE, lon);
    }
    if let Some(altitude) = take_text(&mut tags, "GPSAltitude").and_then(|t| parse_leading_float(&t)) {
        record.insert_if_absent(keys::ALTITUDE, altitude);
    }

    let width = take_text(&mut tags, "PixelXDimension");
    let height = take_text(&mut tags, "PixelYDimension");
    let image_width = take_text(&mut tags, "ImageWidth");
    let image_length = take_text(&mut tags, "ImageLength");
    let width = width.or(image_width).and_then(|t| parse_leading_integer(&t));
    let height = height.or(image_length).and_then(|t| parse_leading_integer(&t));
    if let (Some(width), Some(height)) = (width, height) {
        insert_dimensions(record, width, height);
    }

    for (name, tag) in tags {
        record.insert_if_absent(&name, MetadataValue::from_json(&tag.description));
    }
}

/// Applies hemisphere signs: latitude stays positive only for `N`, longitude
/// only for `E`.
pub fn signed_coordinates(
    latitude: f64,
    latitude_ref: Option<&str>,
    longitude: f64,
    longitude_ref: Option<&str>,
) -> (f64, f64) {
    let lat = if latitude_ref.map(str::trim) == Some("N") {
        latitude
    } else {
        -latitude
    };
    let lon = if longitude_ref.map(str::trim) == Some("E") {
        longitude
    } else {
        -longitude
    };
    (lat, lon)
}

async fn resolve_place(record: &mut MetadataRecord, resolver: &dyn PlaceResolver) {
    let latitude = record.get(keys::LATITUDE).and_then(MetadataValue::as_f64);
    let longitude = record.get(keys::LONGITUDE).and_then(MetadataValue::as_f64);
    let (Some(lat), Some(lon)) = (latitude, longitude) else {
        return;
    };

    match resolver.resolve(lat, lon).await {
        Ok(Some(place)) => {
            record.insert_if_absent(keys::LOCATION_NAME, place);
        }
        Ok(None) => log::debug!("No place name for {}, {}", lat, lon),
        Err(AppError::Http(e)) if e.is_timeout() => {
            log::warn!("Reverse geocoding timed out for {}, {}", lat, lon)
        }
        Err(e) => log::warn!("Reverse geocoding failed: {}", e),
    }
}
