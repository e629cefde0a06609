use std::sync::Arc;

/// An uploaded image file as received from the caller.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl UploadedImage {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        UploadedImage {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes: Arc::from(bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lowercase text after the last `.` of the file name, or empty.
    pub fn extension(&self) -> String {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension() {
        assert_eq!(UploadedImage::new("IMG_01.JPG", "image/jpeg", vec![]).extension(), "jpg");
        assert_eq!(UploadedImage::new("a.b.Png", "image/png", vec![]).extension(), "png");
        assert_eq!(UploadedImage::new("noext", "image/png", vec![]).extension(), "");
    }
}
