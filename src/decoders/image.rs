use crate::decoder::ImageProbe;
use crate::error::AppError;
use image::io::Reader as ImageReader;
use std::io::Cursor;

/// `ImageProbe` backed by the `image` crate. Reads the header only.
#[derive(Debug, Default, Clone)]
pub struct ImageCrateProbe;

impl ImageCrateProbe {
    pub fn new() -> Self {
        ImageCrateProbe
    }
}

impl ImageProbe for ImageCrateProbe {
    fn dimensions(&self, bytes: &[u8]) -> Result<(u32, u32), AppError> {
        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        log::trace!("Guessed image format: {:?}", reader.format());
        let (width, height) = reader.into_dimensions()?;
        log::debug!("Image dimensions: {}x{}", width, height);
        Ok((width, height))
    }
}
