pub mod exif;
pub mod image;
