use crate::error::AppError;
use std::collections::BTreeMap;

/// One decoded metadata tag.
#[derive(Debug, Clone, PartialEq)]
pub struct TagDescriptor {
    pub description: serde_json::Value,
}

impl TagDescriptor {
    pub fn text(description: impl Into<String>) -> Self {
        TagDescriptor {
            description: serde_json::Value::String(description.into()),
        }
    }

    /// The description as text, if it is a string or a number.
    pub fn as_text(&self) -> Option<String> {
        match &self.description {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

pub type TagMap = BTreeMap<String, TagDescriptor>;

/// Decodes the metadata container embedded in an image file.
pub trait TagDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<TagMap, AppError>;
}

/// Reads the natural pixel size of an encoded image.
pub trait ImageProbe: Send + Sync {
    fn dimensions(&self, bytes: &[u8]) -> Result<(u32, u32), AppError>;
}
