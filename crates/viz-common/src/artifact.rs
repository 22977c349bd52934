//! Rendered images.

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Content type of PNG artifacts.
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// A rendered image and when it was produced.
///
/// Cloning is cheap: the pixel payload is reference counted.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub data: Bytes,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(data: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            content_type: content_type.into(),
            created_at: Utc::now(),
        }
    }

    pub fn png(data: impl Into<Bytes>) -> Self {
        Self::new(data, PNG_CONTENT_TYPE)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
