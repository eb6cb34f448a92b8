use bytes::Bytes;

pub const SCREENSHOT_FILE_NAME: &str = "screenshot.jpg";
pub const JPEG_MIME: &str = "image/jpeg";

/// A screenshot plus the question asked about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplanationRequest {
    pub image: Bytes,
    pub question: String,
}

impl ExplanationRequest {
    pub fn new(image: impl Into<Bytes>, question: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            question: question.into(),
        }
    }

    pub fn has_image(&self) -> bool {
        !self.image.is_empty()
    }
}
