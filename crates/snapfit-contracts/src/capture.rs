use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// A normalized JPEG capture handed to the identification flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    base64: String,
    uri: String,
}

impl CapturedImage {
    pub fn new(base64: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            base64: base64.into(),
            uri: uri.into(),
        }
    }

    pub fn from_jpeg_bytes(bytes: &[u8], uri: impl Into<String>) -> Self {
        Self::new(BASE64.encode(bytes), uri)
    }

    pub fn base64(&self) -> &str {
        &self.base64
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", self.base64)
    }
}

/// The "last capture" record read back by the app on resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCapture<R> {
    pub image_uri: String,
    pub timestamp: i64,
    pub result: Option<R>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{CapturedImage, StoredCapture};

    #[test]
    fn data_url_wraps_payload_as_jpeg() {
        let image = CapturedImage::from_jpeg_bytes(b"\xff\xd8\xff", "file:///tmp/capture.jpg");
        assert_eq!(image.base64(), "/9j/");
        assert_eq!(image.data_url(), "data:image/jpeg;base64,/9j/");
        assert_eq!(image.uri(), "file:///tmp/capture.jpg");
    }

    #[test]
    fn stored_capture_uses_camel_case_keys() -> anyhow::Result<()> {
        let capture: StoredCapture<String> = StoredCapture {
            image_uri: "file:///tmp/capture.jpg".to_string(),
            timestamp: 1_700_000_000_000,
            result: None,
        };
        let value = serde_json::to_value(&capture)?;
        assert_eq!(
            value,
            json!({"imageUri": "file:///tmp/capture.jpg", "timestamp": 1_700_000_000_000_i64, "result": null})
        );
        Ok(())
    }
}
