use bytes::Bytes;
use dt_core::config::VisionConfig;
use dt_core::vision::{ExplanationRequest, JPEG_MIME, SCREENSHOT_FILE_NAME};
use dt_core::VisionError;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde_json::Value;
use tracing::{debug, warn};

/// Fetches screenshots from the device and asks the vision service about them.
#[derive(Debug, Clone)]
pub struct VisionClient {
    http: reqwest::Client,
    config: VisionConfig,
}

impl VisionClient {
    pub fn new(config: VisionConfig) -> Result<Self, VisionError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(map_request_error)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    pub fn screenshot_url(&self) -> String {
        format!(
            "{}/screenshot",
            self.config.screenshot_base_url.trim_end_matches('/')
        )
    }

    pub async fn try_fetch_screenshot(&self) -> Result<Bytes, VisionError> {
        let url = self.screenshot_url();
        debug!(url = %url, "fetching screenshot");
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.token)
            .timeout(self.config.screenshot_timeout)
            .send()
            .await
            .map_err(map_request_error)?;
        ensure_success(response)?
            .bytes()
            .await
            .map_err(map_request_error)
    }

    /// `None` on any failure; the cause is logged.
    pub async fn fetch_screenshot(&self) -> Option<Bytes> {
        match self.try_fetch_screenshot().await {
            Ok(image) => Some(image),
            Err(err) => {
                warn!(error = %err, "failed to fetch screenshot");
                None
            }
        }
    }

    pub async fn try_explain(&self, request: &ExplanationRequest) -> Result<Value, VisionError> {
        if !request.has_image() {
            return Err(VisionError::EmptyImage);
        }
        let length = request.image.len() as u64;
        let part = Part::stream_with_length(request.image.clone(), length)
            .file_name(SCREENSHOT_FILE_NAME)
            .mime_str(JPEG_MIME)
            .map_err(map_request_error)?;
        let form = Form::new()
            .part("file", part)
            .text("question", request.question.clone());

        debug!(url = %self.config.vision_explain_url, bytes = request.image.len(), "uploading screenshot");
        let response = self
            .http
            .post(&self.config.vision_explain_url)
            .bearer_auth(&self.config.token)
            .timeout(self.config.explain_timeout)
            .multipart(form)
            .send()
            .await
            .map_err(map_request_error)?;
        ensure_success(response)?
            .json::<Value>()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    VisionError::Timeout
                } else {
                    VisionError::InvalidBody {
                        reason: err.to_string(),
                    }
                }
            })
    }

    /// `None` on any failure, including an empty image, which never reaches
    /// the network.
    pub async fn explain(&self, request: &ExplanationRequest) -> Option<Value> {
        match self.try_explain(request).await {
            Ok(explanation) => Some(explanation),
            Err(err) => {
                warn!(error = %err, "failed to get explanation");
                None
            }
        }
    }
}

fn ensure_success(response: Response) -> Result<Response, VisionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(VisionError::Status {
        status: status.as_u16(),
        url: response.url().to_string(),
    })
}

fn map_request_error(err: reqwest::Error) -> VisionError {
    if err.is_timeout() {
        return VisionError::Timeout;
    }
    VisionError::Transport {
        reason: err.to_string(),
    }
}
