//! HTTP client for the attendance service
//!
//! One upload followed by one compute call. Neither call is retried: the
//! service keeps the last upload as global state, so a blind retry could
//! compute attendance over a different upload.

use async_trait::async_trait;
use reqwest::multipart::Form;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{ClientError, ClientResult};
use crate::protocol::{
    CalcOutcome, CalcResponse, HealthResponse, UploadForm, UploadResponse, FRAMES_FIELD,
    FRAME_COUNT_FIELD, PROCESSING_MODE_FIELD, TIMESTAMPS_FIELD,
};

/// Client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Service root, e.g. `http://127.0.0.1:5000`
    pub base_url: String,
    /// Per-request timeout; uploads run image processing server side
    pub request_timeout: Duration,
    /// Multipart field name for the image array
    pub frames_field: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            request_timeout: Duration::from_secs(120),
            frames_field: FRAMES_FIELD.to_string(),
        }
    }
}

impl ClientConfig {
    /// Validate configuration
    pub fn validate(&self) -> ClientResult<()> {
        let url = reqwest::Url::parse(&self.base_url).map_err(|e| ClientError::InvalidUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl {
                url: self.base_url.clone(),
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }

        if self.request_timeout.is_zero() {
            return Err(ClientError::InvalidForm {
                message: "request timeout must be > 0".to_string(),
            });
        }

        if self.frames_field.is_empty() {
            return Err(ClientError::InvalidForm {
                message: "frames field name must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Upload and compute calls, abstracted for callers that drive a session
#[async_trait]
pub trait AttendanceService: Send + Sync {
    /// Post frames and labels; errors unless the service reports success
    async fn upload(&self, form: &UploadForm) -> ClientResult<UploadResponse>;

    /// Trigger the computation; errors unless the service reports completion
    async fn calc_attendance(&self) -> ClientResult<CalcOutcome>;

    /// Upload, then compute
    async fn submit(&self, form: &UploadForm) -> ClientResult<CalcOutcome> {
        self.upload(form).await?;
        self.calc_attendance().await
    }
}

/// reqwest-backed [`AttendanceService`]
#[derive(Debug, Clone)]
pub struct AttendanceClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl AttendanceClient {
    /// Create a client
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    /// Current configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Page where the service shows the attendance result
    pub fn results_url(&self) -> String {
        self.endpoint("results")
    }

    /// `GET /test`
    pub async fn health(&self) -> ClientResult<HealthResponse> {
        let response = self.http.get(self.endpoint("test")).send().await?;
        decode("/test", response).await
    }

    fn build_form(&self, form: &UploadForm) -> ClientResult<Form> {
        if !form.is_consistent() {
            return Err(ClientError::InvalidForm {
                message: format!(
                    "{} images and {} labels",
                    form.images.len(),
                    form.labels.len()
                ),
            });
        }

        let mut multipart = Form::new()
            .text(
                self.config.frames_field.clone(),
                serde_json::to_string(&form.images)?,
            )
            .text(TIMESTAMPS_FIELD, serde_json::to_string(&form.labels)?)
            .text(FRAME_COUNT_FIELD, form.frame_count().to_string())
            .text(PROCESSING_MODE_FIELD, form.processing_mode.as_str());

        for (name, value) in &form.fields {
            multipart = multipart.text(name.clone(), value.clone());
        }
        Ok(multipart)
    }
}

/// Read a JSON body regardless of HTTP status; the service reports errors in
/// the body with a 4xx code
async fn decode<T: DeserializeOwned>(endpoint: &str, response: reqwest::Response) -> ClientResult<T> {
    let status = response.status();
    let body = response.bytes().await?;
    debug!("{} answered {} ({} bytes)", endpoint, status, body.len());

    serde_json::from_slice(&body).map_err(|e| ClientError::InvalidResponse {
        endpoint: endpoint.to_string(),
        reason: format!("HTTP {}: {}", status, e),
    })
}

#[async_trait]
impl AttendanceService for AttendanceClient {
    async fn upload(&self, form: &UploadForm) -> ClientResult<UploadResponse> {
        let multipart = self.build_form(form)?;
        info!(
            "Uploading {} frames ({} mode)",
            form.frame_count(),
            form.processing_mode
        );

        let response = self
            .http
            .post(self.endpoint("upload_video"))
            .multipart(multipart)
            .send()
            .await?;
        let body: UploadResponse = decode("/upload_video", response).await?;

        if !body.is_success() {
            warn!("Upload rejected: {:?}", body);
            return Err(ClientError::UploadRejected {
                status: body.status,
                message: body.message,
            });
        }

        info!(
            "Upload accepted in {}",
            body.time.as_deref().unwrap_or("unknown time")
        );
        Ok(body)
    }

    async fn calc_attendance(&self) -> ClientResult<CalcOutcome> {
        info!("Requesting attendance computation");
        let response = self
            .http
            .get(self.endpoint("calc_attendance"))
            .send()
            .await?;
        let body: CalcResponse = decode("/calc_attendance", response).await?;

        if !body.is_completed() {
            warn!("Attendance computation failed: {:?}", body);
            return Err(ClientError::ComputationFailed {
                status: body.status,
                response: body.response,
            });
        }

        Ok(CalcOutcome::Completed {
            results_url: self.results_url(),
            time: body.time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        assert!(ClientConfig::default().validate().is_ok());

        let bad = ClientConfig {
            base_url: "ftp://example.com".to_string(),
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(ClientError::InvalidUrl { .. })));

        let bad = ClientConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(AttendanceClient::new(bad).is_err());
    }

    #[test]
    fn test_endpoints_ignore_trailing_slash() {
        let client = AttendanceClient::new(ClientConfig {
            base_url: "http://10.0.0.2:5000/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.results_url(), "http://10.0.0.2:5000/results");
        assert_eq!(client.endpoint("test"), "http://10.0.0.2:5000/test");
    }

    #[test]
    fn test_inconsistent_form_rejected() {
        let client = AttendanceClient::new(ClientConfig::default()).unwrap();
        let form = UploadForm::new(
            vec!["data:image/jpeg;base64,AA==".to_string()],
            vec![],
            Default::default(),
        );
        assert!(matches!(
            client.build_form(&form),
            Err(ClientError::InvalidForm { .. })
        ));
    }
}
