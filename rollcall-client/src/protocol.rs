//! Attendance service wire types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Multipart field carrying the JSON array of image data URLs
pub const FRAMES_FIELD: &str = "videoData";
/// Multipart field carrying the JSON array of wall-clock labels
pub const TIMESTAMPS_FIELD: &str = "timestamps";
/// Multipart field carrying the number of frames
pub const FRAME_COUNT_FIELD: &str = "frame_count";
/// Multipart field carrying the processing mode
pub const PROCESSING_MODE_FIELD: &str = "processing_mode";

/// `status` value of an accepted upload
pub const UPLOAD_SUCCESS: &str = "success";
/// `status` value of a finished computation
pub const CALC_COMPLETED: &str = "completed";

/// How the service spreads face recognition over its workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProcessingMode {
    /// Fixed split of frames between workers
    #[default]
    Static,
    /// Workers pull frames as they become free
    Dynamic,
}

impl ProcessingMode {
    /// Value sent in the form
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMode::Static => "Static",
            ProcessingMode::Dynamic => "Dynamic",
        }
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "static" => Ok(ProcessingMode::Static),
            "dynamic" => Ok(ProcessingMode::Dynamic),
            other => Err(format!("unknown processing mode {:?}", other)),
        }
    }
}

/// Everything posted to `/upload_video`
#[derive(Debug, Clone, PartialEq)]
pub struct UploadForm {
    /// Still images as data URLs
    pub images: Vec<String>,
    /// Wall-clock label of each image
    pub labels: Vec<String>,
    /// How the service should process the frames
    pub processing_mode: ProcessingMode,
    /// Caller identification fields, sent in order
    pub fields: Vec<(String, String)>,
}

impl UploadForm {
    /// Form for parallel image and label sequences
    pub fn new(images: Vec<String>, labels: Vec<String>, processing_mode: ProcessingMode) -> Self {
        Self {
            images,
            labels,
            processing_mode,
            fields: Vec::new(),
        }
    }

    /// Add an identification field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Number of frames in the form
    pub fn frame_count(&self) -> usize {
        self.images.len()
    }

    /// Images and labels must pair up and be non-empty
    pub fn is_consistent(&self) -> bool {
        !self.images.is_empty() && self.images.len() == self.labels.len()
    }
}

/// `/upload_video` response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    /// `"success"` or an error marker
    pub status: String,
    /// Human readable detail
    #[serde(default)]
    pub message: Option<String>,
    /// Server-side processing time
    #[serde(default)]
    pub time: Option<String>,
}

impl UploadResponse {
    /// Whether the service accepted the upload
    pub fn is_success(&self) -> bool {
        self.status == UPLOAD_SUCCESS
    }
}

/// `/calc_attendance` response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalcResponse {
    /// `"completed"` or an error marker
    pub status: String,
    /// Human readable detail
    #[serde(default)]
    pub response: Option<String>,
    /// Server-side computation time
    #[serde(default)]
    pub time: Option<String>,
}

impl CalcResponse {
    /// Whether the computation finished
    pub fn is_completed(&self) -> bool {
        self.status == CALC_COMPLETED
    }
}

/// `/test` response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"success"` when the service is up
    pub status: String,
    /// Human readable detail
    #[serde(default)]
    pub message: Option<String>,
}

/// Result of a finished attendance computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalcOutcome {
    /// Results can be viewed at `results_url`
    Completed {
        /// Results page of the service
        results_url: String,
        /// Server-side computation time, if reported
        time: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_mode_parse() {
        assert_eq!("static".parse::<ProcessingMode>(), Ok(ProcessingMode::Static));
        assert_eq!("Dynamic".parse::<ProcessingMode>(), Ok(ProcessingMode::Dynamic));
        assert!("parallel".parse::<ProcessingMode>().is_err());
        assert_eq!(ProcessingMode::Dynamic.to_string(), "Dynamic");
    }

    #[test]
    fn test_upload_response_without_optional_fields() {
        let response: UploadResponse = serde_json::from_str(r#"{"status":"error"}"#).unwrap();
        assert!(!response.is_success());
        assert_eq!(response.message, None);
    }

    #[test]
    fn test_calc_response() {
        let json = r#"{"status":"completed","response":"Attendance calculation successful","time":"3.2 secs"}"#;
        let response: CalcResponse = serde_json::from_str(json).unwrap();
        assert!(response.is_completed());
        assert_eq!(response.time.as_deref(), Some("3.2 secs"));
    }

    #[test]
    fn test_form_consistency() {
        let form = UploadForm::new(vec!["a".into()], vec![], ProcessingMode::Static);
        assert!(!form.is_consistent());

        let form = UploadForm::new(vec!["a".into()], vec!["l".into()], ProcessingMode::Static)
            .with_field("num_students", "12");
        assert!(form.is_consistent());
        assert_eq!(form.frame_count(), 1);
        assert_eq!(form.fields[0].0, "num_students");
    }
}
