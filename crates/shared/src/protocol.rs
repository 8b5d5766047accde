use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Preset;

pub const DICTIONARIES_PATH: &str = "/api/dictionaries";
pub const PREVIEW_PATH: &str = "/api/preview";
pub const DOWNLOAD_PATH: &str = "/api/download";
pub const QUICK_TEST_PATH: &str = "/api/quick-test";
pub const QUICK_TEST_DOWNLOAD_PATH: &str = "/api/quick-test/download";
pub const LOG_ERROR_PATH: &str = "/api/log-error";
pub const PRESETS_PATH: &str = "/api/presets";
/// The preset name is appended as one percent-encoded path segment.
pub const APPLY_PRESET_PATH: &str = "/api/apply_preset";
pub const BATCH_GENERATE_PATH: &str = "/api/batch_generate";
pub const MATERIAL_INFO_PATH: &str = "/api/material_info";

pub const QUICK_TEST_FILENAME: &str = "aruco_quick_test.lbrn2";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyPresetResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<Preset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `POST /api/log-error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientErrorReport {
    pub timestamp: DateTime<Utc>,
    pub context: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub url: String,
}

impl ClientErrorReport {
    pub fn new(
        context: impl Into<String>,
        message: impl Into<String>,
        stack: Option<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            context: context.into(),
            message: message.into(),
            stack,
            url: url.into(),
        }
    }
}
