//! Action contexts, user notices, and action outcomes.

use std::path::PathBuf;

use shared::error::UserFacingError;

use crate::reducer::TransitionRejected;

pub const DICTIONARY_LOAD_FAILED: &str =
    "Failed to load ArUCO dictionaries. Check the generator service and retry.";
pub const NOTHING_TO_DOWNLOAD: &str = "No data available for download";
pub const FILE_SAVE_FAILED: &str = "File download failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionContext {
    DictionaryLoading,
    PreviewGeneration,
    QuickTestGeneration,
    LightBurnDownload,
    QuickTestDownload,
    CurrentDownload,
    PresetLoading,
    BatchDownload,
    MaterialLoading,
}

impl ActionContext {
    /// Label sent as `context` in error reports.
    pub fn label(self) -> &'static str {
        match self {
            ActionContext::DictionaryLoading => "Dictionary Loading",
            ActionContext::PreviewGeneration => "Preview Generation",
            ActionContext::QuickTestGeneration => "Quick Test Generation",
            ActionContext::LightBurnDownload => "LightBurn Download",
            ActionContext::QuickTestDownload => "Quick Test Download",
            ActionContext::CurrentDownload => "Current Download",
            ActionContext::PresetLoading => "Preset Loading",
            ActionContext::BatchDownload => "Batch Download",
            ActionContext::MaterialLoading => "Material Info Loading",
        }
    }

    /// Shown when the server failed without saying why.
    pub fn fallback_message(self) -> &'static str {
        match self {
            ActionContext::DictionaryLoading => DICTIONARY_LOAD_FAILED,
            ActionContext::PreviewGeneration => "Preview generation failed",
            ActionContext::QuickTestGeneration => "Quick test generation failed",
            ActionContext::LightBurnDownload => "LightBurn download failed",
            ActionContext::QuickTestDownload => "Quick test download failed",
            ActionContext::CurrentDownload => "Download failed",
            ActionContext::PresetLoading => "Failed to load presets",
            ActionContext::BatchDownload => "Batch download failed",
            ActionContext::MaterialLoading => "Failed to load material info",
        }
    }
}

/// Transient message that does not change the visible UI state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Completed,
    Saved { path: PathBuf, filename: String },
    Rejected(TransitionRejected),
    Failed(UserFacingError),
}

impl ActionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ActionOutcome::Failed(_) | ActionOutcome::Rejected(_))
    }
}
