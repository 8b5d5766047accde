//! Explicit UI state and the pure transition function that moves between states.

use shared::domain::{GenerationRequest, PreviewResult};
use thiserror::Error;

/// What produced the preview on screen, and therefore which endpoint a
/// "download current" must use.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationSource {
    QuickTest,
    Form(GenerationRequest),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum UiState {
    #[default]
    Empty,
    Loading,
    PreviewShown {
        preview: PreviewResult,
        source: GenerationSource,
    },
    ErrorShown {
        message: String,
    },
}

impl UiState {
    pub fn name(&self) -> &'static str {
        match self {
            UiState::Empty => "empty",
            UiState::Loading => "loading",
            UiState::PreviewShown { .. } => "preview_shown",
            UiState::ErrorShown { .. } => "error_shown",
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, UiState::Loading)
    }

    pub fn preview(&self) -> Option<&PreviewResult> {
        match self {
            UiState::PreviewShown { preview, .. } => Some(preview),
            _ => None,
        }
    }

    /// The last successful generation, available only while its preview is shown.
    pub fn last_generation(&self) -> Option<&GenerationSource> {
        match self {
            UiState::PreviewShown { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            UiState::ErrorShown { message } => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    CatalogLoadFailed {
        message: String,
    },
    GenerateStarted,
    PreviewReady {
        preview: PreviewResult,
        source: GenerationSource,
    },
    GenerateFailed {
        message: String,
    },
    ValidationFailed {
        message: String,
    },
}

impl FormEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FormEvent::CatalogLoadFailed { .. } => "catalog_load_failed",
            FormEvent::GenerateStarted => "generate_started",
            FormEvent::PreviewReady { .. } => "preview_ready",
            FormEvent::GenerateFailed { .. } => "generate_failed",
            FormEvent::ValidationFailed { .. } => "validation_failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionRejected {
    #[error("a preview is already being generated")]
    Busy,
    #[error("event {event} is not valid in state {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },
}

pub fn transition(state: &UiState, event: FormEvent) -> Result<UiState, TransitionRejected> {
    match (state, event) {
        (UiState::Empty, FormEvent::CatalogLoadFailed { message }) => {
            Ok(UiState::ErrorShown { message })
        }
        (UiState::Loading, FormEvent::GenerateStarted)
        | (UiState::Loading, FormEvent::ValidationFailed { .. }) => Err(TransitionRejected::Busy),
        (_, FormEvent::GenerateStarted) => Ok(UiState::Loading),
        (_, FormEvent::ValidationFailed { message }) => Ok(UiState::ErrorShown { message }),
        (UiState::Loading, FormEvent::PreviewReady { preview, source }) => {
            Ok(UiState::PreviewShown { preview, source })
        }
        (UiState::Loading, FormEvent::GenerateFailed { message }) => {
            Ok(UiState::ErrorShown { message })
        }
        (state, event) => Err(TransitionRejected::InvalidTransition {
            state: state.name(),
            event: event.name(),
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub generate: bool,
    pub quick_test: bool,
    pub download: bool,
}

pub fn controls(state: &UiState, catalog_ready: bool, form_valid: bool) -> Controls {
    let idle = !state.is_loading();
    Controls {
        generate: idle && catalog_ready && form_valid,
        quick_test: idle,
        download: state.last_generation().is_some(),
    }
}

#[cfg(test)]
#[path = "tests/reducer_tests.rs"]
mod tests;
