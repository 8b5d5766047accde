//! Form state, local validation, and the preview/download state machine that
//! drives the generator backend.

pub mod events;
pub mod form;
pub mod orchestration;
pub mod reducer;
pub mod validation;

pub use events::{ActionContext, ActionOutcome, Notice};
pub use form::FormFields;
pub use orchestration::FormController;
pub use reducer::{controls, transition, Controls, FormEvent, GenerationSource, UiState};
pub use validation::{validate, validate_batch, FormField, ValidationIssue};
