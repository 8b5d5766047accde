//! FormController: runs each user action against the generator API and folds the
//! result back into the UI state. No action returns an error; every failure ends
//! in `ErrorShown` or an error notice.

use std::sync::Arc;

use client_core::{error::ClientError, Artifact, ArtifactSink, GeneratorApi};
use shared::{
    domain::{
        BatchRequest, DictionaryCatalog, GenerationRequest, MaterialCatalog, PresetCatalog,
        PreviewResult,
    },
    error::{ErrorKind, UserFacingError},
    protocol::{ClientErrorReport, QUICK_TEST_FILENAME},
};
use tracing::{debug, error, info, warn};

use crate::{
    events::{
        ActionContext, ActionOutcome, Notice, DICTIONARY_LOAD_FAILED, FILE_SAVE_FAILED,
        NOTHING_TO_DOWNLOAD,
    },
    form::{grid_request, single_marker_request, FormFields},
    reducer::{
        controls, transition, Controls, FormEvent, GenerationSource, TransitionRejected, UiState,
    },
    validation::{
        format_issues, validate, validate_batch, FieldMarks, MarkerSummary, ValidationIssue,
    },
};

pub struct FormController {
    api: Arc<dyn GeneratorApi>,
    sink: Arc<dyn ArtifactSink>,
    catalog: DictionaryCatalog,
    catalog_loaded: bool,
    presets: PresetCatalog,
    materials: MaterialCatalog,
    form: FormFields,
    state: UiState,
    notices: Vec<Notice>,
}

impl FormController {
    pub fn new(api: Arc<dyn GeneratorApi>, sink: Arc<dyn ArtifactSink>) -> Self {
        Self {
            api,
            sink,
            catalog: DictionaryCatalog::default(),
            catalog_loaded: false,
            presets: PresetCatalog::new(),
            materials: MaterialCatalog::new(),
            form: FormFields::default(),
            state: UiState::Empty,
            notices: Vec::new(),
        }
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn catalog(&self) -> &DictionaryCatalog {
        &self.catalog
    }

    pub fn catalog_loaded(&self) -> bool {
        self.catalog_loaded
    }

    pub fn presets(&self) -> &PresetCatalog {
        &self.presets
    }

    pub fn materials(&self) -> &MaterialCatalog {
        &self.materials
    }

    pub fn form(&self) -> &FormFields {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormFields {
        &mut self.form
    }

    pub fn last_generation(&self) -> Option<&GenerationSource> {
        self.state.last_generation()
    }

    pub fn live_issues(&self) -> Vec<ValidationIssue> {
        validate(&self.form.to_request(), &self.catalog)
    }

    pub fn field_marks(&self) -> FieldMarks {
        FieldMarks::from_issues(&self.live_issues())
    }

    pub fn marker_summary(&self) -> MarkerSummary {
        MarkerSummary::for_request(&self.form.to_request(), &self.catalog)
    }

    pub fn controls(&self) -> Controls {
        controls(
            &self.state,
            self.catalog_loaded && !self.catalog.is_empty(),
            self.live_issues().is_empty(),
        )
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub async fn initialize(&mut self) -> ActionOutcome {
        info!("loading ArUCO dictionaries");
        match self.api.dictionaries().await {
            Ok(catalog) => {
                info!(dictionaries = catalog.len(), "dictionaries loaded");
                self.catalog = catalog;
                self.catalog_loaded = true;
                ActionOutcome::Completed
            }
            Err(err) => {
                self.catalog = DictionaryCatalog::default();
                self.catalog_loaded = false;
                self.report_client_error(ActionContext::DictionaryLoading, &err).await;
                let event = FormEvent::CatalogLoadFailed {
                    message: DICTIONARY_LOAD_FAILED.to_string(),
                };
                if let Err(rejected) = self.apply(event) {
                    return ActionOutcome::Rejected(rejected);
                }
                ActionOutcome::Failed(UserFacingError::new(err.kind(), DICTIONARY_LOAD_FAILED))
            }
        }
    }

    pub async fn generate_preview(&mut self, request: GenerationRequest) -> ActionOutcome {
        let issues = validate(&request, &self.catalog);
        if !issues.is_empty() {
            let message = format_issues(&issues);
            debug!(issues = issues.len(), "form validation failed");
            if let Err(rejected) = self.apply(FormEvent::ValidationFailed {
                message: message.clone(),
            }) {
                return ActionOutcome::Rejected(rejected);
            }
            return ActionOutcome::Failed(UserFacingError::new(ErrorKind::Validation, message));
        }

        if let Err(rejected) = self.apply(FormEvent::GenerateStarted) {
            return ActionOutcome::Rejected(rejected);
        }
        debug!(
            dictionary = %request.dictionary,
            rows = request.rows,
            cols = request.cols,
            start_id = request.start_id,
            "generating preview"
        );
        let result = self.api.preview(&request).await;
        self.finish_generation(
            ActionContext::PreviewGeneration,
            result,
            GenerationSource::Form(request),
        )
        .await
    }

    pub async fn generate_from_form(&mut self) -> ActionOutcome {
        let request = self.form.to_request();
        self.generate_preview(request).await
    }

    pub async fn generate_single(&mut self, marker_id: i64) -> ActionOutcome {
        self.generate_preview(single_marker_request(marker_id))
            .await
    }

    pub async fn generate_grid(&mut self, start_id: i64) -> ActionOutcome {
        self.generate_preview(grid_request(start_id)).await
    }

    pub async fn quick_test(&mut self) -> ActionOutcome {
        if let Err(rejected) = self.apply(FormEvent::GenerateStarted) {
            return ActionOutcome::Rejected(rejected);
        }
        debug!("generating quick test");
        let result = self.api.quick_test().await;
        self.finish_generation(
            ActionContext::QuickTestGeneration,
            result,
            GenerationSource::QuickTest,
        )
        .await
    }

    async fn finish_generation(
        &mut self,
        context: ActionContext,
        result: Result<PreviewResult, ClientError>,
        source: GenerationSource,
    ) -> ActionOutcome {
        let (event, outcome) = match result {
            Ok(preview) => {
                info!(
                    context = context.label(),
                    svg_bytes = preview.svg.len(),
                    "preview generated"
                );
                (
                    FormEvent::PreviewReady { preview, source },
                    ActionOutcome::Completed,
                )
            }
            Err(err) => {
                self.report_client_error(context, &err).await;
                let failure = err.to_user_facing(context.fallback_message());
                (
                    FormEvent::GenerateFailed {
                        message: failure.message.clone(),
                    },
                    ActionOutcome::Failed(failure),
                )
            }
        };

        match self.apply(event) {
            Ok(()) => outcome,
            Err(rejected) => ActionOutcome::Rejected(rejected),
        }
    }

    /// Downloads the artifact for `request` without touching the visible state.
    pub async fn download_artifact(&mut self, request: &GenerationRequest) -> ActionOutcome {
        let issues = validate(request, &self.catalog);
        if !issues.is_empty() {
            return self.invalid_download(&issues);
        }

        debug!(dictionary = %request.dictionary, "downloading LightBurn file");
        let result = self.api.download(request).await;
        self.save_artifact(
            ActionContext::LightBurnDownload,
            result,
            &request.artifact_filename(),
        )
        .await
    }

    pub async fn download_from_form(&mut self) -> ActionOutcome {
        let request = self.form.to_request();
        self.download_artifact(&request).await
    }

    /// Downloads a ZIP of sequential-id files. Like the single-file download it
    /// only produces notices.
    pub async fn download_batch(&mut self, request: &BatchRequest) -> ActionOutcome {
        let issues = validate_batch(request, &self.catalog);
        if !issues.is_empty() {
            return self.invalid_download(&issues);
        }

        debug!(
            dictionary = %request.base.dictionary,
            batch_size = request.batch_size,
            markers_per_file = request.markers_per_file,
            "downloading batch"
        );
        let result = self.api.batch_download(request).await;
        self.save_artifact(
            ActionContext::BatchDownload,
            result,
            &request.archive_filename(),
        )
        .await
    }

    pub async fn download_batch_from_form(
        &mut self,
        batch_size: i64,
        markers_per_file: i64,
    ) -> ActionOutcome {
        let request = BatchRequest {
            base: self.form.to_request(),
            batch_size,
            markers_per_file,
        };
        self.download_batch(&request).await
    }

    fn invalid_download(&mut self, issues: &[ValidationIssue]) -> ActionOutcome {
        let message = format_issues(issues);
        debug!(issues = issues.len(), "download validation failed");
        self.notices.push(Notice::Error(message.clone()));
        ActionOutcome::Failed(UserFacingError::new(ErrorKind::Validation, message))
    }

    /// Downloads whatever produced the preview currently on screen.
    pub async fn download_current(&mut self) -> ActionOutcome {
        match self.state.last_generation().cloned() {
            Some(GenerationSource::QuickTest) => {
                debug!("downloading quick test file");
                let result = self.api.quick_test_download().await;
                self.save_artifact(ActionContext::QuickTestDownload, result, QUICK_TEST_FILENAME)
                    .await
            }
            Some(GenerationSource::Form(request)) => self.download_artifact(&request).await,
            None => {
                warn!(state = self.state.name(), "download requested without a preview");
                self.notices
                    .push(Notice::Error(NOTHING_TO_DOWNLOAD.to_string()));
                ActionOutcome::Failed(UserFacingError::new(
                    ErrorKind::Validation,
                    NOTHING_TO_DOWNLOAD,
                ))
            }
        }
    }

    async fn save_artifact(
        &mut self,
        context: ActionContext,
        result: Result<Artifact, ClientError>,
        fallback_filename: &str,
    ) -> ActionOutcome {
        let artifact = match result {
            Ok(artifact) => artifact,
            Err(err) => {
                self.report_client_error(context, &err).await;
                let failure = err.to_user_facing(context.fallback_message());
                self.notices.push(Notice::Error(failure.message.clone()));
                return ActionOutcome::Failed(failure);
            }
        };

        let filename = artifact.filename_or(fallback_filename);
        match self.sink.save(&filename, &artifact.bytes) {
            Ok(path) => {
                info!(file = %path.display(), size_bytes = artifact.bytes.len(), "file downloaded");
                self.notices.push(Notice::Success(format!(
                    "File \"{filename}\" downloaded successfully"
                )));
                ActionOutcome::Saved { path, filename }
            }
            Err(err) => {
                self.report(context, format!("{err:#}"), Some(format!("{err:?}")))
                    .await;
                self.notices
                    .push(Notice::Error(FILE_SAVE_FAILED.to_string()));
                ActionOutcome::Failed(UserFacingError::new(ErrorKind::Internal, FILE_SAVE_FAILED))
            }
        }
    }

    pub async fn load_presets(&mut self) -> ActionOutcome {
        match self.api.presets().await {
            Ok(presets) => {
                debug!(presets = presets.len(), "presets loaded");
                self.presets = presets;
                ActionOutcome::Completed
            }
            Err(err) => self.notice_failure(ActionContext::PresetLoading, err).await,
        }
    }

    /// Fetches a preset by name and copies it into the form fields.
    pub async fn apply_preset(&mut self, name: &str) -> ActionOutcome {
        match self.api.apply_preset(name).await {
            Ok(preset) => {
                debug!(preset = name, "preset applied");
                self.form.apply_preset(&preset);
                ActionOutcome::Completed
            }
            Err(err) => self.notice_failure(ActionContext::PresetLoading, err).await,
        }
    }

    pub async fn load_materials(&mut self) -> ActionOutcome {
        match self.api.material_info().await {
            Ok(materials) => {
                debug!(materials = materials.len(), "material info loaded");
                self.materials = materials;
                ActionOutcome::Completed
            }
            Err(err) => self.notice_failure(ActionContext::MaterialLoading, err).await,
        }
    }

    async fn notice_failure(&mut self, context: ActionContext, err: ClientError) -> ActionOutcome {
        self.report_client_error(context, &err).await;
        let failure = err.to_user_facing(context.fallback_message());
        self.notices.push(Notice::Error(failure.message.clone()));
        ActionOutcome::Failed(failure)
    }

    fn apply(&mut self, event: FormEvent) -> Result<(), TransitionRejected> {
        let event_name = event.name();
        match transition(&self.state, event) {
            Ok(next) => {
                debug!(from = self.state.name(), to = next.name(), event = event_name, "ui state");
                self.state = next;
                Ok(())
            }
            Err(rejected) => {
                warn!(state = self.state.name(), event = event_name, %rejected, "transition rejected");
                Err(rejected)
            }
        }
    }

    async fn report_client_error(&self, context: ActionContext, err: &ClientError) {
        self.report(context, err.to_string(), Some(format!("{err:?}")))
            .await;
    }

    /// Logs the failure and forwards it to the backend's error log. The report
    /// call cannot fail back into this path.
    async fn report(&self, context: ActionContext, message: String, stack: Option<String>) {
        error!(context = context.label(), error = %message, "action failed");
        let report = ClientErrorReport::new(context.label(), message, stack, self.api.base_url());
        self.api.log_error(&report).await;
    }
}

#[cfg(test)]
#[path = "tests/orchestration_tests.rs"]
mod tests;
