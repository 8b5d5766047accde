use super::*;
use std::{path::PathBuf, sync::Mutex as StdMutex};

use async_trait::async_trait;
use client_core::error::NETWORK_ERROR_MESSAGE;
use shared::domain::{DictionaryInfo, MaterialProfile, Preset};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Dictionaries,
    Preview(GenerationRequest),
    Download(GenerationRequest),
    QuickTest,
    QuickTestDownload,
    Presets,
    ApplyPreset(String),
    Batch(BatchRequest),
    MaterialInfo,
}

#[derive(Default)]
struct FakeApi {
    catalog_unreachable: bool,
    preview_failure: Option<(u16, Option<String>)>,
    download_failure: Option<(u16, Option<String>)>,
    server_filename: Option<String>,
    materials_unreachable: bool,
    calls: Arc<Mutex<Vec<Call>>>,
    reports: Arc<Mutex<Vec<ClientErrorReport>>>,
}

impl FakeApi {
    fn server_error(failure: &Option<(u16, Option<String>)>) -> Option<ClientError> {
        failure.as_ref().map(|(status, message)| ClientError::Server {
            status: *status,
            message: message.clone(),
        })
    }

    fn preview_result() -> PreviewResult {
        PreviewResult {
            svg: "<svg/>".to_string(),
            dimensions: Some(shared::domain::Dimensions {
                width: 61.8,
                height: 116.6,
            }),
            total_width: None,
            total_height: None,
            marker_count: None,
        }
    }

    fn test_sheet() -> Preset {
        Preset {
            name: "Test Sheet".to_string(),
            description: "Standard test grid".to_string(),
            dictionary: "4X4_50".to_string(),
            rows: 3,
            cols: 3,
            size_mm: 20.0,
            spacing_mm: 5.0,
            include_borders: true,
            include_labels: true,
        }
    }
}

#[async_trait]
impl GeneratorApi for FakeApi {
    async fn dictionaries(&self) -> Result<DictionaryCatalog, ClientError> {
        self.calls.lock().await.push(Call::Dictionaries);
        if self.catalog_unreachable {
            return Err(ClientError::Transport("connection refused".to_string()));
        }
        Ok(catalog())
    }

    async fn preview(&self, request: &GenerationRequest) -> Result<PreviewResult, ClientError> {
        self.calls.lock().await.push(Call::Preview(request.clone()));
        match Self::server_error(&self.preview_failure) {
            Some(err) => Err(err),
            None => Ok(Self::preview_result()),
        }
    }

    async fn download(&self, request: &GenerationRequest) -> Result<Artifact, ClientError> {
        self.calls.lock().await.push(Call::Download(request.clone()));
        if let Some(err) = Self::server_error(&self.download_failure) {
            return Err(err);
        }
        Ok(Artifact {
            bytes: b"<LightBurnProject/>".to_vec(),
            filename: self.server_filename.clone(),
            content_type: Some("application/xml".to_string()),
        })
    }

    async fn quick_test(&self) -> Result<PreviewResult, ClientError> {
        self.calls.lock().await.push(Call::QuickTest);
        Ok(Self::preview_result())
    }

    async fn quick_test_download(&self) -> Result<Artifact, ClientError> {
        self.calls.lock().await.push(Call::QuickTestDownload);
        Ok(Artifact {
            bytes: b"<LightBurnProject quick/>".to_vec(),
            filename: None,
            content_type: None,
        })
    }

    async fn presets(&self) -> Result<PresetCatalog, ClientError> {
        self.calls.lock().await.push(Call::Presets);
        Ok(PresetCatalog::from([(
            "test_sheet".to_string(),
            Self::test_sheet(),
        )]))
    }

    async fn apply_preset(&self, name: &str) -> Result<Preset, ClientError> {
        self.calls
            .lock()
            .await
            .push(Call::ApplyPreset(name.to_string()));
        if name == "test_sheet" {
            Ok(Self::test_sheet())
        } else {
            Err(ClientError::Server {
                status: 404,
                message: Some("Preset not found".to_string()),
            })
        }
    }

    async fn batch_download(&self, request: &BatchRequest) -> Result<Artifact, ClientError> {
        self.calls.lock().await.push(Call::Batch(request.clone()));
        Ok(Artifact {
            bytes: b"PK\x03\x04".to_vec(),
            filename: None,
            content_type: Some("application/zip".to_string()),
        })
    }

    async fn material_info(&self) -> Result<MaterialCatalog, ClientError> {
        self.calls.lock().await.push(Call::MaterialInfo);
        if self.materials_unreachable {
            return Err(ClientError::Server {
                status: 500,
                message: None,
            });
        }
        Ok(MaterialCatalog::from([(
            "1_16_cast_acrylic".to_string(),
            MaterialProfile {
                name: "1/16\" Cast Acrylic (Default)".to_string(),
                description: "White/Black 2-Ply Cast Acrylic".to_string(),
                cut_speed: 150.0,
                cut_power: 75.0,
                cut_passes: 1,
                engrave_speed: 800.0,
                engrave_power: 45.0,
                mark_speed: 1000.0,
                mark_power: 20.0,
            },
        )]))
    }

    async fn log_error(&self, report: &ClientErrorReport) {
        self.reports.lock().await.push(report.clone());
    }

    fn base_url(&self) -> &str {
        "http://generator.test"
    }
}

#[derive(Default)]
struct RecordingSink {
    fail: bool,
    saved: StdMutex<Vec<(String, Vec<u8>)>>,
}

impl ArtifactSink for RecordingSink {
    fn save(&self, filename: &str, bytes: &[u8]) -> anyhow::Result<PathBuf> {
        if self.fail {
            anyhow::bail!("disk full");
        }
        self.saved
            .lock()
            .expect("sink lock")
            .push((filename.to_string(), bytes.to_vec()));
        Ok(PathBuf::from("/downloads").join(filename))
    }
}

fn catalog() -> DictionaryCatalog {
    DictionaryCatalog::new([
        (
            "4X4_50".to_string(),
            DictionaryInfo {
                max_markers: 50,
                bits: None,
                description: None,
            },
        ),
        (
            "6X6_250".to_string(),
            DictionaryInfo {
                max_markers: 250,
                bits: None,
                description: None,
            },
        ),
    ])
}

fn sample_request() -> GenerationRequest {
    GenerationRequest {
        dictionary: "6X6_250".to_string(),
        rows: 2,
        cols: 3,
        start_id: 5,
        size_mm: 20.0,
        spacing_mm: 5.0,
        include_borders: true,
        include_labels: true,
        include_outer_border: false,
        border_width: 2.0,
    }
}

struct Harness {
    controller: FormController,
    calls: Arc<Mutex<Vec<Call>>>,
    reports: Arc<Mutex<Vec<ClientErrorReport>>>,
    sink: Arc<RecordingSink>,
}

fn harness(api: FakeApi) -> Harness {
    harness_with_sink(api, RecordingSink::default())
}

fn harness_with_sink(api: FakeApi, sink: RecordingSink) -> Harness {
    let calls = api.calls.clone();
    let reports = api.reports.clone();
    let sink = Arc::new(sink);
    Harness {
        controller: FormController::new(Arc::new(api), sink.clone()),
        calls,
        reports,
        sink,
    }
}

async fn ready(api: FakeApi) -> Harness {
    let mut h = harness(api);
    assert_eq!(h.controller.initialize().await, ActionOutcome::Completed);
    h.calls.lock().await.clear();
    h
}

#[tokio::test]
async fn initialize_loads_catalog_and_enables_generate() {
    let mut h = harness(FakeApi::default());

    assert_eq!(h.controller.initialize().await, ActionOutcome::Completed);

    assert!(h.controller.catalog_loaded());
    assert_eq!(h.controller.catalog().max_markers("6X6_250"), Some(250));
    assert_eq!(h.controller.state(), &UiState::Empty);
    let controls = h.controller.controls();
    assert!(controls.generate);
    assert!(!controls.download);
}

#[tokio::test]
async fn catalog_failure_shows_error_and_disables_actions() {
    let mut h = harness(FakeApi {
        catalog_unreachable: true,
        ..FakeApi::default()
    });

    let outcome = h.controller.initialize().await;

    assert!(matches!(
        outcome,
        ActionOutcome::Failed(UserFacingError {
            kind: ErrorKind::Network,
            ..
        })
    ));
    assert!(h.controller.catalog().is_empty());
    assert_eq!(
        h.controller.state().error_message(),
        Some(DICTIONARY_LOAD_FAILED)
    );
    let controls = h.controller.controls();
    assert!(!controls.generate);
    assert!(!controls.download);

    let reports = h.reports.lock().await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].context, "Dictionary Loading");
    assert_eq!(reports[0].url, "http://generator.test");
}

#[tokio::test]
async fn generate_is_blocked_without_catalog() {
    let mut h = harness(FakeApi {
        catalog_unreachable: true,
        ..FakeApi::default()
    });
    h.controller.initialize().await;

    let outcome = h.controller.generate_preview(sample_request()).await;

    assert!(matches!(
        outcome,
        ActionOutcome::Failed(UserFacingError {
            kind: ErrorKind::Validation,
            ..
        })
    ));
    assert_eq!(*h.calls.lock().await, vec![Call::Dictionaries]);
}

#[tokio::test]
async fn server_error_is_shown_verbatim_and_download_stays_disabled() {
    let mut h = ready(FakeApi {
        preview_failure: Some((500, Some("boom".to_string()))),
        ..FakeApi::default()
    })
    .await;

    let outcome = h.controller.generate_preview(sample_request()).await;

    assert!(matches!(outcome, ActionOutcome::Failed(ref e) if e.message == "boom"));
    assert_eq!(
        h.controller.state(),
        &UiState::ErrorShown {
            message: "boom".to_string()
        }
    );
    assert!(!h.controller.controls().download);
    assert_eq!(h.controller.last_generation(), None);
    assert_eq!(h.reports.lock().await[0].context, "Preview Generation");
}

#[tokio::test]
async fn server_error_without_body_uses_fallback() {
    let mut h = ready(FakeApi {
        preview_failure: Some((502, None)),
        ..FakeApi::default()
    })
    .await;

    h.controller.generate_preview(sample_request()).await;

    assert_eq!(
        h.controller.state().error_message(),
        Some("Preview generation failed")
    );
}

#[tokio::test]
async fn successful_preview_enables_download_of_same_request() {
    let mut h = ready(FakeApi::default()).await;

    assert_eq!(
        h.controller.generate_preview(sample_request()).await,
        ActionOutcome::Completed
    );
    assert!(h.controller.controls().download);
    assert_eq!(
        h.controller.last_generation(),
        Some(&GenerationSource::Form(sample_request()))
    );
    let shown = h.controller.state().clone();

    let outcome = h.controller.download_current().await;

    assert_eq!(
        outcome,
        ActionOutcome::Saved {
            path: PathBuf::from("/downloads/aruco_6X6_250_2x3_id5.lbrn2"),
            filename: "aruco_6X6_250_2x3_id5.lbrn2".to_string(),
        }
    );
    assert_eq!(h.controller.state(), &shown);
    assert_eq!(
        *h.calls.lock().await,
        vec![
            Call::Preview(sample_request()),
            Call::Download(sample_request())
        ]
    );
    assert_eq!(
        h.controller.take_notices(),
        vec![Notice::Success(
            "File \"aruco_6X6_250_2x3_id5.lbrn2\" downloaded successfully".to_string()
        )]
    );
}

#[tokio::test]
async fn server_supplied_filename_wins() {
    let mut h = ready(FakeApi {
        server_filename: Some("from_server.lbrn2".to_string()),
        ..FakeApi::default()
    })
    .await;

    let outcome = h.controller.download_artifact(&sample_request()).await;

    assert!(matches!(outcome, ActionOutcome::Saved { ref filename, .. } if filename == "from_server.lbrn2"));
    let saved = h.sink.saved.lock().expect("saved");
    assert_eq!(saved[0].0, "from_server.lbrn2");
    assert_eq!(saved[0].1, b"<LightBurnProject/>");
}

#[tokio::test]
async fn quick_test_download_uses_quick_test_endpoint() {
    let mut h = ready(FakeApi::default()).await;

    assert_eq!(h.controller.quick_test().await, ActionOutcome::Completed);
    assert_eq!(
        h.controller.last_generation(),
        Some(&GenerationSource::QuickTest)
    );

    let outcome = h.controller.download_current().await;

    assert!(matches!(outcome, ActionOutcome::Saved { ref filename, .. } if filename == QUICK_TEST_FILENAME));
    assert_eq!(
        *h.calls.lock().await,
        vec![Call::QuickTest, Call::QuickTestDownload]
    );
}

#[tokio::test]
async fn download_dispatch_follows_latest_generation() {
    let mut h = ready(FakeApi::default()).await;

    h.controller.quick_test().await;
    h.controller.generate_preview(sample_request()).await;
    h.controller.download_current().await;

    h.controller.quick_test().await;
    h.controller.download_current().await;

    assert_eq!(
        *h.calls.lock().await,
        vec![
            Call::QuickTest,
            Call::Preview(sample_request()),
            Call::Download(sample_request()),
            Call::QuickTest,
            Call::QuickTestDownload,
        ]
    );
}

#[tokio::test]
async fn invalid_request_never_reaches_the_network() {
    let mut h = ready(FakeApi::default()).await;
    let mut request = sample_request();
    request.start_id = 250;

    let outcome = h.controller.generate_preview(request).await;

    assert!(outcome.is_failure());
    let message = h.controller.state().error_message().expect("error shown");
    assert!(message.starts_with("Please fix the following issues:"));
    assert!(message.contains("Marker range exceeds dictionary limit (250 markers)"));
    assert!(h.calls.lock().await.is_empty());
}

#[tokio::test]
async fn generate_while_loading_is_rejected() {
    let mut h = ready(FakeApi::default()).await;
    h.controller.state = UiState::Loading;

    let outcome = h.controller.generate_preview(sample_request()).await;

    assert_eq!(outcome, ActionOutcome::Rejected(TransitionRejected::Busy));
    assert_eq!(h.controller.quick_test().await, ActionOutcome::Rejected(TransitionRejected::Busy));
    assert_eq!(h.controller.state(), &UiState::Loading);
    assert!(h.calls.lock().await.is_empty());
}

#[tokio::test]
async fn download_failure_keeps_preview_visible() {
    let mut h = ready(FakeApi {
        download_failure: Some((400, Some("Invalid dictionary: 6X6_250".to_string()))),
        ..FakeApi::default()
    })
    .await;
    h.controller.generate_preview(sample_request()).await;
    let shown = h.controller.state().clone();

    let outcome = h.controller.download_current().await;

    assert!(outcome.is_failure());
    assert_eq!(h.controller.state(), &shown);
    assert!(h.controller.controls().download);
    assert_eq!(
        h.controller.take_notices(),
        vec![Notice::Error("Invalid dictionary: 6X6_250".to_string())]
    );
    assert_eq!(h.reports.lock().await[0].context, "LightBurn Download");
}

#[tokio::test]
async fn download_current_without_preview_reports_nothing_to_download() {
    let mut h = ready(FakeApi::default()).await;

    let outcome = h.controller.download_current().await;

    assert!(outcome.is_failure());
    assert_eq!(
        h.controller.take_notices(),
        vec![Notice::Error(NOTHING_TO_DOWNLOAD.to_string())]
    );
    assert!(h.calls.lock().await.is_empty());
    assert_eq!(h.controller.state(), &UiState::Empty);
}

#[tokio::test]
async fn invalid_download_is_a_notice_not_a_state_change() {
    let mut h = ready(FakeApi::default()).await;
    let mut request = sample_request();
    request.rows = 0;

    let outcome = h.controller.download_artifact(&request).await;

    assert!(outcome.is_failure());
    assert_eq!(h.controller.state(), &UiState::Empty);
    assert!(h.calls.lock().await.is_empty());
    let notices = h.controller.take_notices();
    assert!(matches!(&notices[..], [Notice::Error(m)] if m.contains("Rows must be between 1 and 20")));
}

#[tokio::test]
async fn sink_failure_surfaces_generic_error() {
    let mut h = harness_with_sink(
        FakeApi::default(),
        RecordingSink {
            fail: true,
            ..RecordingSink::default()
        },
    );
    h.controller.initialize().await;

    let outcome = h.controller.download_artifact(&sample_request()).await;

    assert_eq!(
        outcome,
        ActionOutcome::Failed(UserFacingError::new(ErrorKind::Internal, FILE_SAVE_FAILED))
    );
    let reports = h.reports.lock().await;
    assert!(reports[0].message.contains("disk full"));
}

#[tokio::test]
async fn transport_failure_during_preview_shows_network_error() {
    struct DownApi;

    #[async_trait]
    impl GeneratorApi for DownApi {
        async fn dictionaries(&self) -> Result<DictionaryCatalog, ClientError> {
            Ok(catalog())
        }
        async fn preview(&self, _: &GenerationRequest) -> Result<PreviewResult, ClientError> {
            Err(ClientError::Transport("connection reset".to_string()))
        }
        async fn download(&self, _: &GenerationRequest) -> Result<Artifact, ClientError> {
            Err(ClientError::Transport("connection reset".to_string()))
        }
        async fn quick_test(&self) -> Result<PreviewResult, ClientError> {
            Err(ClientError::Timeout("30s".to_string()))
        }
        async fn quick_test_download(&self) -> Result<Artifact, ClientError> {
            Err(ClientError::Transport("connection reset".to_string()))
        }
        async fn presets(&self) -> Result<PresetCatalog, ClientError> {
            Err(ClientError::Transport("connection reset".to_string()))
        }
        async fn apply_preset(&self, _: &str) -> Result<Preset, ClientError> {
            Err(ClientError::Transport("connection reset".to_string()))
        }
        async fn batch_download(&self, _: &BatchRequest) -> Result<Artifact, ClientError> {
            Err(ClientError::Transport("connection reset".to_string()))
        }
        async fn material_info(&self) -> Result<MaterialCatalog, ClientError> {
            Err(ClientError::Transport("connection reset".to_string()))
        }
        async fn log_error(&self, _: &ClientErrorReport) {}
        fn base_url(&self) -> &str {
            "http://down.test"
        }
    }

    let mut controller = FormController::new(Arc::new(DownApi), Arc::new(RecordingSink::default()));
    controller.initialize().await;

    controller.generate_preview(sample_request()).await;
    assert_eq!(controller.state().error_message(), Some(NETWORK_ERROR_MESSAGE));

    controller.quick_test().await;
    assert_eq!(
        controller.state().error_message(),
        Some(client_core::error::TIMEOUT_ERROR_MESSAGE)
    );
}

#[tokio::test]
async fn golden_paths_send_fixed_requests() {
    let mut h = ready(FakeApi::default()).await;

    h.controller.generate_single(7).await;
    h.controller.generate_grid(40).await;

    let calls = h.calls.lock().await;
    assert_eq!(
        calls.as_slice(),
        &[
            Call::Preview(crate::form::single_marker_request(7)),
            Call::Preview(crate::form::grid_request(40)),
        ]
    );
}

#[tokio::test]
async fn form_driven_actions_use_current_fields() {
    let mut h = ready(FakeApi::default()).await;
    {
        let form = h.controller.form_mut();
        form.dictionary = "4X4_50".to_string();
        form.rows = "3".to_string();
        form.cols = "4".to_string();
        form.start_id = "38".to_string();
    }

    assert!(h.controller.controls().generate);
    assert_eq!(h.controller.marker_summary().id_range(), "38-49");

    h.controller.generate_from_form().await;
    h.controller.download_from_form().await;

    let expected = h.controller.form().to_request();
    assert_eq!(
        *h.calls.lock().await,
        vec![Call::Preview(expected.clone()), Call::Download(expected)]
    );
}

#[tokio::test]
async fn invalid_form_disables_generate_and_marks_field() {
    let mut h = ready(FakeApi::default()).await;
    h.controller.form_mut().start_id = "300".to_string();

    assert!(!h.controller.controls().generate);
    assert_eq!(
        h.controller.field_marks().mark(crate::validation::FormField::StartId),
        crate::validation::FieldMark::Invalid
    );
}

#[tokio::test]
async fn presets_load_and_apply_to_form() {
    let mut h = ready(FakeApi::default()).await;

    assert_eq!(h.controller.load_presets().await, ActionOutcome::Completed);
    assert!(h.controller.presets().contains_key("test_sheet"));

    assert_eq!(
        h.controller.apply_preset("test_sheet").await,
        ActionOutcome::Completed
    );
    let request = h.controller.form().to_request();
    assert_eq!(request.dictionary, "4X4_50");
    assert_eq!((request.rows, request.cols), (3, 3));

    let outcome = h.controller.apply_preset("nope").await;
    assert!(outcome.is_failure());
    assert_eq!(
        h.controller.take_notices(),
        vec![Notice::Error("Preset not found".to_string())]
    );
    assert_eq!(h.controller.state(), &UiState::Empty);
}

#[tokio::test]
async fn batch_download_saves_archive_without_touching_state() {
    let mut h = ready(FakeApi::default()).await;
    h.controller.form_mut().dictionary = "4X4_50".to_string();
    h.controller.form_mut().start_id = "10".to_string();

    let outcome = h.controller.download_batch_from_form(4, 10).await;

    assert_eq!(
        outcome,
        ActionOutcome::Saved {
            path: PathBuf::from("/downloads/aruco_batch_4files_40markers.zip"),
            filename: "aruco_batch_4files_40markers.zip".to_string(),
        }
    );
    assert_eq!(h.controller.state(), &UiState::Empty);
    let calls = h.calls.lock().await;
    assert!(matches!(
        calls.as_slice(),
        [Call::Batch(BatchRequest { base, batch_size: 4, markers_per_file: 10 })]
            if base.start_id == 10 && base.dictionary == "4X4_50"
    ));
}

#[tokio::test]
async fn batch_out_of_bounds_is_rejected_locally() {
    let mut h = ready(FakeApi::default()).await;

    let outcome = h.controller.download_batch_from_form(51, 1).await;
    assert!(outcome.is_failure());

    // 4X4_50 holds ids 0..=49; 5 x 10 from id 1 would end at 50.
    h.controller.form_mut().dictionary = "4X4_50".to_string();
    h.controller.form_mut().start_id = "1".to_string();
    let outcome = h.controller.download_batch_from_form(5, 10).await;
    assert!(outcome.is_failure());

    assert!(h.calls.lock().await.is_empty());
    let notices = h.controller.take_notices();
    assert!(matches!(&notices[0], Notice::Error(m) if m.contains("Batch size must be between 1 and 50")));
    assert!(matches!(&notices[1], Notice::Error(m) if m.contains("Marker range exceeds dictionary limit (50 markers)")));
}

#[tokio::test]
async fn materials_load_or_fail_with_notice() {
    let mut h = ready(FakeApi::default()).await;
    assert_eq!(h.controller.load_materials().await, ActionOutcome::Completed);
    assert_eq!(
        h.controller.materials()["1_16_cast_acrylic"].engrave_speed,
        800.0
    );

    let mut h = ready(FakeApi {
        materials_unreachable: true,
        ..FakeApi::default()
    })
    .await;
    assert!(h.controller.load_materials().await.is_failure());
    assert_eq!(
        h.controller.take_notices(),
        vec![Notice::Error("Failed to load material info".to_string())]
    );
    assert!(h.controller.materials().is_empty());
    assert_eq!(h.reports.lock().await[0].context, "Material Info Loading");
}
