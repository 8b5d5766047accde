use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{
        BatchRequest, DictionaryCatalog, GenerationRequest, MaterialCatalog, Preset,
        PresetCatalog, PreviewResult,
    },
    error::ApiErrorBody,
    protocol::{
        ApplyPresetResponse, ClientErrorReport, APPLY_PRESET_PATH, BATCH_GENERATE_PATH,
        DICTIONARIES_PATH, DOWNLOAD_PATH, LOG_ERROR_PATH, MATERIAL_INFO_PATH, PRESETS_PATH,
        PREVIEW_PATH, QUICK_TEST_DOWNLOAD_PATH, QUICK_TEST_PATH,
    },
};
use tracing::{debug, warn};
use url::Url;

pub mod download;
pub mod error;

pub use download::{Artifact, ArtifactSink, FsArtifactSink};
pub use error::ClientError;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The generator backend's REST surface, as seen by the form controller.
#[async_trait]
pub trait GeneratorApi: Send + Sync {
    async fn dictionaries(&self) -> Result<DictionaryCatalog, ClientError>;
    async fn preview(&self, request: &GenerationRequest) -> Result<PreviewResult, ClientError>;
    async fn download(&self, request: &GenerationRequest) -> Result<Artifact, ClientError>;
    async fn quick_test(&self) -> Result<PreviewResult, ClientError>;
    async fn quick_test_download(&self) -> Result<Artifact, ClientError>;
    async fn presets(&self) -> Result<PresetCatalog, ClientError>;
    async fn apply_preset(&self, name: &str) -> Result<Preset, ClientError>;
    /// ZIP archive of sequential-id LightBurn files.
    async fn batch_download(&self, request: &BatchRequest) -> Result<Artifact, ClientError>;
    async fn material_info(&self) -> Result<MaterialCatalog, ClientError>;
    /// Best-effort; failures are logged and dropped.
    async fn log_error(&self, report: &ClientErrorReport);
    fn base_url(&self) -> &str;
}

pub struct HttpGeneratorClient {
    http: Client,
    base_url: String,
}

impl HttpGeneratorClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = normalize_base_url(base_url)?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `{base}{path}/{segment}` with `segment` percent-encoded as a single path
    /// segment, so `/`, `?` and `#` in it cannot change the route.
    fn endpoint_with_segment(&self, path: &str, segment: &str) -> Result<Url, ClientError> {
        let invalid = |reason: String| ClientError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason,
        };
        let mut url = Url::parse(&self.endpoint(path)).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("base url cannot carry a path".to_string()))?
            .push(segment);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.get_json_from(path, self.endpoint(path)).await
    }

    async fn get_json_from<T: DeserializeOwned>(
        &self,
        path: &str,
        url: impl reqwest::IntoUrl + Send,
    ) -> Result<T, ClientError> {
        debug!(path, "GET");
        let response = self.http.get(url).send().await?;
        read_json(path, ensure_success(response).await?).await
    }

    async fn post_json<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!(path, "POST");
        let mut request = self.http.post(self.endpoint(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        read_json(path, ensure_success(response).await?).await
    }

    async fn post_artifact<B>(&self, path: &str, body: Option<&B>) -> Result<Artifact, ClientError>
    where
        B: Serialize + ?Sized + Sync,
    {
        debug!(path, "POST (artifact)");
        let mut request = self.http.post(self.endpoint(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = ensure_success(request.send().await?).await?;

        let filename = header_str(&response, header::CONTENT_DISPOSITION)
            .and_then(|value| download::content_disposition_filename(&value));
        let content_type = header_str(&response, header::CONTENT_TYPE);
        let bytes = response.bytes().await?.to_vec();

        debug!(
            path,
            size_bytes = bytes.len(),
            server_filename = filename.as_deref().unwrap_or("-"),
            "artifact received"
        );
        Ok(Artifact {
            bytes,
            filename,
            content_type,
        })
    }
}

#[async_trait]
impl GeneratorApi for HttpGeneratorClient {
    async fn dictionaries(&self) -> Result<DictionaryCatalog, ClientError> {
        self.get_json(DICTIONARIES_PATH).await
    }

    async fn preview(&self, request: &GenerationRequest) -> Result<PreviewResult, ClientError> {
        self.post_json(PREVIEW_PATH, Some(request)).await
    }

    async fn download(&self, request: &GenerationRequest) -> Result<Artifact, ClientError> {
        self.post_artifact(DOWNLOAD_PATH, Some(request)).await
    }

    async fn quick_test(&self) -> Result<PreviewResult, ClientError> {
        self.post_json::<(), _>(QUICK_TEST_PATH, None).await
    }

    async fn quick_test_download(&self) -> Result<Artifact, ClientError> {
        self.post_artifact::<()>(QUICK_TEST_DOWNLOAD_PATH, None)
            .await
    }

    async fn presets(&self) -> Result<PresetCatalog, ClientError> {
        self.get_json(PRESETS_PATH).await
    }

    async fn apply_preset(&self, name: &str) -> Result<Preset, ClientError> {
        let url = self.endpoint_with_segment(APPLY_PRESET_PATH, name)?;
        let body: ApplyPresetResponse = self.get_json_from(APPLY_PRESET_PATH, url).await?;
        match body.preset {
            Some(preset) if body.success => Ok(preset),
            _ => Err(ClientError::Server {
                status: StatusCode::OK.as_u16(),
                message: body.error.or_else(|| Some(format!("Preset not found: {name}"))),
            }),
        }
    }

    async fn batch_download(&self, request: &BatchRequest) -> Result<Artifact, ClientError> {
        self.post_artifact(BATCH_GENERATE_PATH, Some(request)).await
    }

    async fn material_info(&self) -> Result<MaterialCatalog, ClientError> {
        self.get_json(MATERIAL_INFO_PATH).await
    }

    async fn log_error(&self, report: &ClientErrorReport) {
        let result = self
            .http
            .post(self.endpoint(LOG_ERROR_PATH))
            .json(report)
            .send()
            .await;
        if let Err(err) = result {
            warn!(error = %err, context = %report.context, "failed to send error report");
        }
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Validates scheme and strips the trailing slash so paths can be appended verbatim.
pub fn normalize_base_url(raw: &str) -> Result<String, ClientError> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).map_err(|e| ClientError::InvalidBaseUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ClientError::InvalidBaseUrl {
            url: trimmed.to_string(),
            reason: "base url must start with http:// or https://".to_string(),
        });
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    let message = serde_json::from_slice::<ApiErrorBody>(&body)
        .ok()
        .map(|body| body.error);
    warn!(
        status = status.as_u16(),
        error = message.as_deref().unwrap_or("<no error body>"),
        "generator api returned failure"
    );
    Err(ClientError::Server {
        status: status.as_u16(),
        message,
    })
}

async fn read_json<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, ClientError> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| ClientError::Malformed {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

fn header_str(response: &Response, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
