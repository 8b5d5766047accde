use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const LIGHTBURN_EXTENSION: &str = "lbrn2";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryInfo {
    pub max_markers: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bits: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Dictionary id -> capacity, as served by the generator backend. Read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DictionaryCatalog(BTreeMap<String, DictionaryInfo>);

impl DictionaryCatalog {
    pub fn new(entries: impl IntoIterator<Item = (String, DictionaryInfo)>) -> Self {
        Self(entries.into_iter().collect())
    }

    pub fn get(&self, dictionary: &str) -> Option<&DictionaryInfo> {
        self.0.get(dictionary)
    }

    pub fn max_markers(&self, dictionary: &str) -> Option<i64> {
        self.get(dictionary).map(|info| info.max_markers)
    }

    pub fn contains(&self, dictionary: &str) -> bool {
        self.0.contains_key(dictionary)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DictionaryInfo)> {
        self.0.iter().map(|(id, info)| (id.as_str(), info))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub dictionary: String,
    pub rows: i64,
    pub cols: i64,
    pub start_id: i64,
    pub size_mm: f64,
    pub spacing_mm: f64,
    pub include_borders: bool,
    pub include_labels: bool,
    pub include_outer_border: bool,
    pub border_width: f64,
}

impl GenerationRequest {
    pub fn marker_count(&self) -> i64 {
        self.rows.saturating_mul(self.cols)
    }

    pub fn end_id(&self) -> i64 {
        self.start_id
            .saturating_add(self.marker_count())
            .saturating_sub(1)
    }

    /// Filename used when the server does not name the artifact itself.
    pub fn artifact_filename(&self) -> String {
        format!(
            "aruco_{}_{}x{}_id{}.{LIGHTBURN_EXTENSION}",
            self.dictionary, self.rows, self.cols, self.start_id
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewResult {
    pub svg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_count: Option<u32>,
}

impl PreviewResult {
    pub fn dimensions(&self) -> Option<Dimensions> {
        self.dimensions
            .or(match (self.total_width, self.total_height) {
                (Some(width), Some(height)) => Some(Dimensions { width, height }),
                _ => None,
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub dictionary: String,
    pub rows: i64,
    pub cols: i64,
    pub size_mm: f64,
    pub spacing_mm: f64,
    pub include_borders: bool,
    pub include_labels: bool,
}

pub type PresetCatalog = BTreeMap<String, Preset>;

/// Sequential-id batch: `batch_size` files of `markers_per_file` markers each,
/// numbered on from `base.start_id`. The server picks each file's grid itself,
/// so `base.rows`/`base.cols` are not used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    #[serde(flatten)]
    pub base: GenerationRequest,
    pub batch_size: i64,
    pub markers_per_file: i64,
}

impl BatchRequest {
    pub fn total_markers(&self) -> i64 {
        self.batch_size.saturating_mul(self.markers_per_file)
    }

    pub fn end_id(&self) -> i64 {
        self.base
            .start_id
            .saturating_add(self.total_markers())
            .saturating_sub(1)
    }

    pub fn archive_filename(&self) -> String {
        format!(
            "aruco_batch_{}files_{}markers.zip",
            self.batch_size,
            self.total_markers()
        )
    }
}

/// Laser settings for one material, as served by `GET /api/material_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// mm/min
    pub cut_speed: f64,
    /// percent
    pub cut_power: f64,
    #[serde(default = "default_cut_passes")]
    pub cut_passes: u32,
    pub engrave_speed: f64,
    pub engrave_power: f64,
    pub mark_speed: f64,
    pub mark_power: f64,
}

fn default_cut_passes() -> u32 {
    1
}

pub type MaterialCatalog = BTreeMap<String, MaterialProfile>;
