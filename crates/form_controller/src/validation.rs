use std::collections::BTreeSet;

use shared::domain::{BatchRequest, DictionaryCatalog, GenerationRequest};
use thiserror::Error;

/// Upper bound for both rows and columns, shared by live and submit-time checks.
pub const MAX_GRID_DIMENSION: i64 = 20;
pub const MAX_SIZE_MM: f64 = 500.0;
pub const MAX_SPACING_MM: f64 = 100.0;
pub const MAX_BATCH_SIZE: i64 = 50;
pub const MAX_MARKERS_PER_FILE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    Dictionary,
    Rows,
    Cols,
    StartId,
    SizeMm,
    SpacingMm,
    BorderWidth,
    BatchSize,
    MarkersPerFile,
}

impl FormField {
    pub const ALL: [FormField; 9] = [
        FormField::Dictionary,
        FormField::Rows,
        FormField::Cols,
        FormField::StartId,
        FormField::SizeMm,
        FormField::SpacingMm,
        FormField::BorderWidth,
        FormField::BatchSize,
        FormField::MarkersPerFile,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormField::Dictionary => "dictionary",
            FormField::Rows => "rows",
            FormField::Cols => "cols",
            FormField::StartId => "start_id",
            FormField::SizeMm => "size_mm",
            FormField::SpacingMm => "spacing_mm",
            FormField::BorderWidth => "border_width",
            FormField::BatchSize => "batch_size",
            FormField::MarkersPerFile => "markers_per_file",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("Dictionary selection is required")]
    MissingDictionary,
    #[error("Unknown dictionary: {0}")]
    UnknownDictionary(String),
    #[error("Rows must be between 1 and {}", MAX_GRID_DIMENSION)]
    RowsOutOfRange,
    #[error("Columns must be between 1 and {}", MAX_GRID_DIMENSION)]
    ColsOutOfRange,
    #[error("Starting ID must be 0 or greater")]
    NegativeStartId,
    #[error("Size must be between 0.1 and 500mm")]
    SizeOutOfRange,
    #[error("Spacing must be between 0 and 100mm")]
    SpacingOutOfRange,
    #[error("Border width must be 0 or greater")]
    NegativeBorderWidth,
    #[error("Marker range exceeds dictionary limit ({max_markers} markers)")]
    RangeExceedsDictionary { end_id: i64, max_markers: i64 },
    #[error("Batch size must be between 1 and {}", MAX_BATCH_SIZE)]
    BatchSizeOutOfRange,
    #[error("Markers per file must be between 1 and {}", MAX_MARKERS_PER_FILE)]
    MarkersPerFileOutOfRange,
}

impl ValidationIssue {
    pub fn field(&self) -> FormField {
        match self {
            Self::MissingDictionary | Self::UnknownDictionary(_) => FormField::Dictionary,
            Self::RowsOutOfRange => FormField::Rows,
            Self::ColsOutOfRange => FormField::Cols,
            Self::NegativeStartId | Self::RangeExceedsDictionary { .. } => FormField::StartId,
            Self::SizeOutOfRange => FormField::SizeMm,
            Self::SpacingOutOfRange => FormField::SpacingMm,
            Self::NegativeBorderWidth => FormField::BorderWidth,
            Self::BatchSizeOutOfRange => FormField::BatchSize,
            Self::MarkersPerFileOutOfRange => FormField::MarkersPerFile,
        }
    }
}

/// Pure check of a request against the loaded catalog. An empty list means valid;
/// the order of issues follows the order of the form fields.
pub fn validate(request: &GenerationRequest, catalog: &DictionaryCatalog) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if request.dictionary.is_empty() {
        issues.push(ValidationIssue::MissingDictionary);
    } else if !catalog.contains(&request.dictionary) {
        issues.push(ValidationIssue::UnknownDictionary(request.dictionary.clone()));
    }

    if !(1..=MAX_GRID_DIMENSION).contains(&request.rows) {
        issues.push(ValidationIssue::RowsOutOfRange);
    }
    if !(1..=MAX_GRID_DIMENSION).contains(&request.cols) {
        issues.push(ValidationIssue::ColsOutOfRange);
    }
    if request.start_id < 0 {
        issues.push(ValidationIssue::NegativeStartId);
    }
    // Written so that NaN fails every bound.
    if !(request.size_mm > 0.0 && request.size_mm <= MAX_SIZE_MM) {
        issues.push(ValidationIssue::SizeOutOfRange);
    }
    if !(request.spacing_mm >= 0.0 && request.spacing_mm <= MAX_SPACING_MM) {
        issues.push(ValidationIssue::SpacingOutOfRange);
    }
    if request.include_outer_border
        && !(request.border_width >= 0.0 && request.border_width.is_finite())
    {
        issues.push(ValidationIssue::NegativeBorderWidth);
    }

    if let Some(max_markers) = catalog.max_markers(&request.dictionary) {
        let end_id = request.end_id();
        if end_id >= max_markers {
            issues.push(ValidationIssue::RangeExceedsDictionary {
                end_id,
                max_markers,
            });
        }
    }

    issues
}

/// Checks a batch the way `validate` checks a single sheet. Rows and columns
/// are ignored because the server lays out each file itself; the dictionary
/// range covers every file of the batch.
pub fn validate_batch(request: &BatchRequest, catalog: &DictionaryCatalog) -> Vec<ValidationIssue> {
    let mut issues: Vec<ValidationIssue> = validate(&request.base, catalog)
        .into_iter()
        .filter(|issue| {
            !matches!(
                issue,
                ValidationIssue::RowsOutOfRange
                    | ValidationIssue::ColsOutOfRange
                    | ValidationIssue::RangeExceedsDictionary { .. }
            )
        })
        .collect();

    if !(1..=MAX_BATCH_SIZE).contains(&request.batch_size) {
        issues.push(ValidationIssue::BatchSizeOutOfRange);
    }
    if !(1..=MAX_MARKERS_PER_FILE).contains(&request.markers_per_file) {
        issues.push(ValidationIssue::MarkersPerFileOutOfRange);
    }

    if let Some(max_markers) = catalog.max_markers(&request.base.dictionary) {
        let end_id = request.end_id();
        if end_id >= max_markers {
            issues.push(ValidationIssue::RangeExceedsDictionary {
                end_id,
                max_markers,
            });
        }
    }

    issues
}

pub fn format_issues(issues: &[ValidationIssue]) -> String {
    let reasons: Vec<String> = issues.iter().map(ToString::to_string).collect();
    format!(
        "Please fix the following issues:\n• {}",
        reasons.join("\n• ")
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMark {
    Valid,
    Invalid,
}

/// Per-field valid/invalid marking derived from a validation result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMarks {
    invalid: BTreeSet<FormField>,
}

impl FieldMarks {
    pub fn from_issues(issues: &[ValidationIssue]) -> Self {
        Self {
            invalid: issues.iter().map(ValidationIssue::field).collect(),
        }
    }

    pub fn mark(&self, field: FormField) -> FieldMark {
        if self.invalid.contains(&field) {
            FieldMark::Invalid
        } else {
            FieldMark::Valid
        }
    }

    /// Invalid fields in form order.
    pub fn invalid_fields(&self) -> impl Iterator<Item = FormField> + '_ {
        FormField::ALL
            .into_iter()
            .filter(|field| self.mark(*field) == FieldMark::Invalid)
    }
}

/// Live "Total markers / ID range" readout shown next to the grid inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerSummary {
    pub total: i64,
    pub start_id: i64,
    pub end_id: i64,
    pub max_markers: Option<i64>,
}

impl MarkerSummary {
    pub fn for_request(request: &GenerationRequest, catalog: &DictionaryCatalog) -> Self {
        Self {
            total: request.marker_count(),
            start_id: request.start_id,
            end_id: request.end_id(),
            max_markers: catalog.max_markers(&request.dictionary),
        }
    }

    pub fn id_range(&self) -> String {
        if self.total == 1 {
            self.start_id.to_string()
        } else {
            format!("{}-{}", self.start_id, self.end_id)
        }
    }

    pub fn capacity_hint(&self) -> Option<String> {
        self.max_markers.map(|max| format!("/ {max}"))
    }

    pub fn within_dictionary(&self) -> bool {
        match self.max_markers {
            Some(max) => self.start_id >= 0 && self.end_id < max,
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
