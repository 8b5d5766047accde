//! Terminal rendering of controller state. Everything here returns text so the
//! binary decides where it goes.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use form_controller::{
    validation::{FieldMarks, MarkerSummary},
    Controls, FormFields, GenerationSource, Notice, UiState,
};
use shared::domain::{DictionaryCatalog, MaterialCatalog, PresetCatalog, PreviewResult};

pub const PREVIEW_FILENAME: &str = "preview.svg";

pub fn state(state: &UiState) -> String {
    match state {
        UiState::Empty => "No preview generated yet".to_string(),
        UiState::Loading => "Generating preview...".to_string(),
        UiState::PreviewShown { preview, source } => {
            let origin = match source {
                GenerationSource::QuickTest => "quick test".to_string(),
                GenerationSource::Form(request) => format!(
                    "{} {}x{} from id {}",
                    request.dictionary, request.rows, request.cols, request.start_id
                ),
            };
            match preview.dimensions() {
                Some(d) => format!(
                    "Preview ready ({origin}): {:.1} x {:.1} mm",
                    d.width, d.height
                ),
                None => format!("Preview ready ({origin})"),
            }
        }
        UiState::ErrorShown { message } => format!("Error: {message}"),
    }
}

pub fn controls(controls: Controls) -> String {
    fn flag(enabled: bool) -> &'static str {
        if enabled {
            "enabled"
        } else {
            "disabled"
        }
    }
    format!(
        "generate: {} | quick test: {} | download: {}",
        flag(controls.generate),
        flag(controls.quick_test),
        flag(controls.download)
    )
}

pub fn summary(summary: &MarkerSummary, marks: &FieldMarks, form: &FormFields) -> String {
    let mut out = format!(
        "Total markers: {} | ID range: {}",
        summary.total,
        summary.id_range()
    );
    if let Some(hint) = summary.capacity_hint() {
        out.push(' ');
        out.push_str(&hint);
        if !summary.within_dictionary() {
            out.push_str(" (out of range)");
        }
    }
    if form.border_width_visible() {
        out.push_str(&format!(" | outer border: {} mm", form.border_width.trim()));
    }
    let invalid: Vec<&str> = marks.invalid_fields().map(|f| f.label()).collect();
    if !invalid.is_empty() {
        out.push_str(&format!("\nInvalid fields: {}", invalid.join(", ")));
    }
    out
}

pub fn notice(notice: &Notice) -> String {
    match notice {
        Notice::Success(message) => format!("✓ {message}"),
        Notice::Error(message) => format!("✗ {message}"),
    }
}

pub fn catalog(catalog: &DictionaryCatalog) -> String {
    catalog
        .iter()
        .map(|(id, info)| match &info.description {
            Some(description) => format!("{id}\t{} markers\t{description}", info.max_markers),
            None => format!("{id}\t{} markers", info.max_markers),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn presets(presets: &PresetCatalog) -> String {
    presets
        .iter()
        .map(|(key, preset)| {
            format!(
                "{key}\t{} ({} {}x{}, {} mm)",
                preset.name, preset.dictionary, preset.rows, preset.cols, preset.size_mm
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn materials(materials: &MaterialCatalog) -> String {
    materials
        .iter()
        .map(|(key, m)| {
            format!(
                "{key}\t{}\n  cut {} mm/min @ {}% x{} | engrave {} mm/min @ {}% | mark {} mm/min @ {}%",
                m.name,
                m.cut_speed,
                m.cut_power,
                m.cut_passes,
                m.engrave_speed,
                m.engrave_power,
                m.mark_speed,
                m.mark_power
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Writes the SVG markup unmodified to `<dir>/preview.svg`.
pub fn write_preview(dir: &Path, preview: &PreviewResult) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory '{}'", dir.display()))?;
    let path = dir.join(PREVIEW_FILENAME);
    fs::write(&path, preview.svg.as_bytes())
        .with_context(|| format!("failed to write preview '{}'", path.display()))?;
    Ok(path)
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
