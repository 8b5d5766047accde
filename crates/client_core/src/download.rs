//! Binary artifact plumbing: server-supplied filenames and the save side effect.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

impl Artifact {
    /// The server-supplied name if there is a usable one, otherwise `fallback`.
    pub fn filename_or(&self, fallback: &str) -> String {
        self.filename
            .clone()
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Extracts the filename from a `Content-Disposition` header value.
/// `filename*=` (RFC 5987) takes precedence over a plain `filename=`.
pub fn content_disposition_filename(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in split_params(header) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename" => plain = Some(unquote(value.trim())),
            "filename*" => extended = decode_extended_value(value.trim()),
            _ => {}
        }
    }

    extended.or(plain).and_then(|name| sanitize_filename(&name))
}

/// Splits on `;` outside double quotes, honouring backslash escapes inside them.
fn split_params(header: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in header.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                params.push(header[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(header[start..].trim());
    params
}

fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .map(|v| v.replace("\\\"", "\""))
        .unwrap_or_else(|| value.to_string())
}

fn decode_extended_value(value: &str) -> Option<String> {
    // charset'language'percent-encoded
    let mut parts = value.splitn(3, '\'');
    let charset = parts.next()?;
    let _language = parts.next()?;
    let encoded = parts.next()?;
    if !charset.eq_ignore_ascii_case("utf-8") {
        return None;
    }
    percent_decode(encoded)
}

fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = (*bytes.get(i + 1)? as char).to_digit(16)?;
            let lo = (*bytes.get(i + 2)? as char).to_digit(16)?;
            out.push(((hi << 4) | lo) as u8);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Keeps only the final path component; rejects names that would not be a file.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if last.is_empty() || last == "." || last == ".." || last.contains('\0') {
        return None;
    }
    Some(last.to_string())
}

/// Where downloaded artifacts end up. Stands in for the browser's save dialog.
pub trait ArtifactSink: Send + Sync {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf>;
}

pub struct FsArtifactSink {
    dir: PathBuf,
}

impl FsArtifactSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactSink for FsArtifactSink {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let filename = sanitize_filename(filename)
            .ok_or_else(|| anyhow!("refusing to save artifact under name '{filename}'"))?;
        fs::create_dir_all(&self.dir).with_context(|| {
            format!("failed to create output directory '{}'", self.dir.display())
        })?;
        let path = self.dir.join(filename);
        fs::write(&path, bytes)
            .with_context(|| format!("failed to write artifact '{}'", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
#[path = "tests/download_tests.rs"]
mod tests;
