use crate::error::{PromptImgError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Body of the POST to the generation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

/// What a 2xx body is read for. Every other field is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedBody {
    #[serde(rename = "imageUrl", default)]
    pub image_url: Option<String>,
}

/// What a non-2xx body is read for. Every other field is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// Renderable image source returned by the service: a remote URL or an inline `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_data_url(&self) -> bool {
        self.0.starts_with("data:")
    }

    pub fn is_remote(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }

    /// Decodes a `data:<mime>;base64,<payload>` reference into its mime type and bytes.
    /// Returns `Ok(None)` for anything that is not a data URL.
    pub fn decode_inline(&self) -> Result<Option<(String, Vec<u8>)>> {
        let Some(rest) = self.0.strip_prefix("data:") else {
            return Ok(None);
        };

        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| PromptImgError::Decode("data URL has no payload".into()))?;

        let mime = header
            .strip_suffix(";base64")
            .ok_or_else(|| PromptImgError::Decode("only base64 data URLs are supported".into()))?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| PromptImgError::Decode(e.to_string()))?;

        let mime = if mime.is_empty() {
            "application/octet-stream"
        } else {
            mime
        };

        Ok(Some((mime.to_string(), bytes)))
    }

    /// Writes an inline image into `dir` under `stem` plus an extension derived
    /// from its mime type. Remote references are left alone and yield `Ok(None)`.
    pub fn save_inline(&self, dir: impl AsRef<Path>, stem: &str) -> Result<Option<PathBuf>> {
        let Some((mime, bytes)) = self.decode_inline()? else {
            return Ok(None);
        };

        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.{}", stem, extension_for_mime(&mime)));
        std::fs::write(&path, bytes)?;

        log::info!("Saved inline image to {}", path.display());
        Ok(Some(path))
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ImageRef {
    fn from(reference: String) -> Self {
        Self(reference)
    }
}

impl From<&str> for ImageRef {
    fn from(reference: &str) -> Self {
        Self(reference.to_string())
    }
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/svg+xml" => "svg",
        _ => "bin",
    }
}
