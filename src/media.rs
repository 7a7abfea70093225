//! Video media handling: size checks, ingestion into data URIs and embed URLs.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::app_response::AppResponse;
use crate::lesson_model::LessonKind;

/// Upload limit applied when the caller does not supply one.
pub const DEFAULT_MEDIA_LIMIT_MB: f64 = 5.0;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// A user-selected file, described by its name and size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
}

impl MediaSource {
    /// Reads name and size from the file's metadata.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AppResponse> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path).map_err(|e| {
            AppResponse::MediaError(format!("Cannot read {}: {e}", path.display()))
        })?;
        if !metadata.is_file() {
            return Err(AppResponse::MediaError(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            size: metadata.len(),
        })
    }

    /// MIME type guessed from the file extension.
    pub fn mime_type(&self) -> &'static str {
        let extension = self
            .path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "mp4" => "video/mp4",
            "m4v" => "video/x-m4v",
            "webm" => "video/webm",
            "ogg" | "ogv" => "video/ogg",
            "mov" => "video/quicktime",
            "avi" => "video/x-msvideo",
            "mkv" => "video/x-matroska",
            _ => "application/octet-stream",
        }
    }

    pub fn is_video(&self) -> bool {
        self.mime_type().starts_with("video/")
    }

    pub fn validate_size(&self, limit_mb: f64) -> SizeValidation {
        validate_media_size(self.size, limit_mb)
    }
}

/// Outcome of a size check, with a message fit for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeValidation {
    pub valid: bool,
    pub message: String,
}

/// Checks `size_bytes` against `limit_mb` megabytes (1 MB = 1024 * 1024 bytes).
///
/// A file exactly at the limit is accepted.
///
/// ```rust
/// use lesson_library_core::media::validate_media_size;
///
/// assert!(validate_media_size(5 * 1024 * 1024, 5.0).valid);
/// let too_big = validate_media_size(5 * 1024 * 1024 + 1, 5.0);
/// assert!(!too_big.valid);
/// assert!(too_big.message.contains("5.00MB"));
/// ```
pub fn validate_media_size(size_bytes: u64, limit_mb: f64) -> SizeValidation {
    let size_mb = size_bytes as f64 / BYTES_PER_MB;

    if size_bytes as f64 > limit_mb * BYTES_PER_MB {
        SizeValidation {
            valid: false,
            message: format!(
                "Video file is too large ({size_mb:.2}MB). Maximum size is {limit_mb}MB."
            ),
        }
    } else {
        SizeValidation {
            valid: true,
            message: format!("Video file size: {size_mb:.2}MB"),
        }
    }
}

/// A file read fully into memory and encoded as a data URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestedMedia {
    pub data: String,
    pub file_name: String,
    pub size: u64,
}

impl IngestedMedia {
    /// A video payload that embeds this media.
    pub fn into_video_kind(self) -> LessonKind {
        LessonKind::Video {
            video_url: None,
            video_data: Some(self.data),
            video_file_name: Some(self.file_name),
        }
    }
}

/// Reads `source` completely and encodes it as `data:<mime>;base64,<payload>`.
///
/// Fails on any read error, or when `cancel` fires before the read finishes.
/// Size limits are not checked here; callers validate first.
pub async fn ingest_media(
    source: &MediaSource,
    cancel: &CancellationToken,
) -> Result<IngestedMedia, AppResponse> {
    let bytes = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("Ingestion of {} cancelled", source.file_name);
            return Err(AppResponse::MediaError(format!(
                "Processing of {} was cancelled",
                source.file_name
            )));
        }
        read = tokio::fs::read(&source.path) => read.map_err(|e| {
            warn!("Error processing video {}: {e}", source.path.display());
            AppResponse::MediaError(format!("Error processing video file: {e}"))
        })?,
    };

    let data = format!("data:{};base64,{}", source.mime_type(), STANDARD.encode(&bytes));
    Ok(IngestedMedia {
        data,
        file_name: source.file_name.clone(),
        size: bytes.len() as u64,
    })
}

/// Maps a YouTube or Vimeo page URL to its embeddable player URL.
pub fn embed_url(url: &str) -> Option<String> {
    if url.contains("youtube.com") || url.contains("youtu.be") {
        let video_id = if let Some((_, rest)) = url.split_once("youtube.com/watch?v=") {
            rest.split('&').next()
        } else if let Some((_, rest)) = url.split_once("youtu.be/") {
            rest.split('?').next()
        } else if let Some((_, rest)) = url.split_once("youtube.com/embed/") {
            rest.split('?').next()
        } else {
            None
        };

        return video_id
            .filter(|id| !id.is_empty())
            .map(|id| format!("https://www.youtube.com/embed/{id}"));
    }

    if let Some((_, rest)) = url.split_once("vimeo.com/") {
        return rest
            .split('?')
            .next()
            .filter(|id| !id.is_empty())
            .map(|id| format!("https://player.vimeo.com/video/{id}"));
    }

    None
}
