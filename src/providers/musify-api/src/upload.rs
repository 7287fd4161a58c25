//! Three-step upload: request a pre-signed PUT URL, send the file bytes to
//! storage, then register the track metadata with the catalog.

use std::path::{Path, PathBuf};

use musify_core::{CatalogError, Track};
use reqwest::{header::CONTENT_TYPE, StatusCode};
use thiserror::Error;

use crate::mapping::map_track;
use crate::models::{MusicTrack, MusicTrackRequest, UploadUrlResponse};
use crate::{ensure_success, transport_error, HttpCatalog};

/// Form input rejected before any network traffic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("artist name is required")]
    MissingArtist,
    #[error("song name is required")]
    MissingSong,
    #[error("an existing audio file is required")]
    MissingFile,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
    #[error("failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub artist_name: String,
    pub song_name: String,
    pub file: Option<PathBuf>,
}

impl UploadRequest {
    pub fn new(
        artist_name: impl Into<String>,
        song_name: impl Into<String>,
        file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            artist_name: artist_name.into(),
            song_name: song_name.into(),
            file: Some(file.into()),
        }
    }

    /// Checks fields in form order; the first failure wins. A path that
    /// does not name a regular file counts as no file.
    pub fn validate(&self) -> Result<&Path, ValidationFailure> {
        if self.artist_name.trim().is_empty() {
            return Err(ValidationFailure::MissingArtist);
        }
        if self.song_name.trim().is_empty() {
            return Err(ValidationFailure::MissingSong);
        }
        match self.file.as_deref() {
            Some(path) if path.is_file() => Ok(path),
            _ => Err(ValidationFailure::MissingFile),
        }
    }
}

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("flac") => "audio/flac",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("m4a") | Some("mp4") | Some("aac") => "audio/mp4",
        _ => "application/octet-stream",
    }
}

/// Whole seconds of playing time, or 0 when the header can't be read.
async fn probe_seconds(path: &Path) -> u32 {
    let owned = path.to_path_buf();
    let probed = tokio::task::spawn_blocking(move || musify_audio::probe_duration(&owned)).await;
    match probed {
        Ok(Ok(seconds)) if seconds.is_finite() && seconds >= 0.0 => {
            seconds.round().min(f64::from(u32::MAX)) as u32
        }
        Ok(Ok(seconds)) => {
            tracing::warn!(path = %path.display(), seconds, "probe returned unusable duration; using 0");
            0
        }
        Ok(Err(err)) => {
            tracing::warn!(path = %path.display(), error = %err, "could not determine duration; using 0");
            0
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "duration probe task failed; using 0");
            0
        }
    }
}

fn duplicate(request: &UploadRequest) -> CatalogError {
    CatalogError::Duplicate {
        artist_name: request.artist_name.trim().to_string(),
        song_name: request.song_name.trim().to_string(),
    }
}

impl HttpCatalog {
    /// Runs the upload flow and returns the track the catalog created.
    ///
    /// Callers refresh their listing afterwards.
    pub async fn upload_track(&self, request: &UploadRequest) -> Result<Track, UploadError> {
        let path = request.validate()?;
        let artist_name = request.artist_name.trim();
        let song_name = request.song_name.trim();

        let bytes = tokio::fs::read(path).await.map_err(|e| UploadError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let duration = probe_seconds(path).await;
        tracing::info!(artist = artist_name, song = song_name, duration, "uploading track");

        let ticket = self.request_upload_url(request, artist_name, song_name).await?;

        let resp = self
            .client
            .put(&ticket.upload_url)
            .header(CONTENT_TYPE, content_type_for(path))
            .body(bytes)
            .send()
            .await
            .map_err(transport_error)?;
        ensure_success(resp).await?;
        tracing::debug!(key = %ticket.s3_key, "file stored");

        let url = self.endpoint("metadata")?;
        let resp = self
            .client
            .post(url)
            .json(&MusicTrackRequest {
                artist_name,
                song_name,
                s3_key: &ticket.s3_key,
                duration,
            })
            .send()
            .await
            .map_err(transport_error)?;
        if resp.status() == StatusCode::CONFLICT {
            return Err(duplicate(request).into());
        }
        let resp = ensure_success(resp).await?;
        let created: MusicTrack = resp
            .json()
            .await
            .map_err(|e| CatalogError::decode(e.to_string()))?;
        let track = map_track(created);
        tracing::info!(key = %track.key, "upload complete");
        Ok(track)
    }

    async fn request_upload_url(
        &self,
        request: &UploadRequest,
        artist_name: &str,
        song_name: &str,
    ) -> Result<UploadUrlResponse, CatalogError> {
        let url = self.endpoint("upload-url")?;
        let resp = self
            .client
            .get(url)
            .query(&[("artistName", artist_name), ("songName", song_name)])
            .send()
            .await
            .map_err(transport_error)?;
        if resp.status() == StatusCode::CONFLICT {
            tracing::warn!(artist = artist_name, song = song_name, "track already exists");
            return Err(duplicate(request));
        }
        let resp = ensure_success(resp).await?;
        resp.json()
            .await
            .map_err(|e| CatalogError::decode(e.to_string()))
    }
}
