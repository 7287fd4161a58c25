use serde::{Deserialize, Serialize};

/// Catalog-scoped track key. Doubles as the storage-object key.
///
/// Treated as an opaque, case-sensitive identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct TrackKey(pub String);

impl TrackKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl AsRef<str> for TrackKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TrackKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for TrackKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for TrackKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The track metadata the client needs for listing and playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub key: TrackKey,
    pub song_name: String,
    pub artist_name: String,
    /// Duration in seconds; 0 when unknown.
    pub duration_seconds: u32,
}

impl Track {
    pub fn new(
        key: impl Into<TrackKey>,
        song_name: impl Into<String>,
        artist_name: impl Into<String>,
        duration_seconds: u32,
    ) -> Self {
        Self {
            key: key.into(),
            song_name: song_name.into(),
            artist_name: artist_name.into(),
            duration_seconds,
        }
    }
}

/// Short-lived, pre-signed playable URL. Never cached: it expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StreamUrl(pub String);

impl StreamUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for StreamUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StreamUrl {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for StreamUrl {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Opaque continuation cursor returned by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuationToken(pub String);

impl ContinuationToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl AsRef<str> for ContinuationToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContinuationToken {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// A single listing page plus an optional token for the next one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CatalogPage {
    pub items: Vec<Track>,
    pub next: Option<ContinuationToken>,
}

impl CatalogPage {
    pub fn single_page(items: Vec<Track>) -> Self {
        Self { items, next: None }
    }

    pub fn with_next(items: Vec<Track>, next: impl Into<String>) -> Self {
        Self {
            items,
            next: Some(ContinuationToken::new(next)),
        }
    }

    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}
