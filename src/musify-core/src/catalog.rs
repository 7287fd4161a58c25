use crate::models::{CatalogPage, ContinuationToken, StreamUrl, TrackKey};
use thiserror::Error;

/// Failures surfaced by a catalog service to the controllers and shell.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Request rejected or transport failure.
    #[error("network error: {message}")]
    Network { message: String },
    /// Response body was not what the client expected.
    #[error("decode error: {message}")]
    Decode { message: String },
    #[error("track already exists: {artist_name} / {song_name}")]
    Duplicate {
        artist_name: String,
        song_name: String,
    },
    #[error("{message}")]
    Other { message: String },
}

impl CatalogError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// One listing request: page size, optional cursor, optional filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub limit: u32,
    pub next: Option<ContinuationToken>,
    pub search: Option<String>,
}

impl ListRequest {
    pub fn first_page(limit: u32) -> Self {
        Self {
            limit,
            next: None,
            search: None,
        }
    }

    /// Empty queries mean "no filter" and are dropped.
    pub fn with_search(mut self, query: &str) -> Self {
        self.search = if query.is_empty() {
            None
        } else {
            Some(query.to_string())
        };
        self
    }

    pub fn with_next(mut self, next: Option<ContinuationToken>) -> Self {
        self.next = next;
        self
    }
}

/// Remote catalog interface.
///
/// Implementations return **stream URLs only**; decoding and output belong to
/// the media element.
#[async_trait::async_trait]
pub trait CatalogService: Send + Sync {
    async fn list_tracks(&self, request: ListRequest) -> CatalogResult<CatalogPage>;

    /// Resolves a short-lived playable URL for the given key.
    async fn resolve_stream_url(&self, key: &TrackKey) -> CatalogResult<StreamUrl>;
}
