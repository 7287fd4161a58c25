mod mapping;
pub mod models;
pub mod upload;

use mapping::map_page;
use musify_core::{
    CatalogError, CatalogPage, CatalogResult, CatalogService, ListRequest, StreamUrl, TrackKey,
};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use url::Url;

pub use upload::{UploadError, UploadRequest, ValidationFailure};

const TRACKS_PATH: &str = "api/musictrack";

/// Catalog backed by the music track REST API.
#[derive(Clone)]
pub struct HttpCatalog {
    client: Client,
    base_url: Url,
}

impl HttpCatalog {
    pub fn new(base_url: &str) -> CatalogResult<Self> {
        let base_url = parse_base_url(base_url)?;
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| CatalogError::Other {
                message: e.to_string(),
            })?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, suffix: &str) -> CatalogResult<Url> {
        let path = if suffix.is_empty() {
            TRACKS_PATH.to_string()
        } else {
            format!("{TRACKS_PATH}/{suffix}")
        };
        self.base_url.join(&path).map_err(|e| CatalogError::Other {
            message: e.to_string(),
        })
    }
}

/// Keeps any path prefix of the base address when joining endpoint paths.
fn parse_base_url(raw: &str) -> CatalogResult<Url> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&with_slash).map_err(|e| CatalogError::Other {
        message: format!("invalid base_url {raw:?}: {e}"),
    })
}

fn transport_error(err: reqwest::Error) -> CatalogError {
    CatalogError::network(err.to_string())
}

/// Rejects non-success statuses; the body is kept for the message.
async fn ensure_success(resp: Response) -> CatalogResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

fn status_error(status: StatusCode, body: &str) -> CatalogError {
    let body = body.trim();
    if body.is_empty() {
        CatalogError::network(format!("server returned {status}"))
    } else {
        CatalogError::network(format!("server returned {status}: {body}"))
    }
}

#[async_trait::async_trait]
impl CatalogService for HttpCatalog {
    async fn list_tracks(&self, request: ListRequest) -> CatalogResult<CatalogPage> {
        let url = self.endpoint("")?;
        let mut query = vec![("limit", request.limit.to_string())];
        if let Some(next) = &request.next {
            query.push(("nextToken", next.as_ref().to_string()));
        }
        if let Some(search) = request.search.as_deref().filter(|s| !s.is_empty()) {
            query.push(("search", search.to_string()));
        }
        tracing::debug!(
            limit = request.limit,
            search = request.search.as_deref().unwrap_or(""),
            continued = request.next.is_some(),
            "listing tracks"
        );

        let resp = self
            .client
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(transport_error)?;
        let resp = ensure_success(resp).await?;
        let body: models::TrackPageResponse = resp
            .json()
            .await
            .map_err(|e| CatalogError::decode(e.to_string()))?;
        Ok(map_page(body))
    }

    async fn resolve_stream_url(&self, key: &TrackKey) -> CatalogResult<StreamUrl> {
        let url = self.endpoint("stream")?;
        let resp = self
            .client
            .get(url)
            .query(&[("key", key.as_ref())])
            .send()
            .await
            .map_err(transport_error)?;
        let resp = ensure_success(resp).await?;
        let body = resp
            .text()
            .await
            .map_err(|e| CatalogError::decode(e.to_string()))?;
        let body = body.trim();
        if body.is_empty() {
            return Err(CatalogError::decode(format!("empty stream url for {key}")));
        }
        Ok(StreamUrl::new(body))
    }
}
