use crate::catalog::{CatalogService, ListRequest};
use crate::models::TrackKey;
use std::collections::HashSet;
use thiserror::Error;

/// Fixtures a catalog implementation supplies to run the shared contract suite.
#[derive(Debug, Clone)]
pub struct CatalogContractExpectations {
    pub page_size: u32,
    /// Key expected first in the unfiltered first page (deterministic order).
    pub expected_first_key: TrackKey,
    /// When set, the first page must carry a continuation token and the
    /// second page must be fetchable with it.
    pub expects_second_page: bool,
    pub search: Option<SearchExpectation>,
    pub stream_key: TrackKey,
}

#[derive(Debug, Clone)]
pub struct SearchExpectation {
    pub query: String,
    pub expected_key: TrackKey,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogContractError {
    #[error("first page was empty")]
    EmptyFirstPage,
    #[error("first page returned wrong first key: expected {expected:?}, got {actual:?}")]
    WrongFirstKey { expected: TrackKey, actual: TrackKey },
    #[error("page returned {actual} items for limit {limit}")]
    PageTooLarge { limit: u32, actual: usize },
    #[error("page contained duplicate key {key:?}")]
    DuplicateKey { key: TrackKey },
    #[error("expected a continuation token on the first page")]
    MissingContinuation,
    #[error("search {query:?} did not return {expected:?}")]
    SearchMissing { query: String, expected: TrackKey },
    #[error("stream URL was empty for key {key:?}")]
    EmptyStreamUrl { key: TrackKey },
    #[error("catalog error while running contract: {0}")]
    CatalogFailure(String),
}

/// Runs the shared contract suite against a catalog implementation.
pub async fn run_catalog_contract<C: CatalogService + ?Sized>(
    catalog: &C,
    expectations: &CatalogContractExpectations,
) -> Result<(), CatalogContractError> {
    verify_listing(catalog, expectations).await?;
    verify_search(catalog, expectations).await?;
    verify_stream(catalog, expectations).await?;
    Ok(())
}

async fn verify_listing<C: CatalogService + ?Sized>(
    catalog: &C,
    expectations: &CatalogContractExpectations,
) -> Result<(), CatalogContractError> {
    let page = catalog
        .list_tracks(ListRequest::first_page(expectations.page_size))
        .await
        .map_err(|e| CatalogContractError::CatalogFailure(e.to_string()))?;

    let first = page
        .items
        .first()
        .ok_or(CatalogContractError::EmptyFirstPage)?;
    if first.key != expectations.expected_first_key {
        return Err(CatalogContractError::WrongFirstKey {
            expected: expectations.expected_first_key.clone(),
            actual: first.key.clone(),
        });
    }
    if page.items.len() > expectations.page_size as usize {
        return Err(CatalogContractError::PageTooLarge {
            limit: expectations.page_size,
            actual: page.items.len(),
        });
    }
    let mut seen = HashSet::new();
    for track in &page.items {
        if !seen.insert(&track.key) {
            return Err(CatalogContractError::DuplicateKey {
                key: track.key.clone(),
            });
        }
    }

    if expectations.expects_second_page {
        let next = page.next.ok_or(CatalogContractError::MissingContinuation)?;
        catalog
            .list_tracks(ListRequest::first_page(expectations.page_size).with_next(Some(next)))
            .await
            .map_err(|e| CatalogContractError::CatalogFailure(e.to_string()))?;
    }
    Ok(())
}

async fn verify_search<C: CatalogService + ?Sized>(
    catalog: &C,
    expectations: &CatalogContractExpectations,
) -> Result<(), CatalogContractError> {
    let Some(search) = &expectations.search else {
        return Ok(());
    };
    let page = catalog
        .list_tracks(ListRequest::first_page(expectations.page_size).with_search(&search.query))
        .await
        .map_err(|e| CatalogContractError::CatalogFailure(e.to_string()))?;
    if !page.items.iter().any(|t| t.key == search.expected_key) {
        return Err(CatalogContractError::SearchMissing {
            query: search.query.clone(),
            expected: search.expected_key.clone(),
        });
    }
    Ok(())
}

async fn verify_stream<C: CatalogService + ?Sized>(
    catalog: &C,
    expectations: &CatalogContractExpectations,
) -> Result<(), CatalogContractError> {
    let url = catalog
        .resolve_stream_url(&expectations.stream_key)
        .await
        .map_err(|e| CatalogContractError::CatalogFailure(e.to_string()))?;
    if url.is_empty() {
        return Err(CatalogContractError::EmptyStreamUrl {
            key: expectations.stream_key.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogPage, StreamUrl, Track};
    use crate::testing::ScriptedCatalog;

    fn expectations() -> CatalogContractExpectations {
        CatalogContractExpectations {
            page_size: 2,
            expected_first_key: TrackKey::new("tracks/a.mp3"),
            expects_second_page: true,
            search: Some(SearchExpectation {
                query: "b".into(),
                expected_key: TrackKey::new("tracks/b.mp3"),
            }),
            stream_key: TrackKey::new("tracks/a.mp3"),
        }
    }

    fn scripted() -> ScriptedCatalog {
        let catalog = ScriptedCatalog::new();
        catalog.push_page(CatalogPage::with_next(
            vec![
                Track::new("tracks/a.mp3", "A", "Artist", 100),
                Track::new("tracks/b.mp3", "B", "Artist", 120),
            ],
            "t1",
        ));
        catalog.push_page(CatalogPage::single_page(vec![Track::new(
            "tracks/c.mp3",
            "C",
            "Artist",
            90,
        )]));
        catalog.push_page(CatalogPage::single_page(vec![Track::new(
            "tracks/b.mp3",
            "B",
            "Artist",
            120,
        )]));
        catalog
    }

    #[tokio::test]
    async fn contract_passes_for_well_behaved_catalog() {
        let catalog = scripted();
        let result = run_catalog_contract(&catalog, &expectations()).await;
        assert!(result.is_ok(), "expected contract to pass: {result:?}");
        let calls = catalog.list_calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[1].next.is_some());
        assert_eq!(calls[2].search.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn contract_flags_duplicate_keys() {
        let catalog = ScriptedCatalog::new();
        catalog.push_page(CatalogPage::single_page(vec![
            Track::new("tracks/a.mp3", "A", "Artist", 100),
            Track::new("tracks/a.mp3", "A", "Artist", 100),
        ]));
        let result = run_catalog_contract(&catalog, &expectations()).await;
        assert!(matches!(
            result,
            Err(CatalogContractError::DuplicateKey { .. })
        ));
    }

    #[tokio::test]
    async fn contract_flags_empty_stream_url() {
        let catalog = scripted();
        catalog.push_stream("tracks/a.mp3", Ok(StreamUrl::new("")));
        let result = run_catalog_contract(&catalog, &expectations()).await;
        assert!(matches!(
            result,
            Err(CatalogContractError::EmptyStreamUrl { .. })
        ));
    }
}
