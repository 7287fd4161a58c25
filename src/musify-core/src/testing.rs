//! Scripted [`CatalogService`] double for controller and shell tests.
//!
//! Replies are queued up front. A reply can be ready immediately or deferred
//! behind a oneshot channel, which lets a test decide exactly when (and in
//! which order) in-flight requests resolve.

use crate::catalog::{CatalogError, CatalogResult, CatalogService, ListRequest};
use crate::models::{CatalogPage, StreamUrl, TrackKey};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

enum Reply<T> {
    Ready(CatalogResult<T>),
    Deferred(oneshot::Receiver<CatalogResult<T>>),
}

impl<T> Reply<T> {
    async fn resolve(self) -> CatalogResult<T> {
        match self {
            Reply::Ready(result) => result,
            Reply::Deferred(rx) => rx.await.unwrap_or_else(|_| {
                Err(CatalogError::Other {
                    message: "scripted reply dropped".into(),
                })
            }),
        }
    }
}

/// Unscripted listings answer with an empty final page; unscripted stream
/// lookups answer `https://stream.test/<key>`.
#[derive(Default)]
pub struct ScriptedCatalog {
    list_replies: Mutex<VecDeque<Reply<CatalogPage>>>,
    stream_replies: Mutex<HashMap<TrackKey, VecDeque<Reply<StreamUrl>>>>,
    list_calls: Mutex<Vec<ListRequest>>,
    stream_calls: Mutex<Vec<TrackKey>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&self, page: CatalogPage) {
        lock(&self.list_replies).push_back(Reply::Ready(Ok(page)));
    }

    pub fn push_list_error(&self, error: CatalogError) {
        lock(&self.list_replies).push_back(Reply::Ready(Err(error)));
    }

    /// Queues a listing reply the test completes later through the sender.
    pub fn defer_page(&self) -> oneshot::Sender<CatalogResult<CatalogPage>> {
        let (tx, rx) = oneshot::channel();
        lock(&self.list_replies).push_back(Reply::Deferred(rx));
        tx
    }

    pub fn push_stream(&self, key: impl Into<TrackKey>, result: CatalogResult<StreamUrl>) {
        lock(&self.stream_replies)
            .entry(key.into())
            .or_default()
            .push_back(Reply::Ready(result));
    }

    pub fn defer_stream(
        &self,
        key: impl Into<TrackKey>,
    ) -> oneshot::Sender<CatalogResult<StreamUrl>> {
        let (tx, rx) = oneshot::channel();
        lock(&self.stream_replies)
            .entry(key.into())
            .or_default()
            .push_back(Reply::Deferred(rx));
        tx
    }

    pub fn list_calls(&self) -> Vec<ListRequest> {
        lock(&self.list_calls).clone()
    }

    pub fn stream_calls(&self) -> Vec<TrackKey> {
        lock(&self.stream_calls).clone()
    }

    /// Yields to the scheduler until `count` listing calls were observed.
    /// Never advances (paused) time.
    pub async fn wait_for_list_calls(&self, count: usize) -> bool {
        for _ in 0..10_000 {
            if lock(&self.list_calls).len() >= count {
                return true;
            }
            tokio::task::yield_now().await;
        }
        false
    }

    pub async fn wait_for_stream_calls(&self, count: usize) -> bool {
        for _ in 0..10_000 {
            if lock(&self.stream_calls).len() >= count {
                return true;
            }
            tokio::task::yield_now().await;
        }
        false
    }
}

#[async_trait::async_trait]
impl CatalogService for ScriptedCatalog {
    async fn list_tracks(&self, request: ListRequest) -> CatalogResult<CatalogPage> {
        lock(&self.list_calls).push(request);
        let reply = lock(&self.list_replies).pop_front();
        match reply {
            Some(reply) => reply.resolve().await,
            None => Ok(CatalogPage::default()),
        }
    }

    async fn resolve_stream_url(&self, key: &TrackKey) -> CatalogResult<StreamUrl> {
        lock(&self.stream_calls).push(key.clone());
        let reply = lock(&self.stream_replies)
            .get_mut(key)
            .and_then(VecDeque::pop_front);
        match reply {
            Some(reply) => reply.resolve().await,
            None => Ok(StreamUrl::new(format!("https://stream.test/{key}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Track;

    #[tokio::test]
    async fn replies_are_served_in_order() {
        let catalog = ScriptedCatalog::new();
        catalog.push_page(CatalogPage::with_next(
            vec![Track::new("a", "A", "Artist", 10)],
            "t1",
        ));
        catalog.push_list_error(CatalogError::network("down"));

        let first = catalog
            .list_tracks(ListRequest::first_page(20))
            .await
            .expect("first page");
        assert_eq!(first.items.len(), 1);
        let second = catalog.list_tracks(ListRequest::first_page(20)).await;
        assert_eq!(second, Err(CatalogError::network("down")));
        let third = catalog
            .list_tracks(ListRequest::first_page(20))
            .await
            .expect("default page");
        assert!(third.items.is_empty());
        assert_eq!(catalog.list_calls().len(), 3);
    }

    #[tokio::test]
    async fn deferred_reply_waits_for_sender() {
        let catalog = ScriptedCatalog::new();
        let tx = catalog.defer_stream("k");
        let key = TrackKey::new("k");
        let (result, ()) = tokio::join!(catalog.resolve_stream_url(&key), async {
            assert!(catalog.wait_for_stream_calls(1).await);
            tx.send(Ok(StreamUrl::new("https://signed/k"))).ok();
        });
        assert_eq!(result, Ok(StreamUrl::new("https://signed/k")));
    }
}
