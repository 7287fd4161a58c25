use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use musify_core::{
    BrowseConfig, CatalogError, CatalogPage, CatalogResult, CatalogService, ContinuationToken,
    ListRequest, Track, UploadResetPolicy,
};
use tokio::task::JoinHandle;

use crate::merge::{append_page, replace_page};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserSettings {
    pub page_size: u32,
    pub debounce: Duration,
    pub upload_reset: UploadResetPolicy,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self::from(&BrowseConfig::default())
    }
}

impl From<&BrowseConfig> for BrowserSettings {
    fn from(config: &BrowseConfig) -> Self {
        Self {
            page_size: config.page_size,
            debounce: config.debounce(),
            upload_reset: config.upload_reset,
        }
    }
}

/// What the shell renders. Keys in `visible_tracks` are unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseState {
    pub visible_tracks: Vec<Track>,
    pub query: String,
    pub continuation_token: Option<ContinuationToken>,
    pub has_more: bool,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

impl Default for BrowseState {
    fn default() -> Self {
        Self {
            visible_tracks: Vec::new(),
            query: String::new(),
            continuation_token: None,
            has_more: true,
            is_loading: false,
            last_error: None,
        }
    }
}

/// Result of one fetch attempt, for callers that want to react to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page was merged; `added` items became visible.
    Applied { added: usize },
    /// A reset happened while the request was in flight.
    Discarded,
    /// `load_more` had nothing to do.
    Skipped,
    Failed(CatalogError),
}

#[derive(Debug, Default)]
struct Session {
    state: BrowseState,
    /// Bumped by every query change and reset; responses carrying an older
    /// value are dropped.
    generation: u64,
    next_request: u64,
    in_flight: Option<u64>,
    /// A debounced reset is scheduled but has not fired yet.
    reset_pending: bool,
    /// Identifies the newest debounce timer; older timers that already woke
    /// up must not reset.
    timer_serial: u64,
}

struct Ticket {
    id: u64,
    generation: u64,
    replace: bool,
    request: ListRequest,
}

struct Shared {
    catalog: Arc<dyn CatalogService>,
    settings: BrowserSettings,
    session: Mutex<Session>,
    pending_timer: Mutex<Option<JoinHandle<()>>>,
}

impl Shared {
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace_timer(&self, timer: Option<JoinHandle<()>>) {
        let mut pending = self
            .pending_timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(old) = std::mem::replace(&mut *pending, timer) {
            old.abort();
        }
    }

    fn begin(&self, session: &mut Session, token: Option<ContinuationToken>, query: &str) -> Ticket {
        session.next_request += 1;
        session.in_flight = Some(session.next_request);
        session.state.is_loading = true;
        let ticket = Ticket {
            id: session.next_request,
            generation: session.generation,
            replace: token.is_none(),
            request: ListRequest::first_page(self.settings.page_size)
                .with_search(query)
                .with_next(token),
        };
        tracing::debug!(
            request = ticket.id,
            generation = ticket.generation,
            query,
            continuation = !ticket.replace,
            "requesting catalog page"
        );
        ticket
    }

    /// Clears list and cursor, then claims the in-flight slot for page one.
    fn begin_reset(&self, query_override: Option<String>) -> Ticket {
        let mut session = self.session();
        self.reset_locked(&mut session, query_override)
    }

    /// The reset a debounce timer performs when it fires. `None` when a newer
    /// timer, a refresh or an external mutation has taken over.
    fn begin_scheduled_reset(&self, serial: u64) -> Option<Ticket> {
        let mut session = self.session();
        if !session.reset_pending || session.timer_serial != serial {
            return None;
        }
        Some(self.reset_locked(&mut session, None))
    }

    fn reset_locked(&self, session: &mut Session, query_override: Option<String>) -> Ticket {
        if let Some(query) = query_override {
            session.state.query = query;
        }
        session.generation += 1;
        session.reset_pending = false;
        session.state.visible_tracks.clear();
        session.state.continuation_token = None;
        session.state.has_more = true;
        session.state.last_error = None;
        let query = session.state.query.clone();
        self.begin(session, None, &query)
    }

    fn complete(&self, ticket: Ticket, result: CatalogResult<CatalogPage>) -> FetchOutcome {
        let mut session = self.session();
        if session.in_flight == Some(ticket.id) {
            session.in_flight = None;
            session.state.is_loading = false;
        }
        if session.generation != ticket.generation {
            tracing::debug!(request = ticket.id, "discarding page for superseded query");
            return FetchOutcome::Discarded;
        }

        let state = &mut session.state;
        match result {
            Ok(page) => {
                let before = if ticket.replace {
                    0
                } else {
                    state.visible_tracks.len()
                };
                let existing = std::mem::take(&mut state.visible_tracks);
                state.visible_tracks = if ticket.replace {
                    replace_page(page.items)
                } else {
                    append_page(existing, page.items)
                };
                state.has_more = page.next.is_some();
                state.continuation_token = page.next;
                state.last_error = None;
                let added = state.visible_tracks.len() - before;
                tracing::debug!(request = ticket.id, added, has_more = state.has_more, "page merged");
                FetchOutcome::Applied { added }
            }
            Err(err) => {
                tracing::warn!(
                    request = ticket.id,
                    query = ticket.request.search.as_deref().unwrap_or(""),
                    error = %err,
                    "catalog listing failed"
                );
                state.last_error = Some(err.to_string());
                FetchOutcome::Failed(err)
            }
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let pending = self
            .pending_timer
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = pending.take() {
            timer.abort();
        }
    }
}

/// Runs the request without keeping the browser alive; if the browser is
/// dropped meanwhile, the response is thrown away.
async fn execute(shared: Weak<Shared>, ticket: Ticket) -> FetchOutcome {
    let Some(catalog) = shared.upgrade().map(|s| Arc::clone(&s.catalog)) else {
        return FetchOutcome::Discarded;
    };
    let result = catalog.list_tracks(ticket.request.clone()).await;
    match shared.upgrade() {
        Some(shared) => shared.complete(ticket, result),
        None => FetchOutcome::Discarded,
    }
}

/// Deduplicated, paginated, searchable view over the catalog listing.
///
/// Cloning yields another handle to the same browser. All methods must be
/// called from within a Tokio runtime.
#[derive(Clone)]
pub struct CatalogBrowser {
    shared: Arc<Shared>,
}

impl CatalogBrowser {
    pub fn new(catalog: Arc<dyn CatalogService>, settings: BrowserSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                catalog,
                settings,
                session: Mutex::new(Session::default()),
                pending_timer: Mutex::new(None),
            }),
        }
    }

    pub fn settings(&self) -> BrowserSettings {
        self.shared.settings
    }

    pub fn snapshot(&self) -> BrowseState {
        self.shared.session().state.clone()
    }

    pub fn query(&self) -> String {
        self.shared.session().state.query.clone()
    }

    /// Updates the query and (re)schedules the debounced reset-and-refetch.
    ///
    /// Responses still in flight for the previous query are discarded from
    /// this point on.
    pub fn set_query(&self, text: impl Into<String>) {
        let mut session = self.shared.session();
        session.state.query = text.into();
        session.generation += 1;
        session.in_flight = None;
        session.state.is_loading = false;
        session.reset_pending = true;
        session.timer_serial += 1;
        let serial = session.timer_serial;

        let weak = Arc::downgrade(&self.shared);
        let debounce = self.shared.settings.debounce;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let Some(ticket) = shared.begin_scheduled_reset(serial) else {
                tracing::debug!(serial, "debounce timer superseded");
                return;
            };
            drop(shared);
            // Detached so that replacing this timer never cancels the fetch.
            tokio::spawn(execute(weak, ticket));
        });
        // Swapped under the session lock: the stored handle always belongs
        // to the newest serial.
        self.shared.replace_timer(Some(timer));
        drop(session);
    }

    /// Fetches one page for `query`. `None` replaces the list and makes
    /// `query` the current query, so later `load_more` calls pair its cursor
    /// with it; a token appends to the list.
    pub async fn fetch_page(
        &self,
        token: Option<ContinuationToken>,
        query: &str,
    ) -> FetchOutcome {
        let ticket = {
            let mut session = self.shared.session();
            if token.is_none() {
                session.state.query = query.to_string();
            }
            self.shared.begin(&mut session, token, query)
        };
        execute(Arc::downgrade(&self.shared), ticket).await
    }

    /// Fetches the next page. No-op without a continuation token, while a
    /// fetch is in flight, or while a debounced reset is pending.
    pub async fn load_more(&self) -> FetchOutcome {
        let ticket = {
            let mut session = self.shared.session();
            if session.state.is_loading || session.reset_pending {
                return FetchOutcome::Skipped;
            }
            let Some(token) = session.state.continuation_token.clone() else {
                return FetchOutcome::Skipped;
            };
            let query = session.state.query.clone();
            self.shared.begin(&mut session, Some(token), &query)
        };
        execute(Arc::downgrade(&self.shared), ticket).await
    }

    /// Immediate reset-and-fetch of the current query.
    pub async fn refresh(&self) -> FetchOutcome {
        self.shared.replace_timer(None);
        let ticket = self.shared.begin_reset(None);
        execute(Arc::downgrade(&self.shared), ticket).await
    }

    /// Called after the catalog changed elsewhere (an upload succeeded).
    /// Resets like a query change, without debounce; the query itself is
    /// cleared or kept per [`UploadResetPolicy`].
    pub async fn notify_external_mutation(&self) -> FetchOutcome {
        self.shared.replace_timer(None);
        let query_override = match self.shared.settings.upload_reset {
            UploadResetPolicy::ClearQuery => Some(String::new()),
            UploadResetPolicy::KeepQuery => None,
        };
        let ticket = self.shared.begin_reset(query_override);
        execute(Arc::downgrade(&self.shared), ticket).await
    }
}

impl std::fmt::Debug for CatalogBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogBrowser")
            .field("settings", &self.shared.settings)
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use musify_core::testing::ScriptedCatalog;
    use std::collections::HashSet;

    fn track(key: &str) -> Track {
        Track::new(key, format!("Song {key}"), "Artist", 180)
    }

    fn keys(state: &BrowseState) -> Vec<String> {
        state
            .visible_tracks
            .iter()
            .map(|t| t.key.0.clone())
            .collect()
    }

    fn browser(catalog: &Arc<ScriptedCatalog>) -> CatalogBrowser {
        browser_with(catalog, UploadResetPolicy::ClearQuery)
    }

    fn browser_with(catalog: &Arc<ScriptedCatalog>, policy: UploadResetPolicy) -> CatalogBrowser {
        let catalog: Arc<dyn CatalogService> = catalog.clone();
        CatalogBrowser::new(
            catalog,
            BrowserSettings {
                page_size: 20,
                debounce: Duration::from_millis(500),
                upload_reset: policy,
            },
        )
    }

    async fn settle() {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn overlapping_pages_are_merged_once() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.push_page(CatalogPage::with_next(vec![track("A"), track("B")], "t1"));
        catalog.push_page(CatalogPage::single_page(vec![track("B"), track("C")]));
        let browser = browser(&catalog);

        assert_eq!(browser.refresh().await, FetchOutcome::Applied { added: 2 });
        assert!(browser.snapshot().has_more);
        assert_eq!(browser.load_more().await, FetchOutcome::Applied { added: 1 });

        let state = browser.snapshot();
        assert_eq!(keys(&state), ["A", "B", "C"]);
        assert!(!state.has_more);
        assert!(!state.is_loading);
        assert_eq!(state.continuation_token, None);

        let calls = catalog.list_calls();
        assert_eq!(calls[0].limit, 20);
        assert_eq!(calls[0].next, None);
        assert_eq!(calls[1].next, Some(ContinuationToken::new("t1")));
    }

    #[tokio::test]
    async fn load_more_without_token_is_a_no_op() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.push_page(CatalogPage::single_page(vec![track("A")]));
        let browser = browser(&catalog);
        browser.refresh().await;

        assert_eq!(browser.load_more().await, FetchOutcome::Skipped);
        assert_eq!(catalog.list_calls().len(), 1);
    }

    #[tokio::test]
    async fn rapid_load_more_issues_one_request() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.push_page(CatalogPage::with_next(vec![track("A"), track("B")], "t1"));
        let browser = browser(&catalog);
        browser.refresh().await;

        let reply = catalog.defer_page();
        let (first, second, ()) = tokio::join!(browser.load_more(), browser.load_more(), async {
            assert!(catalog.wait_for_list_calls(2).await);
            reply
                .send(Ok(CatalogPage::single_page(vec![track("C")])))
                .ok();
        });

        assert_eq!(first, FetchOutcome::Applied { added: 1 });
        assert_eq!(second, FetchOutcome::Skipped);
        assert_eq!(catalog.list_calls().len(), 2);
        assert_eq!(keys(&browser.snapshot()), ["A", "B", "C"]);
    }

    #[tokio::test(start_paused = true)]
    async fn query_changes_inside_debounce_window_fetch_once() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.push_page(CatalogPage::single_page(vec![track("ABBA-1")]));
        let browser = browser(&catalog);

        browser.set_query("ab");
        tokio::time::sleep(Duration::from_millis(200)).await;
        browser.set_query("abba");
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(catalog.list_calls().is_empty());

        tokio::time::sleep(Duration::from_millis(400)).await;
        settle().await;

        let calls = catalog.list_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].search.as_deref(), Some("abba"));
        assert_eq!(calls[0].next, None);
        assert_eq!(keys(&browser.snapshot()), ["ABBA-1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn query_reset_clears_list_before_fetching() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.push_page(CatalogPage::with_next(vec![track("A")], "t1"));
        let browser = browser(&catalog);
        browser.refresh().await;

        let reply = catalog.defer_page();
        browser.set_query("jazz");
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(catalog.wait_for_list_calls(2).await);

        let state = browser.snapshot();
        assert!(state.visible_tracks.is_empty());
        assert_eq!(state.continuation_token, None);
        assert!(state.has_more);
        assert!(state.is_loading);

        reply
            .send(Ok(CatalogPage::single_page(vec![track("J")])))
            .ok();
        settle().await;
        assert_eq!(keys(&browser.snapshot()), ["J"]);
        assert!(!browser.snapshot().is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_response_is_discarded() {
        let catalog = Arc::new(ScriptedCatalog::new());
        let stale = catalog.defer_page();
        let browser = browser(&catalog);

        let (outcome, ()) = tokio::join!(browser.refresh(), async {
            assert!(catalog.wait_for_list_calls(1).await);
            browser.set_query("jazz");
            stale
                .send(Ok(CatalogPage::with_next(vec![track("OLD")], "old-token")))
                .ok();
        });
        assert_eq!(outcome, FetchOutcome::Discarded);
        assert!(browser.snapshot().visible_tracks.is_empty());
        assert_eq!(browser.snapshot().continuation_token, None);

        catalog.push_page(CatalogPage::single_page(vec![track("J1")]));
        tokio::time::sleep(Duration::from_millis(600)).await;
        settle().await;

        let state = browser.snapshot();
        assert_eq!(keys(&state), ["J1"]);
        assert_eq!(state.query, "jazz");
        assert_eq!(catalog.list_calls()[1].search.as_deref(), Some("jazz"));
    }

    #[tokio::test(start_paused = true)]
    async fn late_response_does_not_clear_newer_loading_flag() {
        let catalog = Arc::new(ScriptedCatalog::new());
        let stale = catalog.defer_page();
        let fresh = catalog.defer_page();
        let browser = browser(&catalog);

        let handle = {
            let browser = browser.clone();
            tokio::spawn(async move { browser.refresh().await })
        };
        assert!(catalog.wait_for_list_calls(1).await);
        browser.set_query("new");
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(catalog.wait_for_list_calls(2).await);

        stale
            .send(Ok(CatalogPage::single_page(vec![track("OLD")])))
            .ok();
        assert_eq!(handle.await.expect("join"), FetchOutcome::Discarded);
        assert!(browser.snapshot().is_loading);

        fresh
            .send(Ok(CatalogPage::single_page(vec![track("NEW")])))
            .ok();
        settle().await;
        let state = browser.snapshot();
        assert!(!state.is_loading);
        assert_eq!(keys(&state), ["NEW"]);
    }

    #[tokio::test]
    async fn failure_preserves_visible_tracks() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.push_page(CatalogPage::with_next(vec![track("A")], "t1"));
        catalog.push_list_error(CatalogError::network("connection reset"));
        let browser = browser(&catalog);
        browser.refresh().await;

        let outcome = browser.load_more().await;
        assert_eq!(
            outcome,
            FetchOutcome::Failed(CatalogError::network("connection reset"))
        );
        let state = browser.snapshot();
        assert_eq!(keys(&state), ["A"]);
        assert!(!state.is_loading);
        assert_eq!(state.continuation_token, Some(ContinuationToken::new("t1")));
        assert_eq!(
            state.last_error.as_deref(),
            Some("network error: connection reset")
        );
    }

    #[tokio::test]
    async fn decode_failure_on_first_page_leaves_empty_list() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.push_list_error(CatalogError::decode("expected `items`"));
        let browser = browser(&catalog);

        assert!(matches!(browser.refresh().await, FetchOutcome::Failed(_)));
        let state = browser.snapshot();
        assert!(state.visible_tracks.is_empty());
        assert!(!state.is_loading);
        assert!(state.last_error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn load_more_waits_for_pending_reset() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.push_page(CatalogPage::with_next(vec![track("A")], "t1"));
        let browser = browser(&catalog);
        browser.refresh().await;

        browser.set_query("rock");
        assert_eq!(browser.load_more().await, FetchOutcome::Skipped);
        assert_eq!(catalog.list_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn external_mutation_clears_query_and_pending_timer() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.push_page(CatalogPage::single_page(vec![track("A"), track("NEW")]));
        let browser = browser(&catalog);

        browser.set_query("rock");
        let outcome = browser.notify_external_mutation().await;
        assert_eq!(outcome, FetchOutcome::Applied { added: 2 });
        assert_eq!(browser.query(), "");

        tokio::time::sleep(Duration::from_secs(1)).await;
        settle().await;
        let calls = catalog.list_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].search, None);
    }

    #[tokio::test]
    async fn explicit_fetch_page_appends_for_given_query() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.push_page(CatalogPage::with_next(vec![track("A")], "t1"));
        catalog.push_page(CatalogPage::single_page(vec![track("A"), track("B")]));
        let browser = browser(&catalog);

        browser.fetch_page(None, "pop").await;
        let outcome = browser
            .fetch_page(Some(ContinuationToken::new("t1")), "pop")
            .await;
        assert_eq!(outcome, FetchOutcome::Applied { added: 1 });

        let calls = catalog.list_calls();
        assert_eq!(calls[1].search.as_deref(), Some("pop"));
        assert_eq!(calls[1].next, Some(ContinuationToken::new("t1")));
        assert_eq!(keys(&browser.snapshot()), ["A", "B"]);
    }

    #[tokio::test]
    async fn external_mutation_can_keep_query() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.push_page(CatalogPage::single_page(vec![track("R")]));
        catalog.push_page(CatalogPage::single_page(vec![track("R"), track("R2")]));
        let browser = browser_with(&catalog, UploadResetPolicy::KeepQuery);
        browser.set_query("rock");
        browser.refresh().await;

        browser.notify_external_mutation().await;
        assert_eq!(browser.query(), "rock");
        let calls = catalog.list_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].search.as_deref(), Some("rock"));
        assert_eq!(keys(&browser.snapshot()), ["R", "R2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_browser_cancels_pending_timer() {
        let catalog = Arc::new(ScriptedCatalog::new());
        let browser = browser(&catalog);
        browser.set_query("gone");
        drop(browser);

        tokio::time::sleep(Duration::from_secs(1)).await;
        settle().await;
        assert!(catalog.list_calls().is_empty());
    }

    #[tokio::test]
    async fn visible_keys_stay_unique_across_fetches() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.push_page(CatalogPage::with_next(
            vec![track("A"), track("B"), track("A")],
            "t1",
        ));
        catalog.push_page(CatalogPage::with_next(vec![track("B"), track("C")], "t2"));
        catalog.push_page(CatalogPage::with_next(vec![track("C"), track("A")], "t3"));
        catalog.push_page(CatalogPage::single_page(vec![track("D"), track("D")]));
        let browser = browser(&catalog);

        browser.refresh().await;
        while browser.snapshot().has_more {
            browser.load_more().await;
        }

        let state = browser.snapshot();
        let unique: HashSet<_> = state.visible_tracks.iter().map(|t| &t.key).collect();
        assert_eq!(unique.len(), state.visible_tracks.len());
        assert_eq!(keys(&state), ["A", "B", "C", "D"]);
    }

    #[tokio::test]
    async fn fetch_page_query_carries_into_load_more() {
        let catalog = Arc::new(ScriptedCatalog::new());
        catalog.push_page(CatalogPage::with_next(vec![track("P")], "t1"));
        catalog.push_page(CatalogPage::single_page(vec![track("P2")]));
        let browser = browser(&catalog);

        browser.fetch_page(None, "pop").await;
        assert_eq!(browser.query(), "pop");
        assert_eq!(browser.load_more().await, FetchOutcome::Applied { added: 1 });

        let calls = catalog.list_calls();
        assert_eq!(calls[1].search.as_deref(), Some("pop"));
        assert_eq!(calls[1].next, Some(ContinuationToken::new("t1")));
    }

    #[tokio::test(start_paused = true)]
    async fn woken_timer_for_older_query_does_not_reset() {
        let catalog = Arc::new(ScriptedCatalog::new());
        let browser = browser(&catalog);
        browser.set_query("a");
        let older = browser.shared.session().timer_serial;
        browser.set_query("b");
        let newest = browser.shared.session().timer_serial;

        // A timer that already passed its sleep when "b" arrived.
        assert!(browser.shared.begin_scheduled_reset(older).is_none());
        assert!(browser.snapshot().visible_tracks.is_empty());
        assert!(browser.shared.session().reset_pending);

        tokio::time::sleep(Duration::from_secs(1)).await;
        settle().await;
        let calls = catalog.list_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].search.as_deref(), Some("b"));
        assert!(browser.shared.begin_scheduled_reset(newest).is_none());
    }

    #[tokio::test]
    async fn refresh_disarms_a_woken_timer() {
        let catalog = Arc::new(ScriptedCatalog::new());
        let browser = browser(&catalog);
        browser.set_query("a");
        let serial = browser.shared.session().timer_serial;

        browser.refresh().await;
        assert!(browser.shared.begin_scheduled_reset(serial).is_none());
        assert_eq!(catalog.list_calls().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn query_burst_on_worker_threads_fetches_newest_once() {
        for round in 0..40 {
            let catalog = Arc::new(ScriptedCatalog::new());
            let service: Arc<dyn CatalogService> = catalog.clone();
            let browser = CatalogBrowser::new(
                service,
                BrowserSettings {
                    debounce: Duration::from_millis(2),
                    ..BrowserSettings::default()
                },
            );

            browser.set_query("a");
            // Lets the first timer wake on a worker around the time "b" arrives.
            std::thread::sleep(Duration::from_millis(2));
            browser.set_query("b");

            let count_b = || {
                catalog
                    .list_calls()
                    .iter()
                    .filter(|c| c.search.as_deref() == Some("b"))
                    .count()
            };
            for _ in 0..200 {
                if count_b() > 0 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert_eq!(count_b(), 1, "round {round}");
        }
    }
}
