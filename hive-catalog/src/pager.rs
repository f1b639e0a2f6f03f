use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use hive_client::{ApiResult, ArcEventSource, RawPage};
use hive_core::{EventId, EventRecord};
use log::{debug, info, warn};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PageState {
    pub page_number: u32,
    pub has_more: bool,
    pub loading: bool,
    pub loading_more: bool,
    pub error: Option<String>,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            page_number: 1,
            has_more: false,
            loading: false,
            loading_more: false,
            error: None,
        }
    }
}

impl PageState {
    pub fn in_flight(&self) -> bool {
        self.loading || self.loading_more
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadKind {
    First,
    Next,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Number of records added to the backing sequence.
    Loaded(usize),
    Skipped,
    Failed,
    /// A reset happened while the fetch was outstanding; the response was dropped.
    Stale,
}

/// An accepted load request. Produced by `begin_*`, consumed by [`Pager::complete`].
#[derive(Debug)]
pub struct LoadTicket {
    kind: LoadKind,
    page: u32,
    limit: u32,
    generation: u64,
    cancellation_token: CancellationToken,
}

impl LoadTicket {
    pub fn kind(&self) -> LoadKind {
        self.kind
    }

    pub fn page(&self) -> u32 {
        self.page
    }
}

struct PagerInner {
    state: PageState,
    records: Arc<Vec<EventRecord>>,
    seen: HashSet<EventId>,
    generation: u64,
    cancellation_token: CancellationToken,
    last_failed: Option<(LoadKind, u32)>,
}

impl PagerInner {
    fn new() -> Self {
        Self {
            state: PageState::default(),
            records: Arc::new(Vec::new()),
            seen: HashSet::new(),
            generation: 0,
            cancellation_token: CancellationToken::new(),
            last_failed: None,
        }
    }

    fn next_generation(&mut self) {
        self.cancellation_token.cancel();
        self.cancellation_token = CancellationToken::new();
        self.generation += 1;
    }

    fn clear(&mut self) {
        self.records = Arc::new(Vec::new());
        self.seen.clear();
        self.state = PageState::default();
        self.last_failed = None;
    }

    /// Normalizes a page and drops ids that are already present.
    fn unseen(&mut self, page: &RawPage, page_number: u32) -> Vec<EventRecord> {
        let mut fresh = Vec::with_capacity(page.events.len());
        for (index, mut record) in page.records().into_iter().enumerate() {
            if record.id.is_empty() {
                record.id = format!("page-{}-{}", page_number, index);
            }
            if self.seen.insert(record.id.clone()) {
                fresh.push(record);
            } else {
                debug!("Skipping duplicate event {}", record.id);
            }
        }
        fresh
    }
}

/// Fetches pages from an [`ArcEventSource`] into an append-only backing
/// sequence. At most one fetch is in flight at a time.
#[derive(Clone)]
pub struct Pager {
    source: ArcEventSource,
    inner: Arc<Mutex<PagerInner>>,
}

impl Pager {
    pub fn new(source: ArcEventSource) -> Self {
        Self {
            source,
            inner: Arc::new(Mutex::new(PagerInner::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PagerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> PageState {
        self.lock().state.clone()
    }

    /// Immutable view of the backing sequence.
    pub fn records(&self) -> Arc<Vec<EventRecord>> {
        self.lock().records.clone()
    }

    /// State and records taken under one lock, so they always agree.
    pub fn snapshot(&self) -> (PageState, Arc<Vec<EventRecord>>) {
        let inner = self.lock();
        (inner.state.clone(), inner.records.clone())
    }

    /// Clears the backing sequence and starts loading page 1. Any fetch
    /// still in flight is cancelled.
    pub fn begin_first_page(&self, limit: u32) -> LoadTicket {
        let mut inner = self.lock();
        inner.next_generation();
        inner.clear();
        inner.state.loading = true;
        LoadTicket {
            kind: LoadKind::First,
            page: 1,
            limit,
            generation: inner.generation,
            cancellation_token: inner.cancellation_token.clone(),
        }
    }

    /// `None` when there is nothing more to load or a load is already running.
    pub fn begin_next_page(&self, limit: u32) -> Option<LoadTicket> {
        let mut inner = self.lock();
        if !inner.state.has_more || inner.state.in_flight() {
            return None;
        }
        inner.state.loading_more = true;
        inner.state.error = None;
        Some(LoadTicket {
            kind: LoadKind::Next,
            page: inner.state.page_number + 1,
            limit,
            generation: inner.generation,
            cancellation_token: inner.cancellation_token.clone(),
        })
    }

    /// Runs the fetch for `ticket`. `None` if it was cancelled by a reset.
    pub async fn fetch(&self, ticket: &LoadTicket) -> Option<ApiResult<RawPage>> {
        debug!("Fetching page {} (limit {})", ticket.page, ticket.limit);
        tokio::select! {
            result = self.source.fetch_page(ticket.page, ticket.limit) => Some(result),
            _ = ticket.cancellation_token.cancelled() => None,
        }
    }

    /// Commits a finished fetch. Results from an older generation are ignored.
    pub fn complete(&self, ticket: LoadTicket, result: Option<ApiResult<RawPage>>) -> LoadOutcome {
        let mut inner = self.lock();
        if inner.generation != ticket.generation {
            debug!("Dropping stale response for page {}", ticket.page);
            return LoadOutcome::Stale;
        }
        match ticket.kind {
            LoadKind::First => inner.state.loading = false,
            LoadKind::Next => inner.state.loading_more = false,
        }
        let Some(result) = result else {
            return LoadOutcome::Stale;
        };
        match result {
            Ok(page) => {
                let fresh = inner.unseen(&page, ticket.page);
                let added = fresh.len();
                match ticket.kind {
                    LoadKind::First => inner.records = Arc::new(fresh),
                    LoadKind::Next => Arc::make_mut(&mut inner.records).extend(fresh),
                }
                inner.state.page_number = ticket.page;
                inner.state.has_more = page.has_more();
                inner.state.error = None;
                inner.last_failed = None;
                info!(
                    "Loaded page {}: {} new events, {} total, has_more={}",
                    ticket.page,
                    added,
                    inner.records.len(),
                    inner.state.has_more
                );
                LoadOutcome::Loaded(added)
            }
            Err(e) => {
                warn!("Failed to load page {}: {}", ticket.page, e);
                inner.state.error = Some(e.to_string());
                if ticket.kind == LoadKind::First {
                    inner.state.has_more = false;
                }
                inner.last_failed = Some((ticket.kind, ticket.limit));
                LoadOutcome::Failed
            }
        }
    }

    pub async fn load_first_page(&self, limit: u32) -> LoadOutcome {
        let ticket = self.begin_first_page(limit);
        let result = self.fetch(&ticket).await;
        self.complete(ticket, result)
    }

    pub async fn load_next_page(&self, limit: u32) -> LoadOutcome {
        let Some(ticket) = self.begin_next_page(limit) else {
            return LoadOutcome::Skipped;
        };
        let result = self.fetch(&ticket).await;
        self.complete(ticket, result)
    }

    /// The load that should run on retry, if the last one failed.
    pub fn failed_load(&self) -> Option<(LoadKind, u32)> {
        self.lock().last_failed
    }

    /// Re-issues the last failed load. Loaded records are kept.
    pub async fn retry(&self) -> LoadOutcome {
        match self.failed_load() {
            Some((LoadKind::First, limit)) => self.load_first_page(limit).await,
            Some((LoadKind::Next, limit)) => self.load_next_page(limit).await,
            None => LoadOutcome::Skipped,
        }
    }

    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.next_generation();
        inner.clear();
        info!("Catalog reset (generation {})", inner.generation);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use hive_client::ApiError;

    use super::*;
    use crate::mock::{MockEventSource, page_of};

    fn pager(mock: &MockEventSource) -> Pager {
        Pager::new(Arc::new(Box::new(mock.clone())))
    }

    #[tokio::test]
    async fn test_two_pages_accumulate_in_order() {
        let mock = MockEventSource::default();
        mock.push_page(page_of("a", 9, true));
        mock.push_page(page_of("b", 9, false));
        let pager = pager(&mock);

        assert_eq!(pager.load_first_page(9).await, LoadOutcome::Loaded(9));
        assert_eq!(pager.load_next_page(9).await, LoadOutcome::Loaded(9));

        let records = pager.records();
        assert_eq!(records.len(), 18);
        assert_eq!(records[0].id, "a-0");
        assert_eq!(records[8].id, "a-8");
        assert_eq!(records[9].id, "b-0");
        assert_eq!(records[17].id, "b-8");
        assert_eq!(pager.state().page_number, 2);
        assert_eq!(mock.requests(), vec![(1, 9), (2, 9)]);
    }

    #[tokio::test]
    async fn test_short_last_page_stops_pagination() {
        let mock = MockEventSource::default();
        mock.push_page(page_of("a", 9, true));
        mock.push_page(page_of("b", 5, false));
        let pager = pager(&mock);

        pager.load_first_page(9).await;
        assert!(pager.state().has_more);
        pager.load_next_page(9).await;

        let state = pager.state();
        assert_eq!(pager.records().len(), 14);
        assert!(!state.has_more);
        assert_eq!(state.error, None);
        assert_eq!(pager.load_next_page(9).await, LoadOutcome::Skipped);
        assert_eq!(mock.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_pagination_means_no_more() {
        let mock = MockEventSource::default();
        mock.push_page(RawPage {
            events: vec![serde_json::json!({ "id": "x" })],
            pagination: None,
        });
        let pager = pager(&mock);
        pager.load_first_page(9).await;
        assert!(!pager.state().has_more);
        assert_eq!(pager.load_next_page(9).await, LoadOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_skipped() {
        let mock = MockEventSource::default();
        mock.push_page(page_of("a", 3, true));
        mock.push_page(page_of("a", 5, false));
        let pager = pager(&mock);

        pager.load_first_page(3).await;
        assert_eq!(pager.load_next_page(3).await, LoadOutcome::Loaded(2));
        let ids: Vec<String> = pager.records().iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["a-0", "a-1", "a-2", "a-3", "a-4"]);
    }

    #[tokio::test]
    async fn test_missing_ids_get_synthetic_ones() {
        let mock = MockEventSource::default();
        mock.push_page(RawPage {
            events: vec![serde_json::json!({}), serde_json::json!({ "title": "B" })],
            pagination: None,
        });
        let pager = pager(&mock);
        pager.load_first_page(9).await;
        let ids: Vec<String> = pager.records().iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["page-1-0", "page-1-1"]);
    }

    #[tokio::test]
    async fn test_next_page_while_in_flight_is_noop() {
        let mock = MockEventSource::default();
        mock.push_page(page_of("a", 9, true));
        mock.push_page(page_of("b", 9, true));
        let pager = pager(&mock);
        pager.load_first_page(9).await;

        let gate = mock.hold();
        let background = pager.clone();
        let handle = tokio::spawn(async move { background.load_next_page(9).await });
        mock.wait_for_requests(2).await;

        assert!(pager.state().loading_more);
        assert_eq!(pager.load_next_page(9).await, LoadOutcome::Skipped);
        assert_eq!(pager.records().len(), 9);

        gate.release();
        assert_eq!(handle.await.unwrap(), LoadOutcome::Loaded(9));
        assert_eq!(pager.records().len(), 18);
        assert_eq!(mock.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_first_page_failure_leaves_catalog_empty() {
        let mock = MockEventSource::default();
        mock.push_error(ApiError::Unauthorized);
        let pager = pager(&mock);

        assert_eq!(pager.load_first_page(9).await, LoadOutcome::Failed);
        let state = pager.state();
        assert!(pager.records().is_empty());
        assert!(!state.has_more);
        assert!(!state.loading);
        assert!(state.error.as_deref().is_some_and(|e| !e.is_empty()));
        assert_eq!(pager.failed_load(), Some((LoadKind::First, 9)));
    }

    #[tokio::test]
    async fn test_later_failure_keeps_records_and_retry_resumes() {
        let mock = MockEventSource::default();
        mock.push_page(page_of("a", 9, true));
        mock.push_error(ApiError::Server {
            status: 500,
            message: "Database error".to_string(),
        });
        mock.push_page(page_of("b", 4, false));
        let pager = pager(&mock);

        pager.load_first_page(9).await;
        assert_eq!(pager.load_next_page(9).await, LoadOutcome::Failed);
        let state = pager.state();
        assert_eq!(state.error.as_deref(), Some("Database error"));
        assert!(state.has_more);
        assert!(!state.loading_more);
        assert_eq!(state.page_number, 1);
        assert_eq!(pager.records().len(), 9);

        assert_eq!(pager.retry().await, LoadOutcome::Loaded(4));
        assert_eq!(pager.records().len(), 13);
        assert_eq!(pager.state().error, None);
        assert_eq!(mock.requests(), vec![(1, 9), (2, 9), (2, 9)]);
        assert_eq!(pager.retry().await, LoadOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_reset_drops_stale_response() {
        let mock = MockEventSource::default();
        mock.push_page(page_of("a", 9, true));
        mock.push_page(page_of("b", 9, false));
        let pager = pager(&mock);
        pager.load_first_page(9).await;

        let gate = mock.hold();
        let background = pager.clone();
        let handle = tokio::spawn(async move { background.load_next_page(9).await });
        mock.wait_for_requests(2).await;

        pager.reset();
        assert_eq!(handle.await.unwrap(), LoadOutcome::Stale);
        gate.release();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(pager.records().is_empty());
        assert_eq!(pager.state(), PageState::default());
    }

    #[tokio::test]
    async fn test_snapshot_flags_match_records() {
        let mock = MockEventSource::default();
        mock.push_page(page_of("a", 9, true));
        mock.push_page(page_of("b", 9, false));
        let pager = pager(&mock);
        pager.load_first_page(9).await;

        let ticket = pager.begin_next_page(9).unwrap();
        let result = pager.fetch(&ticket).await;
        let (state, records) = pager.snapshot();
        assert!(state.loading_more);
        assert_eq!(records.len(), 9);

        assert_eq!(pager.complete(ticket, result), LoadOutcome::Loaded(9));
        let (state, records) = pager.snapshot();
        assert!(!state.loading_more);
        assert!(!state.has_more);
        assert_eq!(state.page_number, 2);
        assert_eq!(records.len(), 18);
    }

    #[tokio::test]
    async fn test_later_first_page_load_wins() {
        let mock = MockEventSource::default();
        mock.push_page(page_of("b", 3, false));
        let pager = pager(&mock);

        let gate = mock.hold();
        let background = pager.clone();
        let first = tokio::spawn(async move { background.load_first_page(9).await });
        mock.wait_for_requests(1).await;

        let background = pager.clone();
        let second = tokio::spawn(async move { background.load_first_page(3).await });
        assert_eq!(first.await.unwrap(), LoadOutcome::Stale);

        mock.wait_for_requests(2).await;
        gate.release();
        assert_eq!(second.await.unwrap(), LoadOutcome::Loaded(3));

        let ids: Vec<String> = pager.records().iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["b-0", "b-1", "b-2"]);
        let state = pager.state();
        assert!(!state.loading);
        assert_eq!(state.error, None);
        assert_eq!(mock.requests(), vec![(1, 9), (1, 3)]);
    }

    #[tokio::test]
    async fn test_snapshots_are_not_mutated() {
        let mock = MockEventSource::default();
        mock.push_page(page_of("a", 2, true));
        mock.push_page(page_of("b", 2, false));
        let pager = pager(&mock);

        pager.load_first_page(2).await;
        let before = pager.records();
        pager.load_next_page(2).await;
        assert_eq!(before.len(), 2);
        assert_eq!(pager.records().len(), 4);
    }
}
