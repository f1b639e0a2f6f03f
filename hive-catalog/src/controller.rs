use std::sync::{Arc, Mutex, PoisonError};

use hive_client::ArcEventSource;
use hive_core::{EventRecord, FilterCriteria};
use log::debug;
use serde::Serialize;
use tokio::sync::watch;

use crate::pager::{LoadKind, LoadOutcome, LoadTicket, Pager};

/// What a browsing page renders.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CatalogState {
    pub records: Vec<EventRecord>,
    pub has_more: bool,
    pub loading: bool,
    pub loading_more: bool,
    pub error: Option<String>,
}

/// Pager plus filter criteria. `records` in every published state is the
/// current criteria applied to the full backing sequence.
#[derive(Clone)]
pub struct CatalogController {
    pager: Pager,
    criteria: Arc<Mutex<FilterCriteria>>,
    page_limit: u32,
    state_tx: Arc<watch::Sender<CatalogState>>,
}

impl CatalogController {
    pub fn new(source: ArcEventSource, page_limit: u32) -> Self {
        Self {
            pager: Pager::new(source),
            criteria: Arc::new(Mutex::new(FilterCriteria::default())),
            page_limit: page_limit.max(1),
            state_tx: Arc::new(watch::Sender::new(CatalogState::default())),
        }
    }

    pub fn page_limit(&self) -> u32 {
        self.page_limit
    }

    pub fn criteria(&self) -> FilterCriteria {
        self.criteria
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Size of the backing sequence, before filtering.
    pub fn total_loaded(&self) -> usize {
        self.pager.records().len()
    }

    pub fn state(&self) -> CatalogState {
        let (page, loaded) = self.pager.snapshot();
        let records = self.criteria().apply(&loaded);
        CatalogState {
            records,
            has_more: page.has_more,
            loading: page.loading,
            loading_more: page.loading_more,
            error: page.error,
        }
    }

    /// Receives a fresh state after every change, including load start.
    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.state_tx.subscribe()
    }

    fn publish(&self) -> CatalogState {
        let state = self.state();
        self.state_tx.send_replace(state.clone());
        state
    }

    async fn run(&self, ticket: LoadTicket) -> LoadOutcome {
        self.publish();
        let result = self.pager.fetch(&ticket).await;
        let outcome = self.pager.complete(ticket, result);
        if outcome != LoadOutcome::Stale {
            self.publish();
        }
        outcome
    }

    async fn load_first(&self, limit: u32) -> LoadOutcome {
        let ticket = self.pager.begin_first_page(limit);
        self.run(ticket).await
    }

    async fn load_next(&self, limit: u32) -> LoadOutcome {
        let Some(ticket) = self.pager.begin_next_page(limit) else {
            debug!("load_more ignored: nothing to load or load in flight");
            return LoadOutcome::Skipped;
        };
        self.run(ticket).await
    }

    pub async fn initialize(&self) -> LoadOutcome {
        self.load_first(self.page_limit).await
    }

    pub async fn load_more(&self) -> LoadOutcome {
        self.load_next(self.page_limit).await
    }

    pub async fn retry(&self) -> LoadOutcome {
        match self.pager.failed_load() {
            Some((LoadKind::First, limit)) => self.load_first(limit).await,
            Some((LoadKind::Next, limit)) => self.load_next(limit).await,
            None => LoadOutcome::Skipped,
        }
    }

    /// Merges `partial` into the current criteria and re-filters what is
    /// already loaded. Never triggers a fetch.
    pub fn set_filter(&self, partial: FilterCriteria) -> CatalogState {
        self.criteria
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .merge(partial);
        self.publish()
    }

    pub fn clear_filter(&self) -> CatalogState {
        *self.criteria.lock().unwrap_or_else(PoisonError::into_inner) = FilterCriteria::default();
        self.publish()
    }

    /// Drops everything loaded, cancels any in-flight fetch and clears the criteria.
    pub fn reset(&self) -> CatalogState {
        self.pager.reset();
        *self.criteria.lock().unwrap_or_else(PoisonError::into_inner) = FilterCriteria::default();
        self.publish()
    }
}
