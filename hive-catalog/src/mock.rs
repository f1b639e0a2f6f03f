use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use hive_client::{ApiError, ApiResult, EventSource, Pagination, RawPage};
use serde_json::json;
use tokio::sync::watch;

/// Scripted [`EventSource`]: answers fetches from a queue and records them.
#[derive(Clone)]
pub struct MockEventSource {
    responses: Arc<Mutex<VecDeque<ApiResult<RawPage>>>>,
    requests: Arc<Mutex<Vec<(u32, u32)>>>,
    request_count: Arc<watch::Sender<usize>>,
    gate: Arc<Mutex<Option<watch::Receiver<bool>>>>,
}

impl Default for MockEventSource {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            request_count: Arc::new(watch::Sender::new(0)),
            gate: Arc::new(Mutex::new(None)),
        }
    }
}

/// Keeps fetches of a [`MockEventSource`] pending until released.
pub struct MockGate {
    open: watch::Sender<bool>,
}

impl MockGate {
    pub fn release(&self) {
        let _ = self.open.send(true);
    }
}

#[allow(unused)]
impl MockEventSource {
    pub fn push_page(&self, page: RawPage) {
        self.responses.lock().unwrap().push_back(Ok(page));
    }

    pub fn push_error(&self, error: ApiError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<(u32, u32)> {
        self.requests.lock().unwrap().clone()
    }

    /// Fetches started after this call block until the gate is released.
    pub fn hold(&self) -> MockGate {
        let (open, rx) = watch::channel(false);
        *self.gate.lock().unwrap() = Some(rx);
        MockGate { open }
    }

    pub async fn wait_for_requests(&self, count: usize) {
        let mut rx = self.request_count.subscribe();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|n| *n >= count))
            .await
            .expect("Timed out waiting for requests")
            .expect("Request counter closed");
    }
}

#[async_trait::async_trait]
impl EventSource for MockEventSource {
    async fn fetch_page(&self, page: u32, limit: u32) -> ApiResult<RawPage> {
        let gate = self.gate.lock().unwrap().clone();
        let count = {
            let mut requests = self.requests.lock().unwrap();
            requests.push((page, limit));
            requests.len()
        };
        self.request_count.send_replace(count);
        if let Some(mut gate) = gate {
            let _ = gate.wait_for(|open| *open).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(RawPage::default()))
    }
}

/// `count` events with ids `<prefix>-<i>`. Even ones are FREE and online,
/// odd ones PAID and in Lucknow.
pub fn page_of(prefix: &str, count: usize, has_more: bool) -> RawPage {
    let events = (0..count)
        .map(|i| {
            let free = i % 2 == 0;
            json!({
                "id": format!("{}-{}", prefix, i),
                "title": format!("Event {}-{}", prefix, i),
                "type": if free { "FREE" } else { "PAID" },
                "cost": if free { 0 } else { 359 },
                "location": if free { "ONLINE EVENT - Attend anywhere" } else { "Hall 2, Lucknow" },
                "date": "Saturday, March 19, 09:30PM",
            })
        })
        .collect();
    RawPage {
        events,
        pagination: Some(Pagination {
            has_more: Some(has_more),
            ..Pagination::default()
        }),
    }
}
