use std::{fmt::Display, str::FromStr, sync::Arc};

use crate::{ApiResult, HttpEventApi, RawPage};

pub type ArcEventSource = Arc<Box<dyn EventSource + Send + Sync + 'static>>;

/// Anything the catalog can page over.
#[async_trait::async_trait]
pub trait EventSource {
    async fn fetch_page(&self, page: u32, limit: u32) -> ApiResult<RawPage>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EventFeed {
    #[default]
    All,
    Admin,
    Registered,
}

impl FromStr for EventFeed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "events" => Ok(EventFeed::All),
            "admin" => Ok(EventFeed::Admin),
            "registered" => Ok(EventFeed::Registered),
            other => Err(format!("unknown feed: {}", other)),
        }
    }
}

impl Display for EventFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventFeed::All => "all",
            EventFeed::Admin => "admin",
            EventFeed::Registered => "registered",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone)]
pub struct HttpEventSource {
    api: HttpEventApi,
    feed: EventFeed,
}

impl HttpEventSource {
    pub fn new(api: HttpEventApi, feed: EventFeed) -> Self {
        Self { api, feed }
    }

    pub fn into_arc(self) -> ArcEventSource {
        Arc::new(Box::new(self))
    }
}

#[async_trait::async_trait]
impl EventSource for HttpEventSource {
    async fn fetch_page(&self, page: u32, limit: u32) -> ApiResult<RawPage> {
        match self.feed {
            EventFeed::All => self.api.fetch_events(page, limit).await,
            // the whole list arrives with the first page
            _ if page > 1 => Ok(RawPage::default()),
            EventFeed::Admin => self.api.fetch_admin_events().await,
            EventFeed::Registered => self.api.fetch_registered_events().await,
        }
    }
}
