use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use hive_core::{EventId, EventRecord, ValidEventDraft, normalize};
use log::{debug, warn};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use validator::Validate;

pub mod source;
mod wire;

pub use source::{ArcEventSource, EventFeed, EventSource, HttpEventSource};
pub use wire::{
    LoginRequest, LoginResponse, Pagination, Participant, RawPage, RegistrationReceipt,
    RegistrationRequest, Role, SignupRequest, SignupResponse,
};

use wire::{CreatedEvent, ErrorBody, ParticipantList};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the API lives and who is talking to it.
#[derive(Clone, Debug)]
pub struct Session {
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl Session {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("could not connect to server: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{message}")]
    Server { status: u16, message: String },

    #[error("failed to decode server response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("authentication required")]
    Unauthorized,

    #[error("invalid request: {0}")]
    Invalid(String),
}

impl ApiError {
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Clone)]
pub struct HttpEventApi {
    base_url: String,
    http_client: reqwest::Client,
    token: Arc<Mutex<Option<String>>>,
}

impl HttpEventApi {
    pub fn new(session: Session) -> ApiResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(session.timeout)
            .build()?;
        Ok(Self {
            base_url: session.base_url,
            http_client,
            token: Arc::new(Mutex::new(session.token)),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn lock_token(&self) -> MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get_token(&self) -> Option<String> {
        self.lock_token().clone()
    }

    fn require_token(&self) -> ApiResult<String> {
        self.get_token().ok_or(ApiError::Unauthorized)
    }

    async fn read_response<R: DeserializeOwned>(resp: reqwest::Response) -> ApiResult<R> {
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()));
            warn!("Server returned {}: {}", status, message);
            return Err(ApiError::Server {
                status: status.as_u16(),
                message,
            });
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn get<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        token: Option<String>,
    ) -> ApiResult<R> {
        debug!("GET {}{} {:?}", self.base_url, path, query);
        let mut request = self.http_client.get(self.url(path));
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        Self::read_response(request.send().await?).await
    }

    async fn post<T: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
        token: Option<String>,
    ) -> ApiResult<R> {
        debug!("POST {}{}", self.base_url, path);
        let body = serde_json::to_string(body)?;
        let mut request = self
            .http_client
            .post(self.url(path))
            .header("Content-Type", "application/json")
            .body(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        Self::read_response(request.send().await?).await
    }

    /// `GET /events/?page=&limit=`, the public paginated listing.
    pub async fn fetch_events(&self, page: u32, limit: u32) -> ApiResult<RawPage> {
        self.get(
            "/events/",
            &[("page", page.to_string()), ("limit", limit.to_string())],
            self.get_token(),
        )
        .await
    }

    /// Events created by the logged-in admin. Not paginated.
    pub async fn fetch_admin_events(&self) -> ApiResult<RawPage> {
        let token = self.require_token()?;
        self.get("/admin/events/", &[], Some(token)).await
    }

    /// Events the logged-in user registered for. Not paginated.
    pub async fn fetch_registered_events(&self) -> ApiResult<RawPage> {
        let token = self.require_token()?;
        self.get("/user/registered-events/", &[], Some(token)).await
    }

    pub async fn fetch_participants(&self, event_id: &EventId) -> ApiResult<Vec<Participant>> {
        let token = self.require_token()?;
        let list: ParticipantList = self
            .get(&format!("/events/{}/participants", event_id), &[], Some(token))
            .await?;
        Ok(list.participants)
    }

    pub async fn register(
        &self,
        event_id: &EventId,
        request: &RegistrationRequest,
    ) -> ApiResult<RegistrationReceipt> {
        let token = self.require_token()?;
        self.post(&format!("/events/{}/register", event_id), request, Some(token))
            .await
    }

    pub async fn create_event(&self, draft: &ValidEventDraft) -> ApiResult<EventRecord> {
        let token = self.require_token()?;
        let created: CreatedEvent = self.post("/events/create/", draft, Some(token)).await?;
        Ok(normalize(&created.event))
    }

    /// Logs in and keeps the returned token for later calls.
    pub async fn login(
        &self,
        role: Role,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> ApiResult<String> {
        let request = LoginRequest {
            email: email.into().trim().to_lowercase(),
            password: password.into(),
        };
        if let Err(e) = request.validate() {
            return Err(ApiError::Invalid(format!("Invalid login: {}", e)));
        }
        let resp: LoginResponse = self.post(role.login_path(), &request, None).await?;
        *self.lock_token() = Some(resp.token.clone());
        Ok(resp.token)
    }

    /// Creates an account and keeps the returned token, as `login` does.
    pub async fn signup(&self, role: Role, request: &SignupRequest) -> ApiResult<String> {
        if role == Role::User && request.name.is_empty() {
            return Err(ApiError::Invalid("Name is required".to_string()));
        }
        if let Err(e) = request.validate() {
            return Err(ApiError::Invalid(format!("Invalid signup: {}", e)));
        }
        let resp: SignupResponse = self.post(role.signup_path(), request, None).await?;
        debug!("Signed up {}: {}", request.email, resp.message);
        *self.lock_token() = Some(resp.token.clone());
        Ok(resp.token)
    }

    pub fn logout(&self) {
        *self.lock_token() = None;
    }
}
