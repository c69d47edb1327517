//! Peerza HTTP client
//!
//! Every call goes through [`PeerzaClient::send`], which attaches the stored
//! access credential and, on a first 401, performs one silent refresh
//! exchange before retrying the request. When the session cannot be renewed
//! the credentials are purged, [`SessionEvent::Expired`] is published and the
//! caller receives [`ClientError::SessionExpired`].

pub mod auth;
pub mod availability;
pub mod chat;
pub mod error;
pub mod events;
pub mod friends;
pub mod meetings;
pub mod notifications;
pub mod payments;
pub mod poll;
pub mod profile;
pub mod session;

pub use error::ClientError;
pub use events::{SessionEvent, SessionEvents};
pub use poll::Poller;
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};

use crate::types::{RefreshRequest, RefreshResponse};
use reqwest::{Client, ClientBuilder, Method, Response, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use session::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use reqwest::multipart::{Form, Part};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Base URL used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// Environment variable overriding the base URL
pub const BASE_URL_ENV: &str = "PEERZA_API_URL";

const REFRESH_PATH: &str = "/token/refresh/";

/// An outbound API call, kept rebuildable so it can be dispatched again
/// after a refresh exchange
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<RequestBody>,
    retried: bool,
}

#[derive(Debug, Clone)]
enum RequestBody {
    Json(serde_json::Value),
    /// Parts are kept as plain data; a `Form` is single-use
    Multipart(Vec<FormPart>),
}

#[derive(Debug, Clone)]
struct FormPart {
    name: String,
    file_name: String,
    mime: String,
    bytes: Vec<u8>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attach a JSON body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ClientError> {
        self.body = Some(RequestBody::Json(serde_json::to_value(body)?));
        Ok(self)
    }

    /// Add a file field to a multipart body
    pub fn file_part(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        let part = FormPart {
            name: name.into(),
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        };
        match &mut self.body {
            Some(RequestBody::Multipart(parts)) => parts.push(part),
            _ => self.body = Some(RequestBody::Multipart(vec![part])),
        }
        self
    }
}

fn build_form(parts: &[FormPart]) -> Result<Form, ClientError> {
    let mut form = Form::new();
    for part in parts {
        let file = Part::bytes(part.bytes.clone())
            .file_name(part.file_name.clone())
            .mime_str(&part.mime)?;
        form = form.part(part.name.clone(), file);
    }
    Ok(form)
}

/// Last completed refresh attempt, shared with requests that waited on it
#[derive(Default)]
struct RefreshGate {
    /// Bumped each time an attempt completes
    generation: AtomicU64,
    last: Mutex<Option<Result<String, Arc<ClientError>>>>,
}

impl RefreshGate {
    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

/// Peerza API client
#[derive(Clone)]
pub struct PeerzaClient {
    client: Client,
    base_url: String,
    session: Arc<dyn SessionStore>,
    events: SessionEvents,
    /// Present when concurrent 401s share one refresh exchange
    refresh_gate: Option<Arc<RefreshGate>>,
}

impl PeerzaClient {
    /// Create a client for `base_url` with an in-memory session
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a client whose base URL comes from `PEERZA_API_URL`
    pub fn from_env(session: Arc<dyn SessionStore>) -> Result<Self, ClientError> {
        let base_url =
            std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::builder().base_url(base_url).session(session).build()
    }

    /// Create a new client builder
    pub fn builder() -> PeerzaClientBuilder {
        PeerzaClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Receive session lifecycle events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Execute an authenticated request and decode its JSON body
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    /// Execute an authenticated request whose body is irrelevant
    pub async fn execute_empty(&self, request: ApiRequest) -> Result<(), ClientError> {
        self.send(request).await?;
        Ok(())
    }

    /// Execute a request that must not carry credentials nor trigger a refresh
    pub async fn execute_public<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ClientError> {
        let response = self.dispatch(&request, None).await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Dispatch an authenticated request, renewing the session once on 401
    pub async fn send(&self, mut request: ApiRequest) -> Result<Response, ClientError> {
        // Read before the credential so a refresh finishing in between is noticed
        let observed = self.refresh_gate.as_ref().map_or(0, |gate| gate.generation());
        let mut access = self.session.access_token()?;

        loop {
            let response = self.dispatch(&request, access.as_deref()).await?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let error = error_from_response(response).await;
            if status != StatusCode::UNAUTHORIZED || request.retried {
                return Err(error);
            }

            debug!(path = %request.path, "Access credential rejected, renewing session");
            access = Some(self.renew_session(observed, access.as_deref(), error).await?);
            request.retried = true;
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        access: Option<&str>,
    ) -> Result<Response, ClientError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method.clone(), url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        match &request.body {
            Some(RequestBody::Json(body)) => builder = builder.json(body),
            Some(RequestBody::Multipart(parts)) => builder = builder.multipart(build_form(parts)?),
            None => {}
        }
        if let Some(token) = access {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        debug!(
            method = %request.method,
            path = %request.path,
            authenticated = access.is_some(),
            retried = request.retried,
            "Dispatching request"
        );
        Ok(builder.send().await?)
    }

    /// Obtain a usable access credential after `stale` was rejected.
    ///
    /// `observed` is the refresh generation seen before the rejected request
    /// was sent. If an attempt completed since then, its outcome is reused
    /// instead of starting another exchange.
    async fn renew_session(
        &self,
        observed: u64,
        stale: Option<&str>,
        unauthorized: ClientError,
    ) -> Result<String, ClientError> {
        let Some(gate) = &self.refresh_gate else {
            return self
                .refresh_or_expire(unauthorized)
                .await
                .map_err(|source| ClientError::SessionExpired { source });
        };

        let mut last = gate.last.lock().await;

        if gate.generation() != observed {
            // A login may have landed after the shared attempt
            if let Some(current) = self
                .session
                .access_token()?
                .filter(|current| Some(current.as_str()) != stale)
            {
                debug!("Another request already renewed the session");
                return Ok(current);
            }
            match last.as_ref() {
                Some(Ok(access)) => return Ok(access.clone()),
                Some(Err(failure)) => {
                    debug!("Shared refresh attempt already failed");
                    return Err(ClientError::SessionExpired {
                        source: failure.clone(),
                    });
                }
                None => {}
            }
        }

        let outcome = self.refresh_or_expire(unauthorized).await;
        *last = Some(outcome.clone());
        gate.generation.fetch_add(1, Ordering::Release);

        outcome.map_err(|source| ClientError::SessionExpired { source })
    }

    /// Run one refresh exchange, storing the renewed credentials, or end the
    /// session and hand back the cause
    async fn refresh_or_expire(
        &self,
        unauthorized: ClientError,
    ) -> Result<String, Arc<ClientError>> {
        let refresh = match self.session.refresh_token() {
            Ok(Some(refresh)) => refresh,
            Ok(None) => {
                warn!("No refresh credential stored, ending session");
                return Err(self.expire(unauthorized));
            }
            Err(err) => return Err(self.expire(err)),
        };

        let renewed = match self.exchange_refresh(&refresh).await {
            Ok(tokens) => self.store_renewed(tokens),
            Err(err) => {
                warn!("Refresh exchange failed: {err}");
                return Err(self.expire(err));
            }
        };

        match renewed {
            Ok(access) => {
                info!("Access credential renewed");
                self.events.emit(SessionEvent::Refreshed);
                Ok(access)
            }
            Err(err) => Err(self.expire(err)),
        }
    }

    fn store_renewed(&self, tokens: RefreshResponse) -> Result<String, ClientError> {
        self.session.set(ACCESS_TOKEN_KEY, &tokens.access)?;
        if let Some(rotated) = &tokens.refresh {
            self.session.set(REFRESH_TOKEN_KEY, rotated)?;
        }
        Ok(tokens.access)
    }

    /// The refresh exchange is unauthenticated and never retried
    async fn exchange_refresh(&self, refresh: &str) -> Result<RefreshResponse, ClientError> {
        let request = ApiRequest::post(REFRESH_PATH).json(&RefreshRequest {
            refresh: refresh.to_string(),
        })?;
        self.execute_public(request).await
    }

    /// Purge credentials and publish the expiry
    fn expire(&self, cause: ClientError) -> Arc<ClientError> {
        if let Err(err) = self.session.clear() {
            warn!("Failed to clear session store: {err}");
        }
        self.events.emit(SessionEvent::Expired);
        Arc::new(cause)
    }
}

async fn check_status(response: Response) -> Result<Response, ClientError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(error_from_response(response).await)
    }
}

async fn error_from_response(response: Response) -> ClientError {
    let status = response.status();
    let message = response.text().await.unwrap_or_else(|_| status.to_string());
    ClientError::from_status(status, message)
}

/// Builder for PeerzaClient
pub struct PeerzaClientBuilder {
    base_url: Option<String>,
    session: Option<Arc<dyn SessionStore>>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    single_flight: bool,
}

impl Default for PeerzaClientBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            session: None,
            timeout: None,
            user_agent: None,
            single_flight: true,
        }
    }
}

impl PeerzaClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the credential store
    pub fn session(mut self, session: Arc<dyn SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Share one refresh exchange between concurrent 401s (default `true`).
    ///
    /// With `false` every failing request performs its own exchange.
    pub fn single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<PeerzaClient, ClientError> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();
        url::Url::parse(&base_url)
            .map_err(|err| ClientError::Configuration(format!("invalid base_url: {err}")))?;

        let mut client_builder = ClientBuilder::new();

        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        if let Some(user_agent) = self.user_agent {
            client_builder = client_builder.user_agent(user_agent);
        } else {
            client_builder = client_builder.user_agent(concat!(
                "peerza-client/",
                env!("CARGO_PKG_VERSION")
            ));
        }

        let client = client_builder.build()?;

        Ok(PeerzaClient {
            client,
            base_url,
            session: self
                .session
                .unwrap_or_else(|| Arc::new(MemorySessionStore::new())),
            events: SessionEvents::default(),
            refresh_gate: self.single_flight.then(|| Arc::new(RefreshGate::default())),
        })
    }
}
