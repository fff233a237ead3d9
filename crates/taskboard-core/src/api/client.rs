//! API client for the Task Store backend.
//!
//! Every authenticated call goes through one interception point: the
//! current token is attached as a bearer credential on the way out, and a
//! `401` on the way back tears the session down before the error reaches
//! the caller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::{AuthBackend, AuthResponse, SessionStore, SignInRequest, SignUpRequest};
use crate::models::{Identity, Task, TaskDraft, TaskPage, TaskQuery, TaskStatus, TaskUpdate};

use super::ApiError;

/// Single-resource endpoints answer either with the bare object or
/// wrapped in a keyed envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum TaskEnvelope {
    Wrapped { task: Task },
    Bare(Task),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UserEnvelope {
    Wrapped { user: Identity },
    Bare(Identity),
}

/// API client for the Task Store.
/// Clone is cheap - reqwest::Client and the session handle are both Arc-backed.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<str>,
    session: Arc<SessionStore>,
}

impl ApiClient {
    /// Create a client with no request timeout
    pub fn new(base_url: &str, session: Arc<SessionStore>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, session, None)
    }

    /// Create a client. The access layer itself imposes no timeout;
    /// callers that want one pass it here.
    pub fn with_timeout(
        base_url: &str,
        session: Arc<SessionStore>,
        timeout: Option<Duration>,
    ) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Send an authenticated request to `path` under the base URL.
    ///
    /// A `401` clears the session and returns `ApiError::Unauthorized`; any
    /// other non-success status is returned as the matching `ApiError`.
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        self.send(method, path, &[], body).await
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        let token = self.session.token();
        debug!(%method, path, authenticated = token.is_some(), "Sending request");

        let mut request = self.client.request(method, self.url(path));
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(ref token) = token {
            request = request.bearer_auth(token);
        }
        let response = Self::with_body(request, body).send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(path, "Request unauthorized, tearing down session");
            self.session.invalidate(token.as_deref());
            return Err(ApiError::Unauthorized);
        }
        Self::check_response(response).await
    }

    /// Send a request to a public endpoint: no bearer token, and a `401`
    /// is an ordinary failure rather than a session teardown.
    async fn send_public<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        debug!(%method, path, "Sending public request");
        let request = self.client.request(method, self.url(path));
        let response = Self::with_body(request, body).send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_auth_status(status, &body))
    }

    fn with_body<B: Serialize + ?Sized>(request: RequestBuilder, body: Option<&B>) -> RequestBuilder {
        match body {
            Some(body) => request.json(body),
            None => request,
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        let response = self.send::<()>(Method::GET, path, query, None).await?;
        Self::parse(response).await
    }

    /// Mutation whose response body is not needed
    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ApiError> {
        self.send(method, path, &[], body).await?;
        Ok(())
    }

    // =========================================================================
    // Auth endpoints
    // =========================================================================

    async fn authenticate<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<AuthResponse, ApiError> {
        let response = self.send_public(Method::POST, path, Some(body)).await?;
        Self::parse(response).await
    }

    /// Identity for the presented token
    pub async fn me(&self) -> Result<Identity, ApiError> {
        let envelope: UserEnvelope = self.get("/auth/me", &[]).await?;
        Ok(match envelope {
            UserEnvelope::Wrapped { user } => user,
            UserEnvelope::Bare(user) => user,
        })
    }

    // =========================================================================
    // Task endpoints
    // =========================================================================

    pub async fn list_tasks(&self, query: &TaskQuery) -> Result<TaskPage, ApiError> {
        self.get("/tasks", &query.query_pairs()).await
    }

    pub async fn get_task(&self, id: &str) -> Result<Task, ApiError> {
        let envelope: TaskEnvelope = self.get(&format!("/tasks/{}", id), &[]).await?;
        Ok(match envelope {
            TaskEnvelope::Wrapped { task } => task,
            TaskEnvelope::Bare(task) => task,
        })
    }

    pub async fn create_task(&self, draft: &TaskDraft) -> Result<(), ApiError> {
        self.execute(Method::POST, "/tasks", Some(draft)).await
    }

    pub async fn update_task(&self, id: &str, update: &TaskUpdate) -> Result<(), ApiError> {
        self.execute(Method::PUT, &format!("/tasks/{}", id), Some(update))
            .await
    }

    pub async fn set_task_status(&self, id: &str, status: TaskStatus) -> Result<(), ApiError> {
        self.update_task(id, &TaskUpdate::status(status)).await
    }

    pub async fn delete_task(&self, id: &str) -> Result<(), ApiError> {
        self.execute::<()>(Method::DELETE, &format!("/tasks/{}", id), None)
            .await
    }
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn sign_in(&self, request: &SignInRequest) -> Result<AuthResponse, ApiError> {
        self.authenticate("/auth/signin", request).await
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<AuthResponse, ApiError> {
        self.authenticate("/auth/signup", request).await
    }
}
