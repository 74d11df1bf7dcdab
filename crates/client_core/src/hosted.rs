//! HTTP bindings for the hosted auth service and its per-user to-do table.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header::HeaderValue, Client, RequestBuilder, Response, StatusCode};
use shared::{
    domain::{NewTodo, Session, TodoId, TodoItem, UserId},
    error::ServiceErrorBody,
    protocol::{PasswordGrantRequest, TitlePatch, TokenResponse},
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    auth_events::{AuthChangeEvent, AuthEventHub, AuthSubscription},
    error::{AuthError, DataError},
    AuthProvider, TodoStore,
};

pub const DEFAULT_TABLE: &str = "todos";

/// Endpoint and public key of the hosted service.
#[derive(Debug, Clone)]
pub struct HostedConfig {
    service_url: Url,
    api_key: String,
    table: String,
}

impl HostedConfig {
    pub fn new(
        service_url: &str,
        api_key: impl Into<String>,
        table: impl Into<String>,
    ) -> Result<Self, url::ParseError> {
        let mut service_url = Url::parse(service_url.trim())?;
        if !service_url.path().ends_with('/') {
            let path = format!("{}/", service_url.path());
            service_url.set_path(&path);
        }
        Ok(Self {
            service_url,
            api_key: api_key.into(),
            table: table.into(),
        })
    }

    pub fn service_url(&self) -> &Url {
        &self.service_url
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.service_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(path.split('/'));
        }
        url
    }
}

type SessionCell = Arc<RwLock<Option<Session>>>;

fn read_session(cell: &SessionCell) -> Option<Session> {
    cell.read().unwrap_or_else(PoisonError::into_inner).clone()
}

fn replace_session(cell: &SessionCell, session: Option<Session>) -> Option<Session> {
    let mut guard = cell.write().unwrap_or_else(PoisonError::into_inner);
    std::mem::replace(&mut *guard, session)
}

/// Client handle for the hosted service, built once at startup and handed to
/// the controller. `auth` and `todos` share the signed-in session so table
/// calls carry the user's bearer token.
pub struct HostedClient {
    pub auth: Arc<HostedAuth>,
    pub todos: Arc<HostedTodoTable>,
}

impl HostedClient {
    pub fn new(config: HostedConfig) -> Self {
        Self::with_http(Client::new(), config)
    }

    pub fn with_http(http: Client, config: HostedConfig) -> Self {
        let session: SessionCell = Arc::new(RwLock::new(None));
        let auth = Arc::new(HostedAuth {
            http: http.clone(),
            config: config.clone(),
            session: Arc::clone(&session),
            events: AuthEventHub::new(),
        });
        let todos = Arc::new(HostedTodoTable {
            http,
            config,
            session,
        });
        Self { auth, todos }
    }
}

async fn rejection(response: Response) -> (u16, String) {
    let status = response.status();
    let body = response.bytes().await.unwrap_or_default();
    (
        status.as_u16(),
        ServiceErrorBody::message_from_bytes(&body, &status.to_string()),
    )
}

fn with_api_key(request: RequestBuilder, api_key: &str) -> RequestBuilder {
    request.header("apikey", api_key)
}

pub struct HostedAuth {
    http: Client,
    config: HostedConfig,
    session: SessionCell,
    events: AuthEventHub,
}

impl HostedAuth {
    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        self.events.listener_count()
    }
}

#[async_trait]
impl AuthProvider for HostedAuth {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let mut url = self.config.endpoint("auth/v1/token");
        url.query_pairs_mut().append_pair("grant_type", "password");

        let response = with_api_key(self.http.post(url), &self.config.api_key)
            .json(&PasswordGrantRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, message) = rejection(response).await;
            return Err(AuthError::Rejected { status, message });
        }

        let body = response.bytes().await?;
        let token: TokenResponse = serde_json::from_slice(&body)
            .map_err(|err| AuthError::Decode(err.to_string()))?;
        let session = token.into_session(Utc::now());

        replace_session(&self.session, Some(session.clone()));
        info!(user_id = %session.user_id(), "auth: password sign-in succeeded");
        self.events
            .emit(AuthChangeEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(session) = read_session(&self.session) else {
            self.events.emit(AuthChangeEvent::SignedOut, None);
            return Ok(());
        };

        let response = with_api_key(
            self.http.post(self.config.endpoint("auth/v1/logout")),
            &self.config.api_key,
        )
        .bearer_auth(&session.access_token)
        .send()
        .await?;

        let status = response.status();
        let token_already_invalid = matches!(
            status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
        );
        if !status.is_success() && !token_already_invalid {
            let (status, message) = rejection(response).await;
            return Err(AuthError::Rejected { status, message });
        }
        if token_already_invalid {
            warn!(status = status.as_u16(), "auth: logout reported token already invalid");
        }

        replace_session(&self.session, None);
        info!(user_id = %session.user_id(), "auth: signed out");
        self.events.emit(AuthChangeEvent::SignedOut, None);
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        let expired = {
            let mut guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
            let is_expired = guard
                .as_ref()
                .is_some_and(|session| session.is_expired_at(Utc::now()));
            if !is_expired {
                return Ok(guard.clone());
            }
            guard.take()
        };

        if let Some(expired) = expired {
            warn!(user_id = %expired.user_id(), "auth: cached session expired");
            self.events.emit(AuthChangeEvent::SignedOut, None);
        }
        Ok(None)
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        self.events.subscribe(read_session(&self.session))
    }
}

/// The single remote table of to-do rows, filtered per owner.
pub struct HostedTodoTable {
    http: Client,
    config: HostedConfig,
    session: SessionCell,
}

impl HostedTodoTable {
    fn request(&self, method: reqwest::Method) -> RequestBuilder {
        let bearer = read_session(&self.session)
            .map(|session| session.access_token)
            .unwrap_or_else(|| self.config.api_key.clone());
        let url = self.config.endpoint(&format!("rest/v1/{}", self.config.table));
        with_api_key(self.http.request(method, url), &self.config.api_key).bearer_auth(bearer)
    }

    async fn expect_success(
        operation: &'static str,
        response: Response,
    ) -> Result<Response, DataError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let (status, message) = rejection(response).await;
        Err(DataError::Rejected {
            operation,
            status,
            message,
        })
    }
}

#[async_trait]
impl TodoStore for HostedTodoTable {
    async fn select_by_owner(&self, owner: UserId) -> Result<Vec<TodoItem>, DataError> {
        let response = self
            .request(reqwest::Method::GET)
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{owner}")),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await?;
        let body = Self::expect_success("select", response).await?.bytes().await?;
        let items: Vec<TodoItem> =
            serde_json::from_slice(&body).map_err(|err| DataError::Decode(err.to_string()))?;
        debug!(user_id = %owner, count = items.len(), "table: selected todos");
        Ok(items)
    }

    async fn insert(&self, todo: NewTodo) -> Result<(), DataError> {
        let response = self
            .request(reqwest::Method::POST)
            .header("Prefer", HeaderValue::from_static("return=minimal"))
            .json(&[todo])
            .send()
            .await?;
        Self::expect_success("insert", response).await?;
        Ok(())
    }

    async fn update_title(&self, id: &TodoId, title: &str) -> Result<(), DataError> {
        let response = self
            .request(reqwest::Method::PATCH)
            .query(&[("id", format!("eq.{id}"))])
            .json(&TitlePatch {
                title: title.to_string(),
            })
            .send()
            .await?;
        Self::expect_success("update", response).await?;
        Ok(())
    }

    async fn delete(&self, id: &TodoId) -> Result<(), DataError> {
        let response = self
            .request(reqwest::Method::DELETE)
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;
        Self::expect_success("delete", response).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/hosted_tests.rs"]
mod tests;
