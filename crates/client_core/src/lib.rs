use async_trait::async_trait;
use shared::domain::{NewTodo, Session, TodoId, TodoItem, UserId};

pub mod auth_events;
pub mod controller;
pub mod error;
pub mod hosted;

pub use auth_events::{AuthChangeEvent, AuthEventHub, AuthStateChange, AuthSubscription};
pub use controller::{EditingCursor, TodoController, ViewState};
pub use error::{AuthError, ClientError, DataError, ValidationError};
pub use hosted::{HostedAuth, HostedClient, HostedConfig, HostedTodoTable, DEFAULT_TABLE};

/// Issues and ends sessions. Implementations emit every session change to
/// subscribers obtained from [`AuthProvider::on_auth_state_change`].
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<Session, AuthError>;
    async fn sign_out(&self) -> Result<(), AuthError>;
    async fn get_session(&self) -> Result<Option<Session>, AuthError>;
    fn on_auth_state_change(&self) -> AuthSubscription;
}

/// Remote to-do rows. Ids and creation timestamps are assigned by the store.
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Rows owned by `owner`, newest `created_at` first.
    async fn select_by_owner(&self, owner: UserId) -> Result<Vec<TodoItem>, DataError>;
    async fn insert(&self, todo: NewTodo) -> Result<(), DataError>;
    async fn update_title(&self, id: &TodoId, title: &str) -> Result<(), DataError>;
    async fn delete(&self, id: &TodoId) -> Result<(), DataError>;
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "tests/mock_service.rs"]
mod mock_service;
