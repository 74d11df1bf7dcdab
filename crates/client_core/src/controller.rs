//! View-controller state: who is signed in, the mirrored to-do list and the
//! inline edit in progress.

use std::sync::Arc;

use chrono::Utc;
use shared::domain::{NewTodo, Session, TodoId, TodoItem, UserId};
use tracing::{debug, error, info, warn};

use crate::{
    auth_events::{AuthStateChange, AuthSubscription},
    error::{AuthError, ClientError, ValidationError},
    AuthProvider, TodoStore,
};

/// The item being edited inline and its unsaved title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditingCursor {
    pub id: TodoId,
    pub buffer: String,
}

/// Everything a view needs to render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub session: Option<Session>,
    /// Newest first, as returned by the last successful fetch.
    pub items: Vec<TodoItem>,
    pub editing: Option<EditingCursor>,
    /// Blocking message for the user (auth failures only).
    pub alert: Option<String>,
}

impl ViewState {
    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }
}

pub fn is_blank(title: &str) -> bool {
    title.trim().is_empty()
}

/// Mirrors the signed-in user's remote to-do rows.
///
/// Every mutation is one remote call followed by a full re-fetch; there is no
/// optimistic local update. A failed mutation skips the re-fetch and leaves
/// the state untouched.
pub struct TodoController {
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn TodoStore>,
    state: ViewState,
    subscription: Option<AuthSubscription>,
}

impl TodoController {
    pub fn new(auth: Arc<dyn AuthProvider>, store: Arc<dyn TodoStore>) -> Self {
        Self {
            auth,
            store,
            state: ViewState::default(),
            subscription: None,
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.state.session.as_ref()
    }

    pub fn items(&self) -> &[TodoItem] {
        &self.state.items
    }

    pub fn editing(&self) -> Option<&EditingCursor> {
        self.state.editing.as_ref()
    }

    pub fn take_alert(&mut self) -> Option<String> {
        self.state.alert.take()
    }

    #[cfg(test)]
    pub(crate) fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Registers for session changes and picks up a session that already
    /// exists, so a returning user never sees the signed-out view first.
    pub async fn start(&mut self) {
        if self.subscription.is_none() {
            self.subscription = Some(self.auth.on_auth_state_change());
        }

        match self.auth.get_session().await {
            Ok(Some(session)) => {
                info!(user_id = %session.user_id(), "auth: restored existing session");
                self.activate_session(session).await;
            }
            Ok(None) => debug!("auth: no existing session"),
            Err(err) => error!("auth: failed to query existing session: {err}"),
        }
    }

    /// Waits for the next session change. Pends forever when not subscribed.
    pub async fn next_auth_change(&mut self) -> Option<AuthStateChange> {
        let Some(subscription) = self.subscription.as_mut() else {
            return std::future::pending().await;
        };
        let change = subscription.recv().await;
        if change.is_none() {
            warn!("auth: provider closed the session subscription");
            self.teardown();
        }
        change
    }

    /// Applies every change already queued on the subscription.
    #[cfg(test)]
    pub(crate) async fn process_pending_auth_changes(&mut self) -> usize {
        let mut applied = 0;
        while let Some(change) = self
            .subscription
            .as_mut()
            .and_then(AuthSubscription::try_recv)
        {
            self.apply_auth_change(change).await;
            applied += 1;
        }
        applied
    }

    pub async fn apply_auth_change(&mut self, change: AuthStateChange) {
        debug!(event = ?change.event, "auth: state change");
        match change.active_session() {
            Some(session) => self.activate_session(session.clone()).await,
            None => {
                if self.state.session.is_some() {
                    info!("auth: session ended");
                }
                self.clear_session();
            }
        }
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<(), ClientError> {
        match self.auth.sign_in_with_password(email, password).await {
            Ok(session) => {
                info!(user_id = %session.user_id(), "auth: sign-in accepted");
                Ok(())
            }
            Err(err) => {
                warn!("auth: sign-in failed: {err}");
                self.state.alert = Some(err.to_string());
                Err(err.into())
            }
        }
    }

    pub async fn sign_out(&mut self) -> Result<(), ClientError> {
        match self.auth.sign_out().await {
            Ok(()) => {
                self.clear_session();
                Ok(())
            }
            Err(err) => {
                warn!("auth: sign-out failed: {err}");
                self.state.alert = Some(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Replaces the local list with the owner's rows, newest first.
    pub async fn fetch(&mut self) -> Result<(), ClientError> {
        let owner = self.require_session()?;
        match self.store.select_by_owner(owner).await {
            Ok(items) => {
                debug!(user_id = %owner, count = items.len(), "todos: fetched");
                self.state.items = items;
                Ok(())
            }
            Err(err) => {
                error!(user_id = %owner, "todos: fetch failed: {err}");
                Err(err.into())
            }
        }
    }

    pub async fn add(&mut self, title: &str) -> Result<(), ClientError> {
        if is_blank(title) {
            warn!("todos: rejected blank title");
            return Err(ValidationError::BlankTitle.into());
        }
        let owner = self.require_session()?;

        let todo = NewTodo {
            title: title.to_string(),
            user_id: owner,
        };
        if let Err(err) = self.store.insert(todo).await {
            error!(user_id = %owner, "todos: insert failed: {err}");
            return Err(err.into());
        }
        info!(user_id = %owner, "todos: added");
        self.refresh_after_mutation().await;
        Ok(())
    }

    /// Starts editing `id` with its current title in the buffer.
    pub fn edit(&mut self, id: TodoId) {
        let buffer = self
            .state
            .items
            .iter()
            .find(|item| item.id == id)
            .map(|item| item.title.clone())
            .unwrap_or_default();
        self.state.editing = Some(EditingCursor { id, buffer });
    }

    pub fn set_edit_buffer(&mut self, text: impl Into<String>) {
        if let Some(cursor) = self.state.editing.as_mut() {
            cursor.buffer = text.into();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.state.editing = None;
    }

    pub async fn save(&mut self) -> Result<(), ClientError> {
        let Some(cursor) = self.state.editing.as_ref() else {
            return Err(ValidationError::NotEditing.into());
        };
        if is_blank(&cursor.buffer) {
            warn!(todo_id = %cursor.id, "todos: rejected blank title");
            return Err(ValidationError::BlankTitle.into());
        }
        let (id, title) = (cursor.id.clone(), cursor.buffer.clone());

        if let Err(err) = self.store.update_title(&id, &title).await {
            error!(todo_id = %id, "todos: update failed: {err}");
            return Err(err.into());
        }
        info!(todo_id = %id, "todos: renamed");
        self.state.editing = None;
        self.refresh_after_mutation().await;
        Ok(())
    }

    pub async fn remove(&mut self, id: TodoId) -> Result<(), ClientError> {
        if let Err(err) = self.store.delete(&id).await {
            error!(todo_id = %id, "todos: delete failed: {err}");
            return Err(err.into());
        }
        info!(todo_id = %id, "todos: deleted");
        if self.state.editing.as_ref().is_some_and(|cursor| cursor.id == id) {
            self.state.editing = None;
        }
        self.refresh_after_mutation().await;
        Ok(())
    }

    /// Releases the session subscription. Returns whether one was held.
    pub fn teardown(&mut self) -> bool {
        match self.subscription.take() {
            Some(subscription) => {
                debug!(subscription_id = subscription.id(), "auth: releasing subscription");
                subscription.unsubscribe();
                true
            }
            None => false,
        }
    }

    async fn activate_session(&mut self, session: Session) {
        let switched_user =
            self.state.session.as_ref().map(Session::user_id) != Some(session.user_id());
        if switched_user {
            self.state.items.clear();
            self.state.editing = None;
        }
        self.state.session = Some(session);
        // Errors are already logged by fetch.
        let _ = self.fetch().await;
    }

    fn clear_session(&mut self) {
        self.state.session = None;
        self.state.items.clear();
        self.state.editing = None;
    }

    fn require_session(&mut self) -> Result<UserId, ClientError> {
        let Some(session) = self.state.session.as_ref() else {
            error!("todos: remote call attempted without an active session");
            return Err(ClientError::NoSession);
        };
        if session.is_expired_at(Utc::now()) {
            warn!(user_id = %session.user_id(), "auth: session expired");
            self.clear_session();
            return Err(AuthError::SessionExpired.into());
        }
        Ok(session.user_id())
    }

    async fn refresh_after_mutation(&mut self) {
        // The mutation already landed; a failed re-fetch only leaves the list stale.
        let _ = self.fetch().await;
    }
}

impl Drop for TodoController {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
