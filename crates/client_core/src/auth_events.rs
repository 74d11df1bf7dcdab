//! Session-change notifications and the subscription handle that receives them.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use shared::domain::Session;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChangeEvent {
    /// Delivered once to every new subscriber with the session current at
    /// subscription time.
    InitialSession,
    SignedIn,
    SignedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthStateChange {
    pub event: AuthChangeEvent,
    pub session: Option<Session>,
}

impl AuthStateChange {
    pub fn new(event: AuthChangeEvent, session: Option<Session>) -> Self {
        Self { event, session }
    }

    /// Session carried by the change, unless the change ends the session.
    pub fn active_session(&self) -> Option<&Session> {
        match self.event {
            AuthChangeEvent::SignedOut => None,
            AuthChangeEvent::InitialSession | AuthChangeEvent::SignedIn => self.session.as_ref(),
        }
    }
}

#[derive(Default)]
struct HubState {
    next_id: u64,
    listeners: HashMap<u64, mpsc::UnboundedSender<AuthStateChange>>,
}

fn lock(state: &Mutex<HubState>) -> MutexGuard<'_, HubState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fan-out point for auth state changes.
///
/// Auth providers own one hub and call [`AuthEventHub::emit`] whenever the
/// session changes; consumers register through [`AuthEventHub::subscribe`].
#[derive(Clone, Default)]
pub struct AuthEventHub {
    state: Arc<Mutex<HubState>>,
}

impl AuthEventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, current: Option<Session>) -> AuthSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(AuthStateChange::new(
            AuthChangeEvent::InitialSession,
            current,
        ));

        let id = {
            let mut state = lock(&self.state);
            let id = state.next_id;
            state.next_id += 1;
            state.listeners.insert(id, tx);
            id
        };
        debug!(subscription_id = id, "auth: listener registered");

        AuthSubscription {
            id,
            events: rx,
            hub: Arc::downgrade(&self.state),
        }
    }

    pub fn emit(&self, event: AuthChangeEvent, session: Option<Session>) {
        let change = AuthStateChange::new(event, session);
        let mut state = lock(&self.state);
        state
            .listeners
            .retain(|_, listener| listener.send(change.clone()).is_ok());
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.state).listeners.len()
    }
}

/// Registration for auth state changes.
///
/// The registration is released when the handle is consumed by
/// [`AuthSubscription::unsubscribe`] or dropped, which can only happen once.
pub struct AuthSubscription {
    id: u64,
    events: mpsc::UnboundedReceiver<AuthStateChange>,
    hub: Weak<Mutex<HubState>>,
}

impl AuthSubscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Waits for the next change. `None` once the provider is gone.
    pub async fn recv(&mut self) -> Option<AuthStateChange> {
        self.events.recv().await
    }

    pub fn try_recv(&mut self) -> Option<AuthStateChange> {
        self.events.try_recv().ok()
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        if let Some(state) = self.hub.upgrade() {
            lock(&state).listeners.remove(&self.id);
        }
        debug!(subscription_id = self.id, "auth: listener released");
    }
}

#[cfg(test)]
#[path = "tests/auth_events_tests.rs"]
mod tests;
