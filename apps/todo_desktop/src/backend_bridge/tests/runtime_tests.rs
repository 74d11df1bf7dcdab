use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use client_core::{
    AuthChangeEvent, AuthError, AuthEventHub, AuthProvider, AuthSubscription, DataError,
    TodoStore, ViewState,
};
use crossbeam_channel::{bounded, Receiver};
use shared::domain::{NewTodo, Session, SessionUser, TodoId, TodoItem, UserId};

use super::*;

const EMAIL: &str = "ada@example.com";
const PASSWORD: &str = "correct horse";

fn ada() -> UserId {
    UserId(uuid::Uuid::from_u128(0xada))
}

fn ada_session() -> Session {
    Session {
        user: SessionUser {
            id: ada(),
            email: EMAIL.to_string(),
        },
        access_token: "token-1".to_string(),
        expires_at: None,
    }
}

#[derive(Default)]
struct FakeAuth {
    hub: AuthEventHub,
    current: Mutex<Option<Session>>,
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        if email != EMAIL || password != PASSWORD {
            return Err(AuthError::Rejected {
                status: 400,
                message: "Invalid login credentials".to_string(),
            });
        }
        let session = ada_session();
        *self.current.lock().expect("current") = Some(session.clone());
        self.hub
            .emit(AuthChangeEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        *self.current.lock().expect("current") = None;
        self.hub.emit(AuthChangeEvent::SignedOut, None);
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.current.lock().expect("current").clone())
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        let current = self.current.lock().expect("current").clone();
        self.hub.subscribe(current)
    }
}

#[derive(Default)]
struct FakeStore {
    rows: Mutex<Vec<TodoItem>>,
}

#[async_trait]
impl TodoStore for FakeStore {
    async fn select_by_owner(&self, owner: UserId) -> Result<Vec<TodoItem>, DataError> {
        let mut rows: Vec<TodoItem> = self
            .rows
            .lock()
            .expect("rows")
            .iter()
            .filter(|row| row.user_id == owner)
            .cloned()
            .collect();
        rows.reverse();
        Ok(rows)
    }

    async fn insert(&self, todo: NewTodo) -> Result<(), DataError> {
        let mut rows = self.rows.lock().expect("rows");
        let id = TodoId::Int(rows.len() as i64 + 1);
        rows.push(TodoItem {
            id,
            title: todo.title,
            user_id: todo.user_id,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn update_title(&self, id: &TodoId, title: &str) -> Result<(), DataError> {
        for row in self.rows.lock().expect("rows").iter_mut() {
            if row.id == *id {
                row.title = title.to_string();
            }
        }
        Ok(())
    }

    async fn delete(&self, id: &TodoId) -> Result<(), DataError> {
        self.rows.lock().expect("rows").retain(|row| row.id != *id);
        Ok(())
    }
}

struct Harness {
    auth: Arc<FakeAuth>,
    controller: TodoController,
}

fn harness(auth: FakeAuth) -> Harness {
    let auth = Arc::new(auth);
    let controller = TodoController::new(auth.clone(), Arc::new(FakeStore::default()));
    Harness { auth, controller }
}

/// Drains UI events until one snapshot satisfies `accept`.
async fn wait_for_state(
    ui_rx: &Receiver<UiEvent>,
    accept: impl Fn(&ViewState) -> bool,
) -> ViewState {
    for _ in 0..400 {
        while let Ok(event) = ui_rx.try_recv() {
            if let UiEvent::StateChanged(state) = event {
                if accept(&state) {
                    return state;
                }
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("expected state never published");
}

#[tokio::test]
async fn commands_flow_through_controller_into_snapshots() {
    let Harness { auth, controller } = harness(FakeAuth::default());
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (ui_tx, ui_rx) = bounded(256);

    let driver = async {
        let idle = wait_for_state(&ui_rx, |_| true).await;
        assert!(!idle.is_signed_in());

        cmd_tx
            .send(BackendCommand::SignIn {
                email: EMAIL.to_string(),
                password: PASSWORD.to_string(),
            })
            .await
            .expect("send");
        wait_for_state(&ui_rx, ViewState::is_signed_in).await;

        cmd_tx
            .send(BackendCommand::AddTodo {
                title: "Buy milk".to_string(),
            })
            .await
            .expect("send");
        let state = wait_for_state(&ui_rx, |state| state.items.len() == 1).await;
        assert_eq!(state.items[0].title, "Buy milk");
        let id = state.items[0].id.clone();

        cmd_tx
            .send(BackendCommand::EditTodo { id: id.clone() })
            .await
            .expect("send");
        let state = wait_for_state(&ui_rx, |state| state.editing.is_some()).await;
        assert_eq!(
            state.editing.map(|cursor| cursor.buffer).as_deref(),
            Some("Buy milk")
        );

        cmd_tx
            .send(BackendCommand::SaveEdit {
                title: "Buy oat milk".to_string(),
            })
            .await
            .expect("send");
        let state = wait_for_state(&ui_rx, |state| {
            state.items.first().map(|item| item.title.as_str()) == Some("Buy oat milk")
        })
        .await;
        assert!(state.editing.is_none());

        cmd_tx.send(BackendCommand::DeleteTodo { id }).await.expect("send");
        wait_for_state(&ui_rx, |state| state.items.is_empty()).await;

        cmd_tx.send(BackendCommand::Shutdown).await.expect("send");
    };

    tokio::join!(run(controller, cmd_rx, ui_tx), driver);
    assert_eq!(auth.hub.listener_count(), 0);
}

#[tokio::test]
async fn accepted_draft_is_announced() {
    let Harness { controller, .. } = harness(FakeAuth::default());
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (ui_tx, ui_rx) = bounded(256);

    let driver = async {
        cmd_tx
            .send(BackendCommand::SignIn {
                email: EMAIL.to_string(),
                password: PASSWORD.to_string(),
            })
            .await
            .expect("send");
        wait_for_state(&ui_rx, ViewState::is_signed_in).await;

        cmd_tx
            .send(BackendCommand::AddTodo {
                title: "   ".to_string(),
            })
            .await
            .expect("send");
        cmd_tx
            .send(BackendCommand::AddTodo {
                title: "Walk dog".to_string(),
            })
            .await
            .expect("send");
        cmd_tx.send(BackendCommand::Shutdown).await.expect("send");
    };

    tokio::join!(run(controller, cmd_rx, ui_tx), driver);

    let accepted = ui_rx
        .try_iter()
        .filter(|event| matches!(event, UiEvent::DraftAccepted))
        .count();
    assert_eq!(accepted, 1);
}

#[tokio::test]
async fn rejected_sign_in_alert_is_published_once() {
    let Harness { controller, .. } = harness(FakeAuth::default());
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (ui_tx, ui_rx) = bounded(256);

    let driver = async {
        cmd_tx
            .send(BackendCommand::SignIn {
                email: EMAIL.to_string(),
                password: "wrong".to_string(),
            })
            .await
            .expect("send");
        let state = wait_for_state(&ui_rx, |state| state.alert.is_some()).await;
        assert_eq!(state.alert.as_deref(), Some("Invalid login credentials"));
        assert!(!state.is_signed_in());

        cmd_tx.send(BackendCommand::Refresh).await.expect("send");
        cmd_tx.send(BackendCommand::Shutdown).await.expect("send");
    };

    tokio::join!(run(controller, cmd_rx, ui_tx), driver);

    let later_alerts = ui_rx
        .try_iter()
        .filter(|event| matches!(event, UiEvent::StateChanged(state) if state.alert.is_some()))
        .count();
    assert_eq!(later_alerts, 0);
}

#[tokio::test]
async fn existing_session_is_published_on_start() {
    let auth = FakeAuth::default();
    *auth.current.lock().expect("current") = Some(ada_session());
    let Harness { auth, controller } = harness(auth);
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (ui_tx, ui_rx) = bounded(256);
    drop(cmd_tx);

    run(controller, cmd_rx, ui_tx).await;

    let first = ui_rx
        .try_iter()
        .find_map(|event| match event {
            UiEvent::StateChanged(state) => Some(state),
            _ => None,
        })
        .expect("snapshot");
    assert_eq!(first.session.map(|session| session.user_id()), Some(ada()));
    assert_eq!(auth.hub.listener_count(), 0);
}
