//! Runtime bridge between the UI command queue and the controller.

use std::thread::{self, JoinHandle};

use client_core::{HostedClient, HostedConfig, TodoController};
use crossbeam_channel::Sender;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{backend_bridge::commands::BackendCommand, controller::events::UiEvent};

pub fn launch(
    config: HostedConfig,
    cmd_rx: mpsc::Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::BackendUnavailable(format!(
                    "backend worker startup failure: failed to build runtime: {err}"
                )));
                error!("failed to build backend runtime: {err}");
                return;
            }
        };

        let client = HostedClient::new(config);
        let controller = TodoController::new(client.auth, client.todos);
        runtime.block_on(run(controller, cmd_rx, ui_tx));
    })
}

/// Serves commands until `Shutdown` arrives or every sender is gone, applying
/// session changes between commands. The session subscription is released on
/// the way out.
pub async fn run(
    mut controller: TodoController,
    mut cmd_rx: mpsc::Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) {
    controller.start().await;
    publish(&mut controller, &ui_tx);
    let _ = ui_tx.try_send(UiEvent::Info("Ready".to_string()));

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    debug!("ui command queue closed");
                    break;
                };
                if matches!(cmd, BackendCommand::Shutdown) {
                    break;
                }
                execute(&mut controller, cmd, &ui_tx).await;
            }
            Some(change) = controller.next_auth_change() => {
                controller.apply_auth_change(change).await;
            }
        }
        publish(&mut controller, &ui_tx);
    }

    controller.teardown();
    info!("backend worker stopped");
}

async fn execute(controller: &mut TodoController, cmd: BackendCommand, ui_tx: &Sender<UiEvent>) {
    let name = cmd.name();
    let result = match cmd {
        BackendCommand::SignIn { email, password } => controller.sign_in(&email, &password).await,
        BackendCommand::SignOut => controller.sign_out().await,
        BackendCommand::Refresh => controller.fetch().await,
        BackendCommand::AddTodo { title } => {
            let result = controller.add(&title).await;
            if result.is_ok() {
                let _ = ui_tx.try_send(UiEvent::DraftAccepted);
            }
            result
        }
        BackendCommand::EditTodo { id } => {
            controller.edit(id);
            Ok(())
        }
        BackendCommand::CancelEdit => {
            controller.cancel_edit();
            Ok(())
        }
        BackendCommand::SaveEdit { title } => {
            controller.set_edit_buffer(title);
            controller.save().await
        }
        BackendCommand::DeleteTodo { id } => controller.remove(id).await,
        BackendCommand::Shutdown => Ok(()),
    };

    if let Err(err) = result {
        debug!(command = name, "command finished with error: {err}");
    }
}

fn publish(controller: &mut TodoController, ui_tx: &Sender<UiEvent>) {
    let snapshot = controller.state().clone();
    if ui_tx.try_send(UiEvent::StateChanged(snapshot)).is_ok() {
        controller.take_alert();
    } else {
        warn!("ui event queue unavailable; state update dropped");
    }
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
