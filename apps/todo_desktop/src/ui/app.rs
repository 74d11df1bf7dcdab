use std::time::Duration;

use client_core::{controller::is_blank, ViewState};
use crossbeam_channel::Receiver;
use eframe::egui;
use shared::domain::TodoId;
use tokio::sync::mpsc::Sender;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;
use crate::controller::orchestration::dispatch_backend_command;

pub const APP_TITLE: &str = "Todo";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ListAction {
    Edit(TodoId),
    Save,
    Cancel,
    Delete(TodoId),
}

pub struct TodoApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    view: ViewState,
    email: String,
    password: String,
    draft_title: String,
    edit_buffer: String,
    alert: Option<String>,
    status: String,
}

impl TodoApp {
    pub fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            view: ViewState::default(),
            email: String::new(),
            password: String::new(),
            draft_title: String::new(),
            edit_buffer: String::new(),
            alert: None,
            status: "Starting...".to_string(),
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::StateChanged(mut state) => {
                    if let Some(alert) = state.alert.take() {
                        self.alert = Some(alert);
                    }
                    let editing_changed = state.editing.as_ref().map(|cursor| &cursor.id)
                        != self.view.editing.as_ref().map(|cursor| &cursor.id);
                    if editing_changed {
                        self.edit_buffer = state
                            .editing
                            .as_ref()
                            .map(|cursor| cursor.buffer.clone())
                            .unwrap_or_default();
                    }
                    if state.is_signed_in() && !self.view.is_signed_in() {
                        self.password.clear();
                    }
                    if !state.is_signed_in() {
                        self.draft_title.clear();
                    }
                    self.view = state;
                }
                UiEvent::DraftAccepted => {
                    self.draft_title.clear();
                }
                UiEvent::BackendUnavailable(message) => {
                    tracing::error!("{message}");
                    self.alert = Some(message.clone());
                    self.status = message;
                }
            }
        }
    }

    fn dispatch(&mut self, cmd: BackendCommand) {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status);
    }

    fn submit_sign_in(&mut self) {
        if is_blank(&self.email) || self.password.is_empty() {
            self.status = "Email and password are required".to_string();
            return;
        }
        self.dispatch(BackendCommand::SignIn {
            email: self.email.trim().to_string(),
            password: self.password.clone(),
        });
    }

    fn submit_draft(&mut self) {
        if is_blank(&self.draft_title) {
            return;
        }
        self.dispatch(BackendCommand::AddTodo {
            title: self.draft_title.clone(),
        });
    }

    fn apply_list_action(&mut self, action: ListAction) {
        match action {
            ListAction::Edit(id) => self.dispatch(BackendCommand::EditTodo { id }),
            ListAction::Save => {
                if is_blank(&self.edit_buffer) {
                    return;
                }
                self.dispatch(BackendCommand::SaveEdit {
                    title: self.edit_buffer.clone(),
                });
            }
            ListAction::Cancel => self.dispatch(BackendCommand::CancelEdit),
            ListAction::Delete(id) => self.dispatch(BackendCommand::DeleteTodo { id }),
        }
    }

    fn show_alert(&mut self, ctx: &egui::Context) {
        let Some(message) = self.alert.clone() else {
            return;
        };
        let mut dismissed = false;
        egui::Window::new("Notice")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(message);
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.alert = None;
        }
    }

    fn show_sign_in(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space((ui.available_height() * 0.2).clamp(18.0, 120.0));
            ui.vertical_centered(|ui| {
                ui.set_width(ui.available_width().clamp(280.0, 360.0));
                ui.heading("Sign In");
                ui.add_space(12.0);

                ui.add(
                    egui::TextEdit::singleline(&mut self.email)
                        .hint_text("Email")
                        .desired_width(f32::INFINITY),
                );
                let password_resp = ui.add(
                    egui::TextEdit::singleline(&mut self.password)
                        .hint_text("Password")
                        .password(true)
                        .desired_width(f32::INFINITY),
                );
                let enter_pressed = password_resp.lost_focus()
                    && ui.input(|input| input.key_pressed(egui::Key::Enter));

                ui.add_space(8.0);
                let ready = !is_blank(&self.email) && !self.password.is_empty();
                let clicked = ui
                    .add_enabled(ready, egui::Button::new("Sign In"))
                    .clicked();
                if clicked || enter_pressed {
                    self.submit_sign_in();
                }

                ui.add_space(12.0);
                ui.weak(self.status.as_str());
            });
        });
    }

    fn show_todos(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let email = self
                    .view
                    .session
                    .as_ref()
                    .map(|session| session.email().to_string())
                    .unwrap_or_default();
                ui.heading(format!("Welcome, {email}"));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Sign Out").clicked() {
                        self.dispatch(BackendCommand::SignOut);
                    }
                    if ui.button("Refresh").clicked() {
                        self.dispatch(BackendCommand::Refresh);
                    }
                });
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.weak(self.status.as_str());
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                let field_width = ui.available_width() - 60.0;
                let draft_resp = ui.add(
                    egui::TextEdit::singleline(&mut self.draft_title)
                        .hint_text("What needs to be done?")
                        .desired_width(field_width),
                );
                let enter_pressed = draft_resp.lost_focus()
                    && ui.input(|input| input.key_pressed(egui::Key::Enter));
                let clicked = ui
                    .add_enabled(!is_blank(&self.draft_title), egui::Button::new("Add"))
                    .clicked();
                if clicked || enter_pressed {
                    self.submit_draft();
                }
            });
            ui.separator();

            let mut actions = Vec::new();
            let editing_id = self.view.editing.as_ref().map(|cursor| &cursor.id);
            let items = &self.view.items;
            let edit_buffer = &mut self.edit_buffer;
            egui::ScrollArea::vertical().show(ui, |ui| {
                if items.is_empty() {
                    ui.weak("Nothing to do.");
                }
                for item in items {
                    ui.horizontal(|ui| {
                        if editing_id == Some(&item.id) {
                            let field_width = ui.available_width() - 120.0;
                            let resp = ui.add(
                                egui::TextEdit::singleline(edit_buffer)
                                    .desired_width(field_width),
                            );
                            if resp.lost_focus()
                                && ui.input(|input| input.key_pressed(egui::Key::Enter))
                            {
                                actions.push(ListAction::Save);
                            }
                            if ui.button("Save").clicked() {
                                actions.push(ListAction::Save);
                            }
                            if ui.button("Cancel").clicked() {
                                actions.push(ListAction::Cancel);
                            }
                        } else {
                            ui.label(item.title.as_str());
                            ui.with_layout(
                                egui::Layout::right_to_left(egui::Align::Center),
                                |ui| {
                                    if ui.button("🗑").on_hover_text("Delete").clicked() {
                                        actions.push(ListAction::Delete(item.id.clone()));
                                    }
                                    if ui.button("✏").on_hover_text("Edit").clicked() {
                                        actions.push(ListAction::Edit(item.id.clone()));
                                    }
                                },
                            );
                        }
                    });
                }
            });

            for action in actions {
                self.apply_list_action(action);
            }
        });
    }
}

impl eframe::App for TodoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        if self.view.is_signed_in() {
            self.show_todos(ctx);
        } else {
            self.show_sign_in(ctx);
        }
        self.show_alert(ctx);

        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

#[cfg(test)]
#[path = "tests/app_tests.rs"]
mod tests;
