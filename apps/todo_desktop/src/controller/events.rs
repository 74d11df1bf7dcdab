//! Backend to UI events.

use client_core::ViewState;

pub enum UiEvent {
    Info(String),
    /// Fresh snapshot after every handled command or session change. Carries
    /// any pending alert exactly once.
    StateChanged(ViewState),
    /// The draft title was stored; the add form may clear.
    DraftAccepted,
    BackendUnavailable(String),
}
