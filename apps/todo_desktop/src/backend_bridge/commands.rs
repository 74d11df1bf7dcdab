//! Backend commands queued from UI to backend worker.

use shared::domain::TodoId;

pub enum BackendCommand {
    SignIn { email: String, password: String },
    SignOut,
    Refresh,
    AddTodo { title: String },
    EditTodo { id: TodoId },
    CancelEdit,
    SaveEdit { title: String },
    DeleteTodo { id: TodoId },
    Shutdown,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SignIn { .. } => "sign_in",
            Self::SignOut => "sign_out",
            Self::Refresh => "refresh",
            Self::AddTodo { .. } => "add_todo",
            Self::EditTodo { .. } => "edit_todo",
            Self::CancelEdit => "cancel_edit",
            Self::SaveEdit { .. } => "save_edit",
            Self::DeleteTodo { .. } => "delete_todo",
            Self::Shutdown => "shutdown",
        }
    }
}
