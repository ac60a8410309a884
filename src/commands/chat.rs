use crate::chat::{ChatView, SubmitOutcome};
use crate::session::Session;
use tauri::State;

#[tauri::command]
pub async fn submit_query(
    session: State<'_, Session>,
    query: String,
) -> Result<SubmitOutcome, String> {
    Ok(session.chat.submit(&query).await)
}

#[tauri::command]
pub fn set_input(session: State<'_, Session>, text: String) {
    session.chat.set_input(&text);
}

#[tauri::command]
pub fn apply_suggestion(session: State<'_, Session>, index: usize) -> Option<String> {
    session.chat.apply_suggestion(index).map(str::to_string)
}

#[tauri::command]
pub fn chat_view(session: State<'_, Session>) -> ChatView {
    session.chat.snapshot()
}

/// Returns the text to put on the clipboard; the frontend owns the clipboard.
#[tauri::command]
pub fn copy_message(session: State<'_, Session>, index: usize) -> Option<String> {
    session.chat.copy_message(index)
}
