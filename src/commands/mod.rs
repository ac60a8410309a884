//! Tauri plugin exposing a [`Session`] to the webview.
//!
//! Register it with `.plugin(docchat_lib::init())`; the host app must also
//! register `tauri_plugin_dialog` for `pick_and_upload`. State changes are
//! pushed to the frontend as events so it never has to poll.

mod chat;
mod documents;
mod settings;

use crate::config::ClientConfig;
use crate::db::Database;
use crate::session::Session;
use crate::theme::ThemeSlot;
use serde::Serialize;
use tauri::plugin::{Builder, TauriPlugin};
use tauri::{AppHandle, Emitter, Manager, RunEvent, Runtime};
use tokio::sync::watch;

pub const CHAT_EVENT: &str = "docchat://chat";
pub const DOCUMENTS_EVENT: &str = "docchat://documents";
pub const UPLOAD_EVENT: &str = "docchat://upload";
pub const COPIED_EVENT: &str = "docchat://copied";

pub fn init<R: Runtime>() -> TauriPlugin<R> {
    Builder::new("docchat")
        .invoke_handler(tauri::generate_handler![
            chat::submit_query,
            chat::set_input,
            chat::apply_suggestion,
            chat::chat_view,
            chat::copy_message,
            documents::document_set,
            documents::refresh_documents,
            documents::delete_document,
            documents::upload_document,
            documents::pick_and_upload,
            settings::get_settings,
            settings::set_setting,
            settings::get_theme,
            settings::toggle_theme,
        ])
        .setup(|app, _api| {
            let app_dir = app.path().app_data_dir()?;
            let database = Database::new(&app_dir)?;
            // Windows do not exist yet; the theme is resolved on first `get_theme`.
            let config = ClientConfig::from_settings(&database, false)?;

            // The session spawns its background tasks on Tauri's runtime.
            let session =
                tauri::async_runtime::block_on(async { Session::connect(&config) })?;

            forward(app, session.chat.subscribe(), CHAT_EVENT);
            forward(app, session.documents.subscribe(), DOCUMENTS_EVENT);
            forward(app, session.uploader.subscribe(), UPLOAD_EVENT);
            forward(app, session.chat.subscribe_copied(), COPIED_EVENT);

            app.manage(ThemeSlot::default());
            app.manage(database);
            app.manage(session);
            Ok(())
        })
        .on_event(|app, event| {
            if let RunEvent::Exit = event {
                if let Some(session) = app.try_state::<Session>() {
                    session.close();
                }
            }
        })
        .build()
}

fn forward<R, T>(app: &AppHandle<R>, mut rx: watch::Receiver<T>, event: &'static str)
where
    R: Runtime,
    T: Clone + Serialize + Send + Sync + 'static,
{
    let app = app.clone();
    tauri::async_runtime::spawn(async move {
        while rx.changed().await.is_ok() {
            let payload = rx.borrow_and_update().clone();
            if let Err(e) = app.emit(event, payload) {
                log::warn!("[commands] failed to emit {}: {}", event, e);
            }
        }
    });
}

/// Log to the app's log directory. Hosts register it next to [`init`].
pub fn log_plugin<R: Runtime>() -> TauriPlugin<R> {
    tauri_plugin_log::Builder::new()
        .target(tauri_plugin_log::Target::new(
            tauri_plugin_log::TargetKind::LogDir {
                file_name: Some("docchat.log".into()),
            },
        ))
        .level(log::LevelFilter::Info)
        .build()
}
