use crate::api::Document;
use crate::documents::{DocumentSet, FileCandidate};
use crate::session::Session;
use std::path::PathBuf;
use tauri::{AppHandle, Runtime, State};
use tauri_plugin_dialog::DialogExt;
use tokio::sync::oneshot;

#[tauri::command]
pub fn document_set(session: State<'_, Session>) -> DocumentSet {
    session.documents.snapshot()
}

#[tauri::command]
pub async fn refresh_documents(session: State<'_, Session>) -> Result<DocumentSet, String> {
    session.documents.refresh().await;
    Ok(session.documents.snapshot())
}

#[tauri::command]
pub async fn delete_document(session: State<'_, Session>, id: String) -> Result<(), String> {
    session.documents.delete(&id).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn upload_document(
    session: State<'_, Session>,
    file_path: String,
) -> Result<Document, String> {
    let candidate = FileCandidate::from_path(&PathBuf::from(file_path))
        .await
        .map_err(|e| e.to_string())?;
    session
        .uploader
        .upload(candidate)
        .await
        .map_err(|e| e.to_string())
}

/// Let the user pick a PDF with the native dialog and upload it. Resolves to
/// `None` when the dialog is dismissed.
#[tauri::command]
pub async fn pick_and_upload<R: Runtime>(
    app: AppHandle<R>,
    session: State<'_, Session>,
) -> Result<Option<Document>, String> {
    let (tx, rx) = oneshot::channel();
    app.dialog()
        .file()
        .add_filter("PDF", &["pdf"])
        .pick_file(move |picked| {
            let _ = tx.send(picked);
        });

    let Some(picked) = rx.await.map_err(|e| e.to_string())? else {
        return Ok(None);
    };
    let path = picked
        .as_path()
        .ok_or("Selected file is not a local path")?
        .to_path_buf();
    let candidate = FileCandidate::from_path(&path)
        .await
        .map_err(|e| e.to_string())?;
    session
        .uploader
        .upload(candidate)
        .await
        .map(Some)
        .map_err(|e| e.to_string())
}
