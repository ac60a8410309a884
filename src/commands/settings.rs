use crate::config::SETTING_KEYS;
use crate::db::Database;
use crate::theme::{Theme, ThemeSlot};
use std::collections::HashMap;
use tauri::{Runtime, State, Window};

fn prefers_dark<R: Runtime>(window: &Window<R>) -> bool {
    window
        .theme()
        .map(|t| matches!(t, tauri::Theme::Dark))
        .unwrap_or(false)
}

#[tauri::command]
pub fn get_settings(db: State<'_, Database>) -> Result<HashMap<String, String>, String> {
    let mut map = HashMap::new();
    for key in SETTING_KEYS {
        if let Some(value) = db.get_setting(key).map_err(|e| e.to_string())? {
            map.insert(key.to_string(), value);
        }
    }
    Ok(map)
}

/// Takes effect the next time the session starts.
#[tauri::command]
pub fn set_setting(db: State<'_, Database>, key: String, value: String) -> Result<(), String> {
    if !SETTING_KEYS.contains(&key.as_str()) {
        return Err(format!("Unknown setting key: {}", key));
    }
    db.set_setting(&key, &value).map_err(|e| e.to_string())
}

#[tauri::command]
pub fn get_theme<R: Runtime>(
    window: Window<R>,
    db: State<'_, Database>,
    theme: State<'_, ThemeSlot>,
) -> Result<Theme, String> {
    theme
        .get(&db, || prefers_dark(&window))
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub fn toggle_theme<R: Runtime>(
    window: Window<R>,
    db: State<'_, Database>,
    theme: State<'_, ThemeSlot>,
) -> Result<Theme, String> {
    theme
        .toggle(&db, || prefers_dark(&window))
        .map_err(|e| e.to_string())
}
