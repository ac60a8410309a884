use crate::db::Database;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    /// A stored preference wins; otherwise follow the system setting.
    pub fn resolve(saved: Option<&str>, system_prefers_dark: bool) -> Self {
        match saved.and_then(Theme::parse) {
            Some(theme) => theme,
            None if system_prefers_dark => Theme::Dark,
            None => Theme::Light,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

pub fn load_theme(db: &Database, system_prefers_dark: bool) -> rusqlite::Result<Theme> {
    let saved = db.get_setting(THEME_KEY)?;
    Ok(Theme::resolve(saved.as_deref(), system_prefers_dark))
}

/// Flip `current` and persist the result.
pub fn toggle_theme(db: &Database, current: Theme) -> rusqlite::Result<Theme> {
    let next = current.toggled();
    db.set_setting(THEME_KEY, next.as_str())?;
    log::info!("[theme] switched to {}", next.as_str());
    Ok(next)
}

/// The live theme of a window. Resolved on first access, since the system
/// preference is only known once a window exists.
#[derive(Debug, Default)]
pub struct ThemeSlot(Mutex<Option<Theme>>);

impl ThemeSlot {
    pub fn get(
        &self,
        db: &Database,
        system_prefers_dark: impl FnOnce() -> bool,
    ) -> rusqlite::Result<Theme> {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        match *slot {
            Some(theme) => Ok(theme),
            None => {
                let theme = load_theme(db, system_prefers_dark())?;
                *slot = Some(theme);
                Ok(theme)
            }
        }
    }

    pub fn toggle(
        &self,
        db: &Database,
        system_prefers_dark: impl FnOnce() -> bool,
    ) -> rusqlite::Result<Theme> {
        let mut slot = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        let current = match *slot {
            Some(theme) => theme,
            None => load_theme(db, system_prefers_dark())?,
        };
        let next = toggle_theme(db, current)?;
        *slot = Some(next);
        Ok(next)
    }
}
