use crate::db::Database;
use crate::theme::{self, Theme};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

/// Settings keys the client understands.
pub const SETTING_KEYS: &[&str] = &[
    "server_url",
    "request_timeout_secs",
    "typing_delay_ms",
    "copy_ack_ms",
    theme::THEME_KEY,
];

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the answering service; endpoints live under `/api`.
    pub server_url: String,
    pub request_timeout: Duration,
    /// How long a chat request may run before the typing indicator shows.
    pub typing_delay: Duration,
    /// How long a "copied" acknowledgment stays up.
    pub copy_ack: Duration,
    pub theme: Theme,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout: Duration::from_secs(120),
            typing_delay: Duration::from_millis(500),
            copy_ack: Duration::from_millis(2000),
            theme: Theme::Light,
        }
    }
}

impl ClientConfig {
    /// Resolve the configuration from the settings table, falling back to the
    /// defaults for anything unset or unparsable.
    pub fn from_settings(db: &Database, system_prefers_dark: bool) -> rusqlite::Result<Self> {
        let defaults = Self::default();

        let server_url = db
            .get_setting("server_url")?
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(defaults.server_url);
        let request_timeout = numeric_setting(db, "request_timeout_secs")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);
        let typing_delay = numeric_setting(db, "typing_delay_ms")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.typing_delay);
        let copy_ack = numeric_setting(db, "copy_ack_ms")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.copy_ack);
        let theme = theme::load_theme(db, system_prefers_dark)?;

        Ok(Self {
            server_url,
            request_timeout,
            typing_delay,
            copy_ack,
            theme,
        })
    }
}

fn numeric_setting<T: FromStr>(db: &Database, key: &str) -> rusqlite::Result<Option<T>> {
    let Some(raw) = db.get_setting(key)? else {
        return Ok(None);
    };
    match raw.trim().parse() {
        Ok(value) => Ok(Some(value)),
        Err(_) => {
            log::warn!("[config] ignoring invalid value for {}: {:?}", key, raw);
            Ok(None)
        }
    }
}
