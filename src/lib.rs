pub mod api;
pub mod chat;
pub mod config;
pub mod db;
pub mod documents;
pub mod session;
pub mod theme;

#[cfg(feature = "desktop")]
mod commands;
#[cfg(test)]
mod testing;

pub use api::{ChatReply, Document, HttpBackend, RagBackend, Source, TransportError};
pub use chat::{ChatController, ChatView, Message, Role, SubmitOutcome};
pub use config::ClientConfig;
pub use documents::{DocumentSet, DocumentStore, FileCandidate, Invalidator, Uploader};
pub use session::Session;
pub use theme::Theme;

#[cfg(feature = "desktop")]
pub use commands::{init, log_plugin};
