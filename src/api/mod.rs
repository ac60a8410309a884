pub mod http;

use crate::documents::PdfFile;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use http::HttpBackend;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub name: String,
    pub upload_date: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// A citation attached to an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(alias = "filename")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.page {
            Some(page) => write!(f, "{} p.{}", self.title, page),
            None => f.write_str(&self.title),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub query: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
    /// Epoch milliseconds, assigned by the server.
    pub timestamp: i64,
    #[serde(default)]
    pub sources: Option<Vec<Source>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

/// The four remote operations the client depends on. Each call is a single
/// round trip with no retry.
#[async_trait]
pub trait RagBackend: Send + Sync {
    async fn upload_document(&self, file: PdfFile) -> Result<Document, TransportError>;

    /// Full current set, in server order.
    async fn list_documents(&self) -> Result<Vec<Document>, TransportError>;

    /// Deleting an already-missing document is not an error to callers.
    async fn delete_document(&self, id: &str) -> Result<(), TransportError>;

    async fn send_chat_message(&self, query: &str) -> Result<ChatReply, TransportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Request rejected: {0}")]
    Rejected(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

impl TransportError {
    /// Message text the server sent along with the failure, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            TransportError::Api { message, .. } | TransportError::Rejected(message)
                if !message.trim().is_empty() =>
            {
                Some(message)
            }
            _ => None,
        }
    }

    /// The server's message when it sent one, else `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }
}

impl Serialize for TransportError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_accepts_filename_alias_and_displays_page() {
        let source: Source = serde_json::from_str(r#"{"filename":"paper.pdf","page":3}"#).unwrap();
        assert_eq!(source.title, "paper.pdf");
        assert_eq!(source.to_string(), "paper.pdf p.3");

        let source: Source = serde_json::from_str(r#"{"title":"notes.pdf"}"#).unwrap();
        assert_eq!(source.to_string(), "notes.pdf");
    }

    #[test]
    fn document_uses_server_field_names() {
        let doc: Document = serde_json::from_str(
            r#"{"id":"42","name":"a.pdf","type":"application/pdf","size":10,"uploadDate":"2024-05-01T10:00:00"}"#,
        )
        .unwrap();
        assert_eq!(doc.upload_date, "2024-05-01T10:00:00");
        assert_eq!(doc.content_type.as_deref(), Some("application/pdf"));

        let minimal: Document =
            serde_json::from_str(r#"{"id":"1","name":"b.pdf","uploadDate":"x"}"#).unwrap();
        assert_eq!(minimal.size, None);
    }

    #[test]
    fn user_message_prefers_server_text() {
        let err = TransportError::Api {
            status: 400,
            message: "Only PDF files are supported".into(),
        };
        assert_eq!(err.user_message("Error uploading document"), "Only PDF files are supported");

        let blank = TransportError::Api {
            status: 502,
            message: "  ".into(),
        };
        assert_eq!(blank.user_message("Error uploading document"), "Error uploading document");
        assert_eq!(TransportError::Parse("eof".into()).server_message(), None);
    }
}
