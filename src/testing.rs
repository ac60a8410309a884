//! Scripted in-memory backend for unit tests.

use crate::api::{ChatReply, Document, RagBackend, TransportError};
use crate::documents::PdfFile;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Upload(String),
    List,
    Delete(String),
    Chat(String),
}

type Script<T> = Mutex<VecDeque<(Duration, Result<T, TransportError>)>>;

/// Each operation pops its next scripted `(delay, result)` at call time and
/// resolves after the delay. Unscripted calls succeed immediately with an
/// empty or echo value, except chat which fails.
#[derive(Default)]
pub struct FakeBackend {
    uploads: Script<Document>,
    lists: Script<Vec<Document>>,
    deletes: Script<()>,
    chats: Script<ChatReply>,
    calls: Mutex<Vec<Call>>,
}

impl FakeBackend {
    pub fn script_upload(&self, delay: Duration, result: Result<Document, TransportError>) {
        self.uploads.lock().unwrap().push_back((delay, result));
    }

    pub fn script_list(&self, delay: Duration, result: Result<Vec<Document>, TransportError>) {
        self.lists.lock().unwrap().push_back((delay, result));
    }

    pub fn script_delete(&self, delay: Duration, result: Result<(), TransportError>) {
        self.deletes.lock().unwrap().push_back((delay, result));
    }

    pub fn script_chat(&self, delay: Duration, result: Result<ChatReply, TransportError>) {
        self.chats.lock().unwrap().push_back((delay, result));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.calls().iter().filter(|c| **c == Call::List).count()
    }

    pub fn chat_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Chat(_)))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

async fn resolve<T>(
    script: &Script<T>,
    fallback: impl FnOnce() -> Result<T, TransportError>,
) -> Result<T, TransportError> {
    let next = script.lock().unwrap().pop_front();
    match next {
        Some((delay, result)) => {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result
        }
        None => fallback(),
    }
}

#[async_trait]
impl RagBackend for FakeBackend {
    async fn upload_document(&self, file: PdfFile) -> Result<Document, TransportError> {
        let name = file.name().to_string();
        self.record(Call::Upload(name.clone()));
        resolve(&self.uploads, || Ok(doc("uploaded", &name))).await
    }

    async fn list_documents(&self) -> Result<Vec<Document>, TransportError> {
        self.record(Call::List);
        resolve(&self.lists, || Ok(Vec::new())).await
    }

    async fn delete_document(&self, id: &str) -> Result<(), TransportError> {
        self.record(Call::Delete(id.to_string()));
        resolve(&self.deletes, || Ok(())).await
    }

    async fn send_chat_message(&self, query: &str) -> Result<ChatReply, TransportError> {
        self.record(Call::Chat(query.to_string()));
        resolve(&self.chats, || Err(server_error("no scripted reply"))).await
    }
}

pub fn doc(id: &str, name: &str) -> Document {
    Document {
        id: id.to_string(),
        name: name.to_string(),
        upload_date: "2024-05-01T10:00:00".to_string(),
        content_type: Some("application/pdf".to_string()),
        size: None,
    }
}

pub fn server_error(message: &str) -> TransportError {
    TransportError::Api {
        status: 500,
        message: message.to_string(),
    }
}

pub fn reply(message: &str, timestamp: i64) -> ChatReply {
    ChatReply {
        message: message.to_string(),
        timestamp,
        sources: None,
        success: None,
    }
}
