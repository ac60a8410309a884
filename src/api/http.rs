use super::{ChatReply, ChatRequest, Document, RagBackend, TransportError};
use crate::documents::PdfFile;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Upload replies come either as the bare document or wrapped in the
/// server's `{success, message, document}` envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum UploadReply {
    Envelope {
        success: bool,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        document: Option<Document>,
    },
    Bare(Document),
}

/// [`RagBackend`] over the REST API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    server_url: String,
}

impl HttpBackend {
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            server_url: server_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api{}", self.server_url, path)
    }
}

/// Turn a non-success response into [`TransportError::Api`], keeping the
/// server's `message` field when the body is JSON.
async fn check_status(resp: Response) -> Result<Response, TransportError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(text);
    Err(TransportError::Api { status, message })
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, TransportError> {
    let body = resp.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| TransportError::Parse(e.to_string()))
}

#[async_trait]
impl RagBackend for HttpBackend {
    async fn upload_document(&self, file: PdfFile) -> Result<Document, TransportError> {
        let (name, bytes) = file.into_parts();
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(name)
            .mime_str(PdfFile::MIME)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .client
            .post(self.endpoint("/documents"))
            .multipart(form)
            .send()
            .await?;
        let resp = check_status(resp).await?;

        match decode::<UploadReply>(resp).await? {
            UploadReply::Bare(doc) => Ok(doc),
            UploadReply::Envelope {
                success: true,
                document: Some(doc),
                ..
            } => Ok(doc),
            UploadReply::Envelope { success: true, .. } => Err(TransportError::Parse(
                "upload reply has no document".to_string(),
            )),
            UploadReply::Envelope { message, .. } => {
                Err(TransportError::Rejected(message.unwrap_or_default()))
            }
        }
    }

    async fn list_documents(&self) -> Result<Vec<Document>, TransportError> {
        let resp = self.client.get(self.endpoint("/documents")).send().await?;
        decode(check_status(resp).await?).await
    }

    async fn delete_document(&self, id: &str) -> Result<(), TransportError> {
        let path = format!("/documents/{}", urlencoding::encode(id));
        let resp = self.client.delete(self.endpoint(&path)).send().await?;
        // The ack body ("deleted" or "not found") carries nothing we act on.
        check_status(resp).await?;
        Ok(())
    }

    async fn send_chat_message(&self, query: &str) -> Result<ChatReply, TransportError> {
        let resp = self
            .client
            .post(self.endpoint("/chat"))
            .json(&ChatRequest { query })
            .send()
            .await?;
        let reply: ChatReply = decode(check_status(resp).await?).await?;

        if reply.success == Some(false) {
            return Err(TransportError::Rejected(reply.message));
        }
        Ok(reply)
    }
}
