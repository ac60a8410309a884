use super::Invalidator;
use crate::api::{Document, RagBackend, TransportError};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;

const UPLOAD_FAILED: &str = "Error uploading document";
const UPLOAD_SUCCEEDED: &str = "Document uploaded successfully!";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Only PDF files are accepted.")]
    NotPdf { mime: String },
    #[error("Please select a file to upload")]
    Empty,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Serialize for UploadError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// A file the user picked, not yet checked.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self { name, mime, bytes })
    }

    pub fn validate(self) -> Result<PdfFile, ValidationError> {
        if self.mime != PdfFile::MIME {
            return Err(ValidationError::NotPdf { mime: self.mime });
        }
        if self.bytes.is_empty() {
            return Err(ValidationError::Empty);
        }
        Ok(PdfFile {
            name: self.name,
            bytes: self.bytes,
        })
    }
}

/// A file that passed client-side validation. Only [`FileCandidate::validate`]
/// builds one, so the gateway never sees unchecked content.
#[derive(Debug, Clone)]
pub struct PdfFile {
    name: String,
    bytes: Vec<u8>,
}

impl PdfFile {
    pub const MIME: &'static str = "application/pdf";

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_parts(self) -> (String, Vec<u8>) {
        (self.name, self.bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum UploadStatus {
    Idle,
    Uploading { name: String },
    Succeeded { document: Document, message: String },
    Failed { message: String },
}

/// Sends validated PDFs to the backend and invalidates the document set on
/// success.
#[derive(Clone)]
pub struct Uploader {
    backend: Arc<dyn RagBackend>,
    invalidator: Invalidator,
    status: Arc<watch::Sender<UploadStatus>>,
}

impl Uploader {
    pub fn new(backend: Arc<dyn RagBackend>, invalidator: Invalidator) -> Self {
        let (tx, _) = watch::channel(UploadStatus::Idle);
        Self {
            backend,
            invalidator,
            status: Arc::new(tx),
        }
    }

    pub fn status(&self) -> UploadStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadStatus> {
        self.status.subscribe()
    }

    fn set(&self, status: UploadStatus) {
        self.status.send_replace(status);
    }

    pub async fn upload(&self, candidate: FileCandidate) -> Result<Document, UploadError> {
        let file = match candidate.validate() {
            Ok(file) => file,
            Err(e) => {
                log::warn!("[upload] rejected before sending: {}", e);
                self.set(UploadStatus::Failed {
                    message: e.to_string(),
                });
                return Err(e.into());
            }
        };

        log::info!("[upload] sending {} ({} bytes)", file.name(), file.len());
        self.set(UploadStatus::Uploading {
            name: file.name().to_string(),
        });

        match self.backend.upload_document(file).await {
            Ok(document) => {
                log::info!("[upload] stored {} as {}", document.name, document.id);
                self.set(UploadStatus::Succeeded {
                    document: document.clone(),
                    message: UPLOAD_SUCCEEDED.to_string(),
                });
                self.invalidator.request();
                Ok(document)
            }
            Err(e) => {
                log::error!("[upload] failed: {}", e);
                self.set(UploadStatus::Failed {
                    message: e.user_message(UPLOAD_FAILED),
                });
                Err(e.into())
            }
        }
    }
}
