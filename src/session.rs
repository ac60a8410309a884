use crate::api::{HttpBackend, RagBackend, TransportError};
use crate::chat::ChatController;
use crate::config::ClientConfig;
use crate::documents::{DocumentStore, Invalidator, Uploader};
use std::sync::Arc;

/// Everything one client window needs: a conversation, the document list and
/// an uploader feeding it, all talking to the same backend.
pub struct Session {
    pub chat: ChatController,
    pub documents: DocumentStore,
    pub uploader: Uploader,
}

impl Session {
    /// Wire up the components. The document store starts its first fetch
    /// right away, so this must run inside a tokio runtime.
    pub fn start(config: &ClientConfig, backend: Arc<dyn RagBackend>) -> Self {
        let invalidator = Invalidator::new();
        let documents = DocumentStore::mount(backend.clone(), invalidator.clone());
        let uploader = Uploader::new(backend.clone(), invalidator);
        let chat = ChatController::new(backend, config.typing_delay, config.copy_ack);
        log::info!("[session] started against {}", config.server_url);
        Self {
            chat,
            documents,
            uploader,
        }
    }

    pub fn connect(config: &ClientConfig) -> Result<Self, TransportError> {
        let backend = HttpBackend::new(&config.server_url, config.request_timeout)?;
        Ok(Self::start(config, Arc::new(backend)))
    }

    pub fn close(&self) {
        self.chat.unmount();
        self.documents.unmount();
        log::info!("[session] closed");
    }
}
