use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use docchat_lib::api::{Document, HttpBackend, RagBackend, TransportError};
use docchat_lib::chat::{Role, FALLBACK_REPLY};
use docchat_lib::documents::{
    DocumentSet, DocumentStore, FileCandidate, Invalidator, SyncStatus, UploadError,
    UploadStatus, Uploader,
};
use docchat_lib::{ClientConfig, Session};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
struct FakeServer {
    docs: Arc<Mutex<Vec<Document>>>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl FakeServer {
    fn with_docs(docs: Vec<Document>) -> Self {
        let server = Self::default();
        *server.docs.lock().unwrap() = docs;
        server
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/api/documents", get(list_docs).post(upload_doc))
            .route("/api/documents/{id}", delete(delete_doc))
            .route("/api/chat", post(chat))
            .with_state(self.clone())
    }
}

fn doc(id: &str, name: &str) -> Document {
    Document {
        id: id.to_string(),
        name: name.to_string(),
        upload_date: "2024-05-01T10:00:00".to_string(),
        content_type: Some("application/pdf".to_string()),
        size: Some(4),
    }
}

async fn list_docs(State(server): State<FakeServer>) -> Json<Vec<Document>> {
    server.seen.lock().unwrap().push("GET /api/documents".into());
    Json(server.docs.lock().unwrap().clone())
}

async fn upload_doc(
    State(server): State<FakeServer>,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("").to_string();
        let mime = field.content_type().unwrap_or("").to_string();
        let bytes = field.bytes().await.unwrap();
        server
            .seen
            .lock()
            .unwrap()
            .push(format!("POST /api/documents {} {} {}", name, mime, bytes.len()));

        let mut docs = server.docs.lock().unwrap();
        let document = doc(&format!("doc-{}", docs.len() + 1), &name);
        docs.push(document.clone());
        return (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Document uploaded and indexed successfully",
                "document": document,
            })),
        );
    }
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"success": false, "message": "Please select a file to upload"})),
    )
}

async fn delete_doc(State(server): State<FakeServer>, Path(id): Path<String>) -> Json<Value> {
    server.seen.lock().unwrap().push(format!("DELETE {}", id));
    let mut docs = server.docs.lock().unwrap();
    let before = docs.len();
    docs.retain(|d| d.id != id);
    if docs.len() < before {
        Json(json!({"success": true, "message": "Document deleted successfully"}))
    } else {
        Json(json!({"success": false, "message": "Document not found or could not be deleted"}))
    }
}

async fn chat(State(server): State<FakeServer>, Json(body): Json<Value>) -> Json<Value> {
    let query = body["query"].as_str().unwrap_or_default().to_string();
    server.seen.lock().unwrap().push(format!("POST /api/chat {}", query));
    if query == "explode" {
        return Json(json!({
            "message": "An error occurred while processing your request: index offline",
            "success": false,
            "timestamp": 2000,
        }));
    }
    Json(json!({
        "message": "RAG combines retrieval and generation.",
        "timestamp": 1000,
        "sources": [{"filename": "paper.pdf", "page": 3}],
    }))
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn backend(url: &str) -> HttpBackend {
    HttpBackend::new(url, Duration::from_secs(5)).unwrap()
}

async fn wait_for(store: &DocumentStore, pred: impl Fn(&DocumentSet) -> bool) -> DocumentSet {
    let mut rx = store.subscribe();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let set = rx.borrow_and_update();
                if pred(&set) {
                    return set.clone();
                }
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("document set never reached the expected state")
}

#[tokio::test]
async fn list_preserves_server_order() {
    let server = FakeServer::with_docs(vec![doc("b", "b.pdf"), doc("a", "a.pdf")]);
    let url = serve(server.router()).await;

    let docs = backend(&url).list_documents().await.unwrap();
    let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);
}

#[tokio::test]
async fn upload_sends_pdf_part_and_unwraps_envelope() {
    let server = FakeServer::default();
    let url = serve(server.router()).await;

    let file = FileCandidate::new("paper.pdf", "application/pdf", b"%PDF".to_vec())
        .validate()
        .unwrap();
    let document = backend(&url).upload_document(file).await.unwrap();

    assert_eq!(document.id, "doc-1");
    assert_eq!(document.name, "paper.pdf");
    assert_eq!(
        server.seen(),
        vec!["POST /api/documents paper.pdf application/pdf 4"]
    );
}

#[tokio::test]
async fn delete_encodes_id_and_ignores_not_found() {
    let server = FakeServer::with_docs(vec![doc("a b", "a.pdf")]);
    let url = serve(server.router()).await;
    let backend = backend(&url);

    backend.delete_document("a b").await.unwrap();
    backend.delete_document("a b").await.unwrap();

    assert_eq!(server.seen(), vec!["DELETE a b", "DELETE a b"]);
    assert!(server.docs.lock().unwrap().is_empty());
}

#[tokio::test]
async fn chat_reply_carries_sources() {
    let server = FakeServer::default();
    let url = serve(server.router()).await;

    let reply = backend(&url).send_chat_message("What is RAG?").await.unwrap();
    assert_eq!(reply.message, "RAG combines retrieval and generation.");
    assert_eq!(reply.timestamp, 1000);
    let sources = reply.sources.unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].to_string(), "paper.pdf p.3");
    assert_eq!(server.seen(), vec!["POST /api/chat What is RAG?"]);
}

#[tokio::test]
async fn chat_reporting_failure_is_rejected() {
    let url = serve(FakeServer::default().router()).await;

    let err = backend(&url).send_chat_message("explode").await.unwrap_err();
    assert!(matches!(err, TransportError::Rejected(_)));
    assert!(err.server_message().unwrap().contains("index offline"));
}

#[tokio::test]
async fn error_status_keeps_server_message() {
    let router = Router::new()
        .route(
            "/api/documents",
            get(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"success": false, "message": "index offline"})),
                )
            }),
        )
        .route(
            "/api/chat",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream timeout") }),
        );
    let url = serve(router).await;
    let backend = backend(&url);

    match backend.list_documents().await.unwrap_err() {
        TransportError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "index offline");
        }
        other => panic!("unexpected error: {other}"),
    }
    match backend.send_chat_message("hi").await.unwrap_err() {
        TransportError::Api { status, message } => {
            assert_eq!(status, 502);
            assert_eq!(message, "upstream timeout");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn upload_envelope_reporting_failure_is_rejected() {
    let router = Router::new().route(
        "/api/documents",
        post(|| async {
            Json(json!({"success": false, "message": "Error processing PDF: file is encrypted"}))
        }),
    );
    let url = serve(router).await;

    let file = FileCandidate::new("locked.pdf", "application/pdf", b"%PDF".to_vec())
        .validate()
        .unwrap();
    let err = backend(&url).upload_document(file).await.unwrap_err();
    assert!(matches!(err, TransportError::Rejected(_)));

    let invalidator = Invalidator::new();
    let before = invalidator.current();
    let uploader = Uploader::new(Arc::new(backend(&url)), invalidator.clone());
    let err = uploader
        .upload(FileCandidate::new("locked.pdf", "application/pdf", b"%PDF".to_vec()))
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Transport(TransportError::Rejected(_))));
    assert_eq!(
        uploader.status(),
        UploadStatus::Failed {
            message: "Error processing PDF: file is encrypted".to_string()
        }
    );
    assert_eq!(invalidator.current(), before);
}

#[tokio::test]
async fn unreachable_server_falls_back_to_generic_message() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = backend(&url).list_documents().await.unwrap_err();
    assert!(matches!(err, TransportError::Http(_)));
    assert_eq!(err.user_message("Error uploading document"), "Error uploading document");
}

#[tokio::test]
async fn session_tracks_server_set_through_upload_and_delete() {
    let server = FakeServer::with_docs(vec![doc("42", "old.pdf")]);
    let url = serve(server.router()).await;
    let config = ClientConfig {
        server_url: url,
        ..ClientConfig::default()
    };
    let session = Session::connect(&config).unwrap();

    let set = wait_for(&session.documents, |s| {
        s.status == SyncStatus::Idle && s.documents.len() == 1
    })
    .await;
    assert_eq!(set.documents[0].id, "42");

    session
        .uploader
        .upload(FileCandidate::new("new.pdf", "application/pdf", b"%PDF".to_vec()))
        .await
        .unwrap();
    session.documents.delete("42").await.unwrap();

    let set = wait_for(&session.documents, |s| {
        s.status == SyncStatus::Idle && s.documents.iter().all(|d| d.id != "42")
    })
    .await;
    assert_eq!(set.documents, server.docs.lock().unwrap().clone());
    assert_eq!(set.documents[0].name, "new.pdf");

    let outcome = session.chat.submit("What is RAG?").await;
    assert_eq!(outcome, docchat_lib::SubmitOutcome::Answered);
    let messages = session.chat.messages();
    assert_eq!(messages[1].sources[0].to_string(), "paper.pdf p.3");
    session.close();
}

#[tokio::test]
async fn chat_failure_detail_never_reaches_timeline() {
    let server = FakeServer::default();
    let url = serve(server.router()).await;
    let config = ClientConfig {
        server_url: url,
        ..ClientConfig::default()
    };
    let session = Session::connect(&config).unwrap();

    let outcome = session.chat.submit("explode").await;
    assert_eq!(outcome, docchat_lib::SubmitOutcome::Failed);

    let messages = session.chat.messages();
    assert_eq!(messages.len(), 2);
    let last = messages.last().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert!(last.error);
    assert_eq!(last.content, FALLBACK_REPLY);
    assert!(!last.content.contains("index offline"));
    assert!(!session.chat.is_pending());
    session.close();
}
