use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::openai::{OpenAiClient, OpenAiError};

/// Source documents uploaded into the vector store, resolved under the site
/// directory where they are also served statically.
pub const SOURCE_PDFS: &[&str] = &[
    "Artificial Intelligence May Help IRS Close the Tax Gap _ U.S. GAO.pdf",
    // "IRS 2024.pdf" goes here once the document is added.
];

/// Owns the remote vector store identifier for the process. The id lives
/// only in memory; a restart re-creates the store on first use. The mutex
/// is held across the whole check-then-create sequence so concurrent first
/// requests cannot create duplicate stores.
#[derive(Clone)]
pub struct SourceStore {
    client: OpenAiClient,
    name: String,
    site_dir: PathBuf,
    cached_id: Arc<Mutex<Option<String>>>,
}

impl SourceStore {
    pub fn new(
        client: OpenAiClient,
        name: impl Into<String>,
        site_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            name: name.into(),
            site_dir: site_dir.into(),
            cached_id: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the id of a live vector store, creating one and uploading the
    /// source PDFs if no valid cached id exists. A cached id that the
    /// service no longer recognizes is discarded and replaced.
    pub async fn ensure(&self) -> Result<String, OpenAiError> {
        let mut cached = self.cached_id.lock().await;

        if let Some(id) = cached.clone() {
            match self.client.retrieve_vector_store(&id).await {
                Ok(()) => return Ok(id),
                Err(err) => {
                    tracing::warn!("cached vector store {id} no longer valid, recreating: {err}");
                    *cached = None;
                }
            }
        }

        let id = self.client.create_vector_store(&self.name).await?;
        *cached = Some(id.clone());

        self.upload_sources(&id).await;
        Ok(id)
    }

    /// Per-file problems are logged and skipped; a missing or failed source
    /// file never fails provisioning.
    async fn upload_sources(&self, store_id: &str) {
        for pdf in SOURCE_PDFS {
            let path = self.site_dir.join(pdf);
            if !file_exists(&path).await {
                tracing::warn!("PDF file not found: {}", path.display());
                continue;
            }

            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::error!("Error reading {pdf}: {err}");
                    continue;
                }
            };

            match self.client.upload_and_poll(store_id, pdf, bytes).await {
                Ok(_) => tracing::info!("Uploaded {pdf} to vector store"),
                Err(err) => tracing::error!("Error uploading {pdf}: {err}"),
            }
        }
    }
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct Counters {
        creates: AtomicUsize,
        retrieves: AtomicUsize,
        uploads: AtomicUsize,
        retrieve_fails: AtomicUsize,
    }

    fn stub_router(counters: Arc<Counters>) -> Router {
        Router::new()
            .route(
                "/vector_stores",
                post(|State(c): State<Arc<Counters>>| async move {
                    let n = c.creates.fetch_add(1, Ordering::SeqCst) + 1;
                    Json(json!({ "id": format!("vs_{n}") }))
                }),
            )
            .route(
                "/vector_stores/:id",
                get(|State(c): State<Arc<Counters>>| async move {
                    c.retrieves.fetch_add(1, Ordering::SeqCst);
                    if c.retrieve_fails.load(Ordering::SeqCst) > 0 {
                        (
                            StatusCode::NOT_FOUND,
                            Json(json!({ "error": { "message": "not found" } })),
                        )
                            .into_response()
                    } else {
                        Json(json!({ "id": "vs_1" })).into_response()
                    }
                }),
            )
            .route(
                "/files",
                post(|State(c): State<Arc<Counters>>| async move {
                    c.uploads.fetch_add(1, Ordering::SeqCst);
                    Json(json!({ "id": "file_1" }))
                }),
            )
            .route(
                "/vector_stores/:id/files",
                post(|| async { Json(json!({ "id": "file_1", "status": "completed" })) }),
            )
            .with_state(counters)
    }

    async fn spawn_stub(counters: Arc<Counters>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, stub_router(counters)).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn store_for(base_url: &str, site_dir: &Path) -> SourceStore {
        let client = OpenAiClient::new(base_url.to_string(), Some("sk-test".to_string()));
        SourceStore::new(client, "Tax Evasion Data Base", site_dir)
    }

    #[tokio::test]
    async fn missing_pdfs_do_not_abort_provisioning() {
        let counters = Arc::new(Counters::default());
        let base_url = spawn_stub(counters.clone()).await;
        let site = tempfile::tempdir().unwrap();

        let store = store_for(&base_url, site.path());
        let id = store.ensure().await.unwrap();

        assert_eq!(id, "vs_1");
        assert_eq!(counters.creates.load(Ordering::SeqCst), 1);
        assert_eq!(counters.uploads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn present_pdfs_are_uploaded_once() {
        let counters = Arc::new(Counters::default());
        let base_url = spawn_stub(counters.clone()).await;
        let site = tempfile::tempdir().unwrap();
        std::fs::write(site.path().join(SOURCE_PDFS[0]), b"%PDF-1.4 stub").unwrap();

        let store = store_for(&base_url, site.path());
        store.ensure().await.unwrap();

        assert_eq!(counters.uploads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cached_id_is_reused_across_calls() {
        let counters = Arc::new(Counters::default());
        let base_url = spawn_stub(counters.clone()).await;
        let site = tempfile::tempdir().unwrap();

        let store = store_for(&base_url, site.path());
        let first = store.ensure().await.unwrap();
        let second = store.ensure().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(counters.creates.load(Ordering::SeqCst), 1);
        assert_eq!(counters.retrieves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_cached_id_triggers_recreation() {
        let counters = Arc::new(Counters::default());
        let base_url = spawn_stub(counters.clone()).await;
        let site = tempfile::tempdir().unwrap();

        let store = store_for(&base_url, site.path());
        let first = store.ensure().await.unwrap();

        counters.retrieve_fails.store(1, Ordering::SeqCst);
        let second = store.ensure().await.unwrap();

        assert_ne!(first, second);
        assert_eq!(counters.creates.load(Ordering::SeqCst), 2);
    }
}
