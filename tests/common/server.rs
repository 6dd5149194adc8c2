//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own reference database and
//! uploads directory, and a detector that reports a fixed set of detections.

use super::constants::*;
use super::fixtures::create_test_db;
use recycle_lens::detection::{load_image, Detection, DetectionError, Detector};
use recycle_lens::knowledge::SqliteKnowledgeStore;
use recycle_lens::server::{make_app, state::ServerState, RequestsLoggingLevel, ServerConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Detector stand-in: decodes the image like a real model would, then reports
/// whatever the test asked for.
struct FixedDetector {
    detections: Vec<Detection>,
}

impl Detector for FixedDetector {
    fn detect(&self, image_path: &Path) -> Result<Vec<Detection>, DetectionError> {
        load_image(image_path)?;
        Ok(self.detections.clone())
    }
}

/// Test server instance with isolated database and uploads directory
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Where the server stores submitted images
    pub uploads_dir: PathBuf,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _temp_uploads_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port whose detector reports `detections`
    /// for every valid image.
    ///
    /// # Panics
    ///
    /// Panics if the fixtures can't be created or the server doesn't become ready.
    pub async fn spawn(detections: Vec<Detection>) -> Self {
        let (temp_db_dir, db_path) = create_test_db().expect("Failed to create test database");
        let temp_uploads_dir = TempDir::new().expect("Failed to create uploads dir");
        let uploads_dir = temp_uploads_dir.path().to_path_buf();

        let knowledge_store =
            Arc::new(SqliteKnowledgeStore::new(&db_path).expect("Failed to open knowledge store"));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port,
            metrics_port: 0,
            uploads_dir: uploads_dir.clone(),
            max_upload_bytes: TEST_MAX_UPLOAD_BYTES,
        };
        let state = ServerState::new(
            config,
            Arc::new(FixedDetector { detections }),
            knowledge_store,
        );
        let app = make_app(state);

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            uploads_dir,
            _temp_db_dir: temp_db_dir,
            _temp_uploads_dir: temp_uploads_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Number of images stored so far.
    pub fn stored_images(&self) -> usize {
        std::fs::read_dir(&self.uploads_dir)
            .expect("Failed to list uploads dir")
            .count()
    }

    /// Waits for the server to become ready by polling the index page
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
