use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderMap},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{error, info};

use super::metrics::metrics_handler;
use super::pipeline::{process_upload, read_upload, ProcessError, UploadSource};
use super::render::render_result;
use super::{log_requests, state::ServerState};

const INDEX_PAGE: &str = include_str!("../../templates/index.html");
const UPLOAD_PAGE: &str = include_str!("../../templates/upload.html");
const CAMERA_PAGE: &str = include_str!("../../templates/camera.html");

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_PAGE)
}

async fn camera_form() -> Html<&'static str> {
    Html(CAMERA_PAGE)
}

fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.contains("application/json"))
        .unwrap_or(false)
}

async fn handle_submission(
    state: ServerState,
    headers: HeaderMap,
    mut multipart: Multipart,
    source: UploadSource,
) -> Result<Response, ProcessError> {
    let upload = read_upload(&mut multipart, source).await?;
    let outcome = process_upload(&state, source, upload).await?;
    if wants_json(&headers) {
        Ok(Json(outcome).into_response())
    } else {
        Ok(Html(render_result(&outcome)).into_response())
    }
}

async fn process_file(
    State(state): State<ServerState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, ProcessError> {
    handle_submission(state, headers, multipart, UploadSource::File).await
}

async fn process_camera(
    State(state): State<ServerState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, ProcessError> {
    handle_submission(state, headers, multipart, UploadSource::Camera).await
}

pub fn make_app(state: ServerState) -> Router {
    let uploads = ServeDir::new(state.config.uploads_dir.clone());

    Router::new()
        .route("/", get(index))
        .route("/upload", get(upload_form))
        .route("/camera", get(camera_form))
        .route("/process_file", post(process_file))
        .route("/process_camera", post(process_camera))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .nest_service("/uploads", uploads)
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .with_state(state)
}

pub fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Serves the app on `config.port` and Prometheus metrics on `config.metrics_port`
/// until Ctrl-C.
pub async fn run_server(state: ServerState) -> Result<()> {
    let port = state.config.port;
    let metrics_port = state.config.metrics_port;

    state.image_storage.init().await.with_context(|| {
        format!(
            "Failed to create uploads directory {:?}",
            state.image_storage.dir()
        )
    })?;

    let listener = TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = TcpListener::bind(format!("127.0.0.1:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    info!("Listening on http://127.0.0.1:{}", port);
    info!("Metrics available on http://127.0.0.1:{}/metrics", metrics_port);

    let app = axum::serve(listener, make_app(state)).with_graceful_shutdown(shutdown_signal());
    let metrics =
        axum::serve(metrics_listener, make_metrics_app()).with_graceful_shutdown(shutdown_signal());

    tokio::try_join!(async { app.await }, async { metrics.await })?;
    Ok(())
}
