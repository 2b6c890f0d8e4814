use std::net::SocketAddr;
use std::path::{Component, PathBuf};

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::models::{QueryAnswer, QueryRequest};
use crate::openai::OpenAiError;
use crate::qa::QaService;

const ALLOWED_EXTENSIONS: &[&str] = &[
    "html", "css", "js", "png", "jpg", "jpeg", "gif", "svg", "ico", "woff", "woff2", "ttf",
    "pdf", "json", "map",
];

const SPA_MISSING_MESSAGE: &str = "taxintegrity-ai build output not found. \
Run: cd taxintegrity-ai && npm install && npm run build";

#[derive(Clone)]
pub struct AppState {
    qa: QaService,
    site_dir: PathBuf,
    spa_dist: PathBuf,
}

impl AppState {
    pub fn new(qa: QaService, site_dir: PathBuf, spa_dist: PathBuf) -> Self {
        Self {
            qa,
            site_dir,
            spa_dist,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/chat.html", get(chat_page))
        .route("/taxintegrity-ai/", get(spa_index))
        .route("/taxintegrity-ai/*asset", get(spa_asset))
        .route("/api/query", post(query_handler))
        .route("/*path", get(static_file))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: AppConfig, qa: QaService) -> Result<()> {
    let state = AppState::new(qa, config.site_dir.clone(), config.spa_dist_dir());
    let app = build_router(state);

    let addr: SocketAddr = config.bind_addr.parse()?;
    tracing::info!("listening on http://{}", addr);
    tracing::info!("vector store will be initialized on first query");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index_page(State(state): State<AppState>) -> Response {
    serve_file(&state.site_dir.join("index.html")).await
}

async fn chat_page(State(state): State<AppState>) -> Response {
    serve_file(&state.site_dir.join("chat.html")).await
}

async fn spa_index(State(state): State<AppState>) -> Response {
    serve_spa(&state, "index.html").await
}

async fn spa_asset(State(state): State<AppState>, Path(asset): Path<String>) -> Response {
    serve_spa(&state, &asset).await
}

async fn query_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryAnswer>, ApiError> {
    let answer = state.qa.answer(&request.query).await?;
    Ok(Json(answer))
}

/// Serves the separately built single-page app. Any path that is not an
/// existing file under the dist directory gets the entry document so
/// client-side routing can take over.
async fn serve_spa(state: &AppState, asset: &str) -> Response {
    if !dir_exists(&state.spa_dist).await {
        return (StatusCode::NOT_FOUND, SPA_MISSING_MESSAGE).into_response();
    }

    if is_plain_relative(asset) {
        let candidate = state.spa_dist.join(asset);
        if file_exists(&candidate).await {
            return serve_file(&candidate).await;
        }
    }

    serve_file(&state.spa_dist.join("index.html")).await
}

/// Generic static serving under the site directory, restricted to an
/// extension allow-list. Extensionless paths that miss are retried with
/// `.html` appended.
async fn static_file(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    if !is_plain_relative(&path) {
        return not_found();
    }

    let candidate = state.site_dir.join(&path);
    let ext = candidate
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext {
        Some(ext) => {
            if ALLOWED_EXTENSIONS.contains(&ext.as_str()) && file_exists(&candidate).await {
                serve_file(&candidate).await
            } else {
                not_found()
            }
        }
        None => {
            if file_exists(&candidate).await {
                serve_file(&candidate).await
            } else {
                let with_html = candidate.with_extension("html");
                if file_exists(&with_html).await {
                    serve_file(&with_html).await
                } else {
                    not_found()
                }
            }
        }
    }
}

async fn serve_file(path: &std::path::Path) -> Response {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.to_string())], bytes).into_response()
        }
        Err(_) => not_found(),
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "File not found").into_response()
}

/// True when the path is made only of normal components, so joining it under
/// the base directory cannot escape it.
fn is_plain_relative(path: &str) -> bool {
    !path.is_empty()
        && std::path::Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

async fn file_exists(path: &std::path::Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

async fn dir_exists(path: &std::path::Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<OpenAiError> for ApiError {
    fn from(value: OpenAiError) -> Self {
        let status = match value {
            OpenAiError::EmptyQuery => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: value.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}
