//! HTTP API server.
//!
//! Exposes chat with streamed answers, search, ingestion and thread
//! management over the shared pipeline.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::VidragError;
use crate::ingest::IngestRequest;
use crate::pipeline::Pipeline;
use crate::rag::{ConversationTurn, ThreadStore, ThreadSummary};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::{future, stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Shared application state.
pub struct AppState {
    pipeline: Pipeline,
    threads: Arc<ThreadStore>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            threads: Arc::new(ThreadStore::new()),
        }
    }
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/threads", post(create_thread).get(list_threads))
        .route("/threads/{thread_id}", get(get_thread))
        .route("/chat", post(chat))
        .route("/search", post(search))
        .route("/ingest", post(ingest))
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Query, &settings) {
        Output::error(&e.to_string());
        return Err(e.into());
    }

    let pipeline = Pipeline::new(settings).await?;
    let app = router(Arc::new(AppState::new(pipeline)));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("vidrag API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("New thread", "POST /threads");
    Output::kv("List threads", "GET  /threads");
    Output::kv("Get thread", "GET  /threads/:thread_id");
    Output::kv("Chat", "POST /chat");
    Output::kv("Search", "POST /search");
    Output::kv("Ingest", "POST /ingest");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    thread_id: Option<Uuid>,
}

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
}

#[derive(Serialize)]
struct ThreadResponse {
    thread_id: Uuid,
    title: String,
}

impl From<ThreadSummary> for ThreadResponse {
    fn from(summary: ThreadSummary) -> Self {
        Self {
            thread_id: summary.id,
            title: summary.title,
        }
    }
}

#[derive(Serialize)]
struct IngestResponse {
    chunks_indexed: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(e: VidragError) -> Response {
    let status = match &e {
        VidragError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        VidragError::Thread(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.pipeline.index_sizes().await {
        Ok((vectors, lexical)) => Json(serde_json::json!({
            "status": "ok",
            "vector_chunks": vectors,
            "lexical_chunks": lexical,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn create_thread(State(state): State<Arc<AppState>>) -> Response {
    match state.threads.create() {
        Ok(summary) => {
            (StatusCode::CREATED, Json(ThreadResponse::from(summary))).into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn list_threads(State(state): State<Arc<AppState>>) -> Response {
    match state.threads.list() {
        Ok(threads) => Json(threads).into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<Uuid>,
) -> Response {
    match state.threads.get(thread_id) {
        Ok(Some(thread)) => Json(thread).into_response(),
        Ok(None) => error_response(VidragError::Thread(format!("Unknown thread: {}", thread_id))),
        Err(e) => error_response(e),
    }
}

/// Streams the answer as plain text and records both turns on the thread.
///
/// A thread id the store has not seen yet starts a new thread under that id.
async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Response {
    let thread_id = match state.threads.resolve(req.thread_id) {
        Ok(id) => id,
        Err(e) => return error_response(e),
    };

    let history = match state.threads.history(thread_id) {
        Ok(history) => history,
        Err(e) => return error_response(e),
    };

    if let Err(e) = state
        .threads
        .append(thread_id, ConversationTurn::user(req.message.clone()))
    {
        return error_response(e);
    }

    info!("Chat on thread {}", thread_id);
    let fragments = state.pipeline.answer(&req.message, &history).await;

    let answer = Arc::new(Mutex::new(String::new()));
    let collected = Arc::clone(&answer);
    let threads = Arc::clone(&state.threads);

    let persist = stream::once(async move {
        let text = match answer.lock() {
            Ok(text) => text.trim_end().to_string(),
            Err(e) => {
                error!("Answer buffer poisoned: {}", e);
                return;
            }
        };
        if let Err(e) = threads.append(thread_id, ConversationTurn::assistant(text)) {
            warn!("Failed to record answer on thread {}: {}", thread_id, e);
        }
    })
    .filter_map(|()| future::ready(None::<String>));

    let body = fragments
        .inspect(move |fragment| {
            if let Ok(mut text) = collected.lock() {
                text.push_str(fragment);
            }
        })
        .chain(persist)
        .map(Ok::<_, Infallible>);

    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::HeaderName::from_static("x-thread-id"), thread_id.to_string()),
        ],
        Body::from_stream(body),
    )
        .into_response()
}

async fn search(State(state): State<Arc<AppState>>, Json(req): Json<SearchRequest>) -> Response {
    match state.pipeline.search(&req.query).await {
        Ok(outcome) => (
            [(
                header::HeaderName::from_static("x-confidence"),
                outcome.confidence.label(),
            )],
            Json(outcome),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

async fn ingest(State(state): State<Arc<AppState>>, Json(req): Json<IngestRequest>) -> Response {
    match state.pipeline.ingest_request(req, None).await {
        Ok(chunks_indexed) => Json(IngestResponse { chunks_indexed }).into_response(),
        Err(e) => error_response(e),
    }
}
