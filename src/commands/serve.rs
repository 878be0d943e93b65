//! Serve command - HTTP API over the lifecycle
//!
//! | Method | Path | Body |
//! |---|---|---|
//! | GET | `/list` | - |
//! | POST | `/create` | `{"name": "..."}` |
//! | POST | `/delete`, `/destroy` | `{"name": "..."}` |
//!
//! Every response is an envelope holding exactly one of `data` or `error`.
//! A fatal reload failure is reported to its caller, then the server shuts
//! down.

use anyhow::{Context as _, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use vhostkit::{ErrorKind, Lifecycle};

use super::Request;
use crate::Context;
use crate::ui;

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

/// Response body: `{"data": ...}` or `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    pub fn data(text: String) -> Self {
        Self {
            data: Some(text),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            data: None,
            error: Some(message),
        }
    }
}

/// HTTP status for a lifecycle error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::ServiceCommand => StatusCode::BAD_GATEWAY,
        ErrorKind::TemplateMissing
        | ErrorKind::TemplateMalformed
        | ErrorKind::Io
        | ErrorKind::ResolutionStore
        | ErrorKind::Fatal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Clone)]
struct AppState {
    lifecycle: Arc<Lifecycle>,
    shutdown: Arc<Shutdown>,
}

/// Set once a fatal error means the server must stop.
#[derive(Default)]
pub struct Shutdown {
    fatal: Mutex<Option<vhostkit::Error>>,
    notify: Notify,
}

impl Shutdown {
    fn trigger(&self, err: vhostkit::Error) {
        let mut fatal = match self.fatal.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if fatal.is_none() {
            *fatal = Some(err);
        }
        self.notify.notify_one();
    }

    fn take(&self) -> Option<vhostkit::Error> {
        match self.fatal.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    async fn wait(&self) {
        self.notify.notified().await;
    }
}

pub fn router(lifecycle: Arc<Lifecycle>, shutdown: Arc<Shutdown>) -> Router {
    Router::new()
        .route("/list", get(handle_list))
        .route("/create", post(handle_create))
        .route("/delete", post(handle_destroy))
        .route("/destroy", post(handle_destroy))
        .with_state(AppState {
            lifecycle,
            shutdown,
        })
}

async fn handle_list(State(state): State<AppState>) -> Response {
    execute(state, Request::List).await
}

async fn handle_create(
    State(state): State<AppState>,
    body: Result<Json<NameRequest>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(body)) => execute(state, Request::Create(body.name)).await,
        Err(rejection) => bad_body(&rejection),
    }
}

async fn handle_destroy(
    State(state): State<AppState>,
    body: Result<Json<NameRequest>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(body)) => execute(state, Request::Destroy(body.name)).await,
        Err(rejection) => bad_body(&rejection),
    }
}

fn bad_body(rejection: &JsonRejection) -> Response {
    log::debug!("Rejected request body: {rejection}");
    (
        StatusCode::BAD_REQUEST,
        Json(Envelope::error(rejection.body_text())),
    )
        .into_response()
}

/// Run a request on the blocking pool and wrap the result.
async fn execute(state: AppState, request: Request) -> Response {
    log::info!("HTTP {request:?}");
    let lifecycle = Arc::clone(&state.lifecycle);
    let result = tokio::task::spawn_blocking(move || request.execute(&lifecycle)).await;

    match result {
        Ok(Ok(text)) => (StatusCode::OK, Json(Envelope::data(text))).into_response(),
        Ok(Err(err)) => {
            let status = status_for(err.kind());
            let body = Envelope::error(err.to_string());
            if err.is_fatal() {
                log::error!("Fatal: {err}; shutting down");
                state.shutdown.trigger(err);
            } else {
                log::warn!("Request failed ({}): {err}", err.kind().as_str());
            }
            (status, Json(body)).into_response()
        }
        Err(join) => {
            log::error!("Request task failed: {join}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Envelope::error(format!("internal error: {join}"))),
            )
                .into_response()
        }
    }
}

pub fn run(ctx: &Context, bind: Option<SocketAddr>) -> Result<()> {
    let config = ctx.config()?;
    let lifecycle = Arc::new(config.lifecycle()?);
    let addr = bind.unwrap_or(config.http.bind);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(serve(lifecycle, addr))
}

async fn serve(lifecycle: Arc<Lifecycle>, addr: SocketAddr) -> Result<()> {
    let shutdown = Arc::new(Shutdown::default());
    let app = router(lifecycle, Arc::clone(&shutdown));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    let local = listener.local_addr()?;
    ui::info(&format!("Listening on http://{local}"));

    let signal = Arc::clone(&shutdown);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                () = signal.wait() => {}
                _ = tokio::signal::ctrl_c() => log::info!("Interrupted, shutting down"),
            }
        })
        .await
        .context("HTTP server failed")?;

    match shutdown.take() {
        Some(err) => Err(anyhow::Error::new(err).context("Server stopped after a fatal error")),
        None => Ok(()),
    }
}
