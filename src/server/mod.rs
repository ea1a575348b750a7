//! Form server: a page to paste URLs into, a save endpoint and a live log tail

use crate::core::config::ServeConfig;
use crate::error::GrabError;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{self, Stream};
use serde::Deserialize;
use serde_json::json;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::io::{SeekFrom, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::signal;
use tracing::{debug, error, info};

const LOG_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct AppState {
    config: Arc<ServeConfig>,
}

impl From<ServeConfig> for AppState {
    fn from(config: ServeConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SaveRequest {
    text: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/save", post(save_text))
        .route("/logs", get(logs))
        .with_state(state)
}

/// Bind and serve until Ctrl+C
pub async fn serve(config: ServeConfig) -> Result<(), GrabError> {
    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Form server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(AppState::from(config)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Form server stopped");
    Ok(())
}

async fn shutdown_signal() {
    // Only graceful shutdown depends on this handler.
    if let Err(err) = signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", err);
    }
}

async fn index(State(state): State<AppState>) -> Response {
    let page = state.config.public_dir.join("index.html");
    match tokio::fs::read_to_string(&page).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Could not read {}: {}", page.display(), e);
            (StatusCode::NOT_FOUND, "index.html not found").into_response()
        }
    }
}

/// The body is parsed by hand so that malformed JSON still gets a JSON answer
async fn save_text(State(state): State<AppState>, body: Bytes) -> Json<serde_json::Value> {
    match handle_save(state.config.output_dir.clone(), &body).await {
        Ok(path) => {
            info!("Saved submission to {}", path.display());
            Json(json!({ "message": "Submitted successfully." }))
        }
        Err(e) => {
            error!("Submission failed: {}", e);
            Json(json!({ "error": e.to_string() }))
        }
    }
}

async fn handle_save(output_dir: PathBuf, body: &[u8]) -> Result<PathBuf, GrabError> {
    let request: SaveRequest = serde_json::from_slice(body)?;
    tokio::task::spawn_blocking(move || save_snippet(&output_dir, &request.text))
        .await
        .map_err(|e| GrabError::IoError(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}

/// Write `text` to a new uniquely named file in `dir` and keep it
pub fn save_snippet(dir: &Path, text: &str) -> Result<PathBuf, GrabError> {
    let mut file = tempfile::Builder::new().prefix("tmp").tempfile_in(dir)?;
    file.write_all(text.as_bytes())?;
    let (_, path) = file.keep().map_err(|e| GrabError::IoError(e.error))?;
    Ok(path)
}

async fn logs(State(state): State<AppState>) -> Response {
    let Some(path) = state.config.log_file.clone() else {
        return (StatusCode::NOT_FOUND, "log streaming is not enabled").into_response();
    };

    let tail = LogTail::start(path).await;
    Sse::new(log_events(tail))
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn log_events(tail: LogTail) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(tail, |mut tail| async move {
        let line = tail.next_line().await;
        Some((Ok(Event::default().data(line)), tail))
    })
}

/// Follows a file from its current end, yielding complete lines
pub struct LogTail {
    path: PathBuf,
    offset: u64,
    partial: String,
    ready: VecDeque<String>,
}

impl LogTail {
    pub async fn start(path: PathBuf) -> Self {
        let offset = tokio::fs::metadata(&path).await.map(|m| m.len()).unwrap_or(0);
        Self {
            path,
            offset,
            partial: String::new(),
            ready: VecDeque::new(),
        }
    }

    /// Read whatever was appended since the last poll
    pub async fn poll(&mut self) -> std::io::Result<()> {
        let len = tokio::fs::metadata(&self.path).await?.len();
        if len < self.offset {
            debug!("{} was truncated, reading from the start", self.path.display());
            self.offset = 0;
            self.partial.clear();
        }
        if len == self.offset {
            return Ok(());
        }

        let mut file = tokio::fs::File::open(&self.path).await?;
        file.seek(SeekFrom::Start(self.offset)).await?;
        let mut appended = Vec::new();
        file.read_to_end(&mut appended).await?;
        self.offset += appended.len() as u64;

        self.partial.push_str(&String::from_utf8_lossy(&appended));
        while let Some(newline) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=newline).collect();
            self.ready
                .push_back(line.trim_end_matches(|c| c == '\r' || c == '\n').to_string());
        }
        Ok(())
    }

    pub async fn next_line(&mut self) -> String {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return line;
            }
            tokio::time::sleep(LOG_POLL_INTERVAL).await;
            if let Err(e) = self.poll().await {
                debug!("Log tail poll failed: {}", e);
            }
        }
    }
}
