//! HTTP surface: a thin axum router over the entry points in [`crate::convert`].
//!
//! Deck addresses travel in the path as base64 of a percent-encoded URL.
//! Every failure, whatever its cause, is answered with HTTP 500 and the
//! same opaque body; the cause is only logged.

use crate::config::DeckConfig;
use crate::convert::{download, fetch_slide, inspect};
use crate::error::DeckError;
use crate::pipeline::input::decode_deck_url;
use crate::pptx::PPTX_MEDIA_TYPE;
use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Path prefix every route is mounted under.
pub const API_PREFIX: &str = "/api/slidesharedl";

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DeckConfig>,
}

impl AppState {
    pub fn new(config: DeckConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

/// Body of `GET /info/{encoded}`.
///
/// `slides_number` is `-1` and `template_url` is empty when the viewer page
/// does not provide them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoResponse {
    pub title: String,
    pub template_url: String,
    pub slides_number: i64,
    pub estimated_download_time_seconds: u64,
    pub client_ip: String,
}

/// Body of every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Wraps a [`DeckError`] so handlers can use `?`.
#[derive(Debug)]
pub struct ApiError(DeckError);

impl From<DeckError> for ApiError {
    fn from(e: DeckError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let slide = self.0.slide();
        if self.0.is_retryable() {
            warn!(?slide, "Request failed upstream: {}", self.0);
        } else {
            error!(?slide, "Request failed: {}", self.0);
        }
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                detail: "Internal server error".to_string(),
            }),
        )
            .into_response()
    }
}

/// Build the router with all endpoints.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    let api = Router::new()
        .route("/ping", get(ping))
        .route("/info/{encoded}", get(deck_info))
        .route("/download/{encoded}", get(deck_download))
        .route("/get_slide/{encoded}/{slide_number}", get(deck_slide));

    Router::new()
        .nest(API_PREFIX, api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn start_server(addr: &str, state: AppState) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    serve(listener, state).await
}

/// Serve on an already bound listener.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> Result<(), std::io::Error> {
    let app = build_router(state);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn ping() -> Json<&'static str> {
    Json("pong")
}

async fn deck_info(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    Path(encoded): Path<String>,
) -> Result<Json<InfoResponse>, ApiError> {
    let url = decode_deck_url(&encoded)?;
    info!("IP {} requesting info for {}", client.ip(), url);

    let meta = inspect(&url, &state.config).await?;
    Ok(Json(InfoResponse {
        template_url: meta.template_url().to_string(),
        slides_number: meta.slide_count.map_or(-1, i64::from),
        estimated_download_time_seconds: meta.estimated_seconds,
        title: meta.title,
        client_ip: client.ip().to_string(),
    }))
}

async fn deck_download(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    Path(encoded): Path<String>,
) -> Result<Response, ApiError> {
    let url = decode_deck_url(&encoded)?;
    info!("IP {} downloading {}", client.ip(), url);

    let output = download(&url, &state.config).await?;
    Ok(([(header::CONTENT_TYPE, PPTX_MEDIA_TYPE)], output.bytes).into_response())
}

async fn deck_slide(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    Path((encoded, slide_number)): Path<(String, u32)>,
) -> Result<Response, ApiError> {
    let url = decode_deck_url(&encoded)?;
    info!("IP {} fetching slide {} of {}", client.ip(), slide_number, url);

    let image = fetch_slide(&url, slide_number, &state.config).await?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], image.bytes).into_response())
}
