use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::env;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use animein_api::fetch::identity::random_user_agent;
use animein_api::fetch::FetchError;
use animein_api::sources::{self, SourceError};
use animein_api::{types::*, AppState};

fn parse_port_from_args() -> Option<u16> {
    let mut args = std::env::args().peekable();
    while let Some(a) = args.next() {
        if a == "--port" {
            if let Some(v) = args.next() {
                if let Ok(p) = v.parse::<u16>() {
                    return Some(p);
                }
            }
        } else if let Some(rest) = a.strip_prefix("--port=") {
            if let Ok(p) = rest.parse::<u16>() {
                return Some(p);
            }
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!("Starting animein-api");

    // Create HTTP client
    let http_timeout = env::var("HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(30);
    let connect_timeout = env::var("HTTP_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(10);
    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(http_timeout))
        .connect_timeout(std::time::Duration::from_secs(connect_timeout))
        .build()?;

    let state = Arc::new(AppState::new(http_client));
    info!("{:?}", state);

    // Build router
    let app = Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/api/home", get(home_handler))
        .route("/api/search", get(search_handler))
        .route("/api/genres", get(genres_handler))
        .route("/api/detail/{slug}", get(detail_handler))
        .route("/api/stream/{slug}", get(stream_handler))
        .route("/api/schedule", get(schedule_handler))
        .route("/api/read/{slug}", get(read_handler))
        .route("/api/image", get(image_proxy_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    // Start server
    let port: u16 = parse_port_from_args().unwrap_or_else(|| state.config.resolve_port());
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "Address already in use: {}. Stop the existing process or run with --port {} (or set PORT/ANIMEIN_PORT).",
                bind_addr,
                port.saturating_add(1)
            )
        }
        Err(e) => return Err(e.into()),
    };
    info!("animein-api listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).ok();
        let mut sigint = signal(SignalKind::interrupt()).ok();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = async {
                if let Some(ref mut s) = sigterm {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
            _ = async {
                if let Some(ref mut s) = sigint {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutting down");
}

type ApiError = (StatusCode, Json<ErrorBody>);

/// Map a source failure onto the uniform error body.
///
/// 404 covers "the source answered but has nothing here" (no servers on the
/// page, an operation the source doesn't serve); 502 covers "the source did
/// not answer usefully" (blocked everywhere, all mirrors down); everything
/// else is a 500.
fn source_error(op: &'static str, e: SourceError) -> ApiError {
    error!("{} failed: {}", op, e);
    let status = match &e {
        SourceError::NoServers | SourceError::Unsupported { .. } => StatusCode::NOT_FOUND,
        SourceError::Fetch(FetchError::Blocked { .. })
        | SourceError::Fetch(FetchError::Unavailable(_)) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorBody::new(e.to_string())))
}

fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorBody::new(message)))
}

fn bad_gateway(message: String) -> ApiError {
    (StatusCode::BAD_GATEWAY, Json(ErrorBody::new(message)))
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "animein-api",
        "version": env!("CARGO_PKG_VERSION"),
        "source": state.source,
        "time": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn home_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HomeResponse>, ApiError> {
    sources::home(&state)
        .await
        .map(Json)
        .map_err(|e| source_error("home", e))
}

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
    page: Option<u32>,
}

async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| bad_request("missing query parameter `q`"))?;

    sources::search(&state, query, params.page.unwrap_or(1))
        .await
        .map(Json)
        .map_err(|e| source_error("search", e))
}

async fn genres_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GenresResponse>, ApiError> {
    sources::genres(&state)
        .await
        .map(Json)
        .map_err(|e| source_error("genres", e))
}

async fn detail_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<DetailResponse>, ApiError> {
    sources::detail(&state, &slug)
        .await
        .map(Json)
        .map_err(|e| source_error("detail", e))
}

async fn stream_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<StreamResponse>, ApiError> {
    sources::stream(&state, &slug)
        .await
        .map(Json)
        .map_err(|e| source_error("stream", e))
}

async fn schedule_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    sources::schedule(&state)
        .await
        .map(Json)
        .map_err(|e| source_error("schedule", e))
}

async fn read_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<ReadResponse>, ApiError> {
    sources::read(&state, &slug)
        .await
        .map(Json)
        .map_err(|e| source_error("read", e))
}

#[derive(Deserialize)]
struct ImageParams {
    url: Option<String>,
}

/// Hotlink-bypass image proxy: fetch the image with a browser UA and a
/// Referer spoofed to the image's own origin, then relay the bytes.
async fn image_proxy_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ImageParams>,
) -> Result<Response, ApiError> {
    let raw_url = params
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| bad_request("missing query parameter `url`"))?;

    let parsed = url::Url::parse(raw_url).map_err(|_| bad_request("invalid image url"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(bad_request("only http(s) image urls are accepted"));
    }
    let referer = format!("{}/", parsed.origin().ascii_serialization());

    let resp = state
        .http_client
        .get(parsed)
        .header(header::USER_AGENT, random_user_agent())
        .header(header::REFERER, referer)
        .timeout(std::time::Duration::from_secs(15))
        .send()
        .await
        .map_err(|e| bad_gateway(format!("image fetch failed: {}", e)))?;

    if !resp.status().is_success() {
        return Err(bad_gateway(format!(
            "image upstream returned HTTP {}",
            resp.status().as_u16()
        )));
    }

    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("image/jpeg")
        .to_string();
    if !content_type.starts_with("image/") {
        return Err(bad_gateway(format!(
            "image upstream returned `{}`",
            content_type
        )));
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| bad_gateway(format!("image body read failed: {}", e)))?;

    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}
