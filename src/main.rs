use std::{collections::HashSet, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderName, HeaderValue, Method, header::CONTENT_DISPOSITION},
    response::Response,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info, warn};
use url::Url;

use shortvid_backend::{
    config::AppConfig,
    cookies::Credentials,
    error::ApiError,
    media::{DOWNLOAD_FILENAME_HEADER, StoredMedia},
    models::ParseSummary,
    platforms::Platform,
    service::{VideoIdLookup, VideoService},
};

const SUPPORTED_PLATFORMS: [&str; 5] = ["Instagram", "VK", "Likee", "YouTube", "TikTok"];

#[derive(Clone)]
struct AppState {
    service: Arc<VideoService>,
}

#[derive(Debug, Deserialize)]
struct VideoRequest {
    url: String,
    #[serde(default)]
    sessionid: Option<String>,
    #[serde(default)]
    csrftoken: Option<String>,
    #[serde(default)]
    ds_user_id: Option<String>,
}

impl VideoRequest {
    fn url(&self) -> Result<&str, ApiError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ApiError::bad_request("Ingresa una URL valida."));
        }
        Ok(url)
    }

    fn credentials(&self) -> Credentials {
        Credentials {
            sessionid: self.sessionid.clone(),
            csrftoken: self.csrftoken.clone(),
            ds_user_id: self.ds_user_id.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UrlRequest {
    url: String,
}

#[derive(Debug, Deserialize)]
struct YoutubeInfoRequest {
    video_id: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "shortvid_backend=info,tower_http=info".to_string()),
        )
        .init();

    if let Err(error) = run().await {
        eprintln!("Server error: {}", error.message);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ApiError> {
    let config = Arc::new(AppConfig::from_env());

    let service = VideoService::new(Arc::clone(&config))
        .map_err(|error| ApiError::internal(format!("No se pudo crear cliente HTTP: {error}")))?;
    service.media().ensure_dir().await?;

    if config.youtube_api_configured() {
        info!("YouTube Data API habilitada.");
    } else {
        warn!("YOUTUBE_KEY no configurado. YouTube se resolvera con yt-dlp.");
    }
    if config.proxy_url.is_some() {
        info!("Proxy de salida configurado.");
    }

    let state = AppState {
        service: Arc::new(service),
    };
    let cors = build_cors_layer(&config.allowed_origins)?;

    let app = Router::new()
        .route("/api/parse", post(parse_video))
        .route("/api/download", post(download_video))
        .route("/api/extract-video-id", post(extract_video_id))
        .route("/api/youtube/info", post(youtube_info))
        .route("/api/likee/info", post(likee_info))
        .route("/api/media/{filename}", get(get_media))
        .route("/api/health", get(health))
        .route("/api/config", get(get_config))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = &config.bind_addr;
    let listener = TcpListener::bind(addr).await.map_err(|error| {
        ApiError::internal(format!("No se pudo iniciar el puerto {addr}: {error}"))
    })?;

    info!("Backend listo en http://{addr}");

    axum::serve(listener, app)
        .await
        .map_err(|error| ApiError::internal(format!("Error del servidor HTTP: {error}")))
}

async fn parse_video(
    State(state): State<AppState>,
    Json(payload): Json<VideoRequest>,
) -> Result<Json<ParseSummary>, ApiError> {
    let url = payload.url()?;
    let info = state.service.video_info(url, &payload.credentials()).await?;
    Ok(Json(ParseSummary::from_info(info, url)))
}

async fn download_video(
    State(state): State<AppState>,
    Json(payload): Json<VideoRequest>,
) -> Result<Json<StoredMedia>, ApiError> {
    let url = payload.url()?;
    let stored = state.service.download(url, &payload.credentials()).await?;
    Ok(Json(stored))
}

async fn extract_video_id(
    State(state): State<AppState>,
    Json(payload): Json<UrlRequest>,
) -> Result<Json<VideoIdLookup>, ApiError> {
    state.service.extract_video_id(&payload.url).map(Json)
}

async fn youtube_info(
    State(state): State<AppState>,
    Json(payload): Json<YoutubeInfoRequest>,
) -> Result<Json<Value>, ApiError> {
    let video_id = payload.video_id.trim();
    let info = state.service.youtube_info(video_id).await?;
    let url = info.webpage_url.clone();

    Ok(Json(json!({
        "success": true,
        "data": ParseSummary::from_info(info, &url),
        "source": "youtube_api",
    })))
}

async fn likee_info(
    State(state): State<AppState>,
    Json(payload): Json<UrlRequest>,
) -> Result<Json<Value>, ApiError> {
    let result = state.service.likee_info(payload.url.trim()).await?;

    Ok(Json(json!({
        "success": true,
        "video_available": result.is_usable(),
        "extraction_source": result.source.clone(),
        "extracted_at": Utc::now(),
        "data": result,
    })))
}

async fn get_media(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    state.service.media().serve(&filename).await
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "supported_platforms": SUPPORTED_PLATFORMS,
        "youtube_api_available": state.service.config().youtube_api_configured(),
        "likee_extractors": ["page", "api", "meta_tags"],
    }))
}

async fn get_config(State(state): State<AppState>) -> Json<Value> {
    let config = state.service.config();
    let platforms = [
        Platform::Youtube,
        Platform::Instagram,
        Platform::Likee,
        Platform::Vk,
        Platform::Tiktok,
    ]
    .iter()
    .map(|platform| (platform.as_str().to_string(), Value::Bool(true)))
    .collect::<serde_json::Map<_, _>>();

    Json(json!({
        "youtube_api_configured": config.youtube_api_configured(),
        "media_directory": config.media_dir.to_string_lossy(),
        "supported_platforms": platforms,
    }))
}

fn build_cors_layer(configured: &[String]) -> Result<CorsLayer, ApiError> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([
            CONTENT_DISPOSITION,
            HeaderName::from_static(DOWNLOAD_FILENAME_HEADER),
        ]);

    if configured.is_empty() {
        warn!("ALLOWED_ORIGINS no esta configurado. Se aceptara cualquier origen.");
        return Ok(layer.allow_origin(Any));
    }

    let allowed_origins = configured
        .iter()
        .map(|origin| {
            normalize_origin(origin).ok_or_else(|| {
                ApiError::internal(format!(
                    "Origen invalido en ALLOWED_ORIGINS: {origin}. Usa valores tipo https://dominio.com"
                ))
            })
        })
        .collect::<Result<HashSet<_>, _>>()?;

    info!(
        "CORS allow-list cargada con {} origen(es): {:?}",
        allowed_origins.len(),
        allowed_origins
    );

    let allowed_origins = Arc::new(allowed_origins);
    let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let normalized = origin.to_str().ok().and_then(normalize_origin);
        let allowed = normalized
            .as_ref()
            .is_some_and(|value| allowed_origins.contains(value));
        debug!("CORS origin={normalized:?} allowed={allowed}");
        allowed
    });

    Ok(layer.allow_origin(allow_origin))
}

/// `scheme://host[:port]` with the default port dropped, or `None` when the
/// value carries a path, query or fragment.
fn normalize_origin(value: &str) -> Option<String> {
    let parsed = Url::parse(value).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let scheme = parsed.scheme();
    if !matches!(scheme, "http" | "https") {
        return None;
    }
    if parsed.path() != "/" || parsed.query().is_some() || parsed.fragment().is_some() {
        return None;
    }

    match parsed.port() {
        Some(port) => Some(format!("{scheme}://{host}:{port}")),
        None => Some(format!("{scheme}://{host}")),
    }
}
