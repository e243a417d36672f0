use std::io::ErrorKind;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tokio::{process::Command, time::timeout};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::models::{PlatformExtras, VideoInfo};
use crate::platforms::Platform;

const YT_DLP_BINARY: &str = "yt-dlp";
const DOWNLOAD_FORMAT: &str = "best[ext=mp4]/best";

#[derive(Debug, Deserialize)]
struct YtDlpVideoInfo {
    id: Option<String>,
    title: Option<String>,
    uploader: Option<String>,
    channel: Option<String>,
    channel_id: Option<String>,
    view_count: Option<u64>,
    like_count: Option<u64>,
    comment_count: Option<u64>,
    thumbnail: Option<String>,
    description: Option<String>,
    comments: Option<Vec<Value>>,
    webpage_url: Option<String>,
    upload_date: Option<String>,
    duration: Option<f64>,
    tags: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: String,
    proxy_url: Option<String>,
    timeout: Duration,
}

impl YtDlp {
    pub fn new(proxy_url: Option<String>, timeout_seconds: u64) -> Self {
        Self {
            binary: YT_DLP_BINARY.to_string(),
            proxy_url,
            timeout: Duration::from_secs(timeout_seconds),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub async fn info(&self, url: &str, cookies: Option<&Path>) -> Result<VideoInfo, ApiError> {
        let mut args = vec![
            "-J".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
        ];
        self.push_common_args(&mut args, cookies);
        args.push(url.to_string());

        let output = self
            .run(args)
            .await?
            .map_err(|message| classify_failure(url, &message))?;

        let parsed = serde_json::from_slice::<YtDlpVideoInfo>(&output.stdout).map_err(|error| {
            ApiError::internal(format!("No se pudo interpretar la salida de yt-dlp: {error}"))
        })?;

        Ok(into_video_info(parsed, url))
    }

    pub async fn download(
        &self,
        url: &str,
        output: &Path,
        cookies: Option<&Path>,
    ) -> Result<(), ApiError> {
        let mut args = vec![
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "-f".to_string(),
            DOWNLOAD_FORMAT.to_string(),
            "-o".to_string(),
            output.to_string_lossy().to_string(),
        ];
        self.push_common_args(&mut args, cookies);
        args.push(url.to_string());

        self.run(args)
            .await?
            .map(|_| ())
            .map_err(|message| ApiError::internal(format!("Error de descarga: {message}")))
    }

    fn push_common_args(&self, args: &mut Vec<String>, cookies: Option<&Path>) {
        if let Some(proxy) = &self.proxy_url {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }
        if let Some(path) = cookies {
            args.push("--cookies".to_string());
            args.push(path.to_string_lossy().to_string());
        }
    }

    /// Outer error: the process could not run. Inner error: it ran and failed,
    /// carrying the last line it printed to stderr.
    async fn run(&self, args: Vec<String>) -> Result<Result<Output, String>, ApiError> {
        debug!("Ejecutando {} {:?}", self.binary, args);
        let command_future = Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output();

        let output = timeout(self.timeout, command_future)
            .await
            .map_err(|_| {
                ApiError::bad_request(
                    "La operacion excedio el tiempo limite. Intenta de nuevo mas tarde.",
                )
            })?
            .map_err(|error| {
                if error.kind() == ErrorKind::NotFound {
                    ApiError::internal(
                        "yt-dlp no esta instalado en el sistema. Instala yt-dlp y reinicia el backend.",
                    )
                } else {
                    ApiError::internal(format!("No se pudo ejecutar yt-dlp: {error}"))
                }
            })?;

        if output.status.success() {
            Ok(Ok(output))
        } else {
            let message = last_stderr_line(&output.stderr);
            warn!("yt-dlp fallo: {message}");
            Ok(Err(message))
        }
    }
}

fn last_stderr_line(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .next_back()
        .unwrap_or("yt-dlp no pudo completar la operacion")
        .to_string()
}

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| haystack.contains(keyword))
}

/// Anything not matching a platform keyword is a 400 carrying the raw text.
pub fn classify_failure(url: &str, message: &str) -> ApiError {
    let lower = message.to_lowercase();

    match Platform::detect(url) {
        Platform::Youtube => {
            if contains_any(&lower, &["private", "deleted", "unavailable"]) {
                return ApiError::not_found(
                    "Video de YouTube no encontrado, eliminado o no disponible.",
                );
            }
            if contains_any(&lower, &["quota", "api key", "forbidden"]) {
                return ApiError::forbidden(
                    "Error de acceso a YouTube API. Revisa la cuota y la clave.",
                );
            }
        }
        Platform::Instagram => {
            if contains_any(&lower, &["login", "sign in", "bot", "confirm", "cookies"]) {
                return ApiError::unauthorized(
                    "Error de autorizacion en Instagram. Revisa o renueva las cookies del navegador.",
                );
            }
        }
        Platform::Vk => {
            if contains_any(&lower, &["private", "access denied", "blocked", "forbidden"]) {
                return ApiError::forbidden(
                    "Video de VK no disponible: puede ser privado o estar bloqueado en la region.",
                );
            }
            if contains_any(&lower, &["not found", "removed", "deleted"]) {
                return ApiError::not_found("Video de VK no encontrado o eliminado.");
            }
        }
        Platform::Likee => {
            if contains_any(&lower, &["unable to extract", "regexnotfounderror", "unsupported url"]) {
                return ApiError::unavailable(
                    "El extractor de Likee no funciona temporalmente. Intenta mas tarde.",
                );
            }
            if contains_any(&lower, &["private", "blocked", "restricted"]) {
                return ApiError::forbidden(
                    "Video de Likee no disponible: puede ser privado o estar bloqueado.",
                );
            }
        }
        Platform::Tiktok => {
            if contains_any(&lower, &["captcha", "login", "forbidden", "signature"]) {
                return ApiError::forbidden(
                    "TikTok puede requerir autorizacion o captcha. Intenta mas tarde.",
                );
            }
        }
        Platform::Other => {}
    }

    ApiError::bad_request(message)
}

fn into_video_info(parsed: YtDlpVideoInfo, url: &str) -> VideoInfo {
    let extras = (Platform::detect(url) == Platform::Youtube).then(|| PlatformExtras::Youtube {
        video_id: parsed.id.clone().unwrap_or_default(),
        channel_id: parsed.channel_id.clone(),
        upload_date: parsed.upload_date.clone(),
        duration: parsed.duration.map(|seconds| format!("{seconds}")),
        tags: parsed.tags.clone().unwrap_or_default(),
        category_id: None,
    });

    VideoInfo {
        title: parsed.title,
        uploader: parsed.uploader.or(parsed.channel),
        view_count: parsed.view_count,
        like_count: parsed.like_count,
        comment_count: parsed.comment_count,
        thumbnail: parsed.thumbnail,
        description: parsed.description,
        comments: parsed.comments.unwrap_or_default(),
        webpage_url: parsed.webpage_url.unwrap_or_else(|| url.to_string()),
        extras,
    }
}
