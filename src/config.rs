use std::path::PathBuf;

const DEFAULT_MEDIA_DIR: &str = "media";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_YT_DLP_TIMEOUT_SECONDS: u64 = 180;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub media_dir: PathBuf,
    pub youtube_api_key: Option<String>,
    pub proxy_url: Option<String>,
    pub bind_addr: String,
    pub allowed_origins: Vec<String>,
    pub yt_dlp_timeout_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::from(DEFAULT_MEDIA_DIR),
            youtube_api_key: None,
            proxy_url: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            allowed_origins: Vec::new(),
            yt_dlp_timeout_seconds: DEFAULT_YT_DLP_TIMEOUT_SECONDS,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        Self {
            media_dir: read_string_env("MEDIA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MEDIA_DIR)),
            youtube_api_key: read_string_env("YOUTUBE_KEY"),
            proxy_url: read_string_env("PROXY_URL"),
            bind_addr: resolve_bind_addr(),
            allowed_origins: read_list_env("ALLOWED_ORIGINS"),
            yt_dlp_timeout_seconds: read_u64_env("YT_DLP_TIMEOUT_SECONDS")
                .filter(|value| *value > 0)
                .unwrap_or(DEFAULT_YT_DLP_TIMEOUT_SECONDS),
        }
    }

    pub fn youtube_api_configured(&self) -> bool {
        self.youtube_api_key.is_some()
    }
}

fn read_string_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .and_then(|value| non_empty(&value).map(ToString::to_string))
}

fn read_u64_env(name: &str) -> Option<u64> {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
}

fn read_list_env(name: &str) -> Vec<String> {
    std::env::var(name)
        .ok()
        .map(|value| parse_list(&value))
        .unwrap_or_default()
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn resolve_bind_addr() -> String {
    if let Some(configured) = read_string_env("APP_ADDR") {
        return configured;
    }

    if let Some(port) = std::env::var("PORT")
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
    {
        return format!("0.0.0.0:{port}");
    }

    DEFAULT_BIND_ADDR.to_string()
}

pub(crate) fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
