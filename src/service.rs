use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{AppConfig, non_empty};
use crate::cookies::{CookieFile, Credentials};
use crate::error::{ApiError, FetchError};
use crate::http::{HttpFetcher, RetryPolicy};
use crate::likee::{LikeeConfig, LikeeExtractor};
use crate::media::{MediaStore, StoredMedia, remove_quietly};
use crate::models::{ExtractionResult, PlatformExtras, VideoInfo};
use crate::platforms::{Platform, clean_thumbnail_url, is_likee_url, youtube_video_id};
use crate::youtube::{YOUTUBE_API_URL, fetch_youtube_info};
use crate::ytdlp::YtDlp;

/// Reply of the id lookup. The API key itself never leaves the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoIdLookup {
    pub video_id: Option<String>,
    pub original_url: String,
    pub platform: Platform,
    pub api_key_configured: bool,
}

#[derive(Debug, Clone)]
pub struct VideoService {
    config: Arc<AppConfig>,
    fetcher: HttpFetcher,
    likee: LikeeExtractor,
    ytdlp: YtDlp,
    media: MediaStore,
    youtube_endpoint: String,
}

impl VideoService {
    pub fn new(config: Arc<AppConfig>) -> Result<Self, FetchError> {
        let fetcher = HttpFetcher::new(config.proxy_url.as_deref(), RetryPolicy::default())?;
        let likee = LikeeExtractor::new(fetcher.clone(), LikeeConfig::default());
        let ytdlp = YtDlp::new(config.proxy_url.clone(), config.yt_dlp_timeout_seconds);
        let media = MediaStore::new(config.media_dir.clone());

        Ok(Self {
            config,
            fetcher,
            likee,
            ytdlp,
            media,
            youtube_endpoint: YOUTUBE_API_URL.to_string(),
        })
    }

    pub fn with_ytdlp(mut self, ytdlp: YtDlp) -> Self {
        self.ytdlp = ytdlp;
        self
    }

    pub fn with_youtube_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.youtube_endpoint = endpoint.into();
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn media(&self) -> &MediaStore {
        &self.media
    }

    pub async fn video_info(
        &self,
        url: &str,
        credentials: &Credentials,
    ) -> Result<VideoInfo, ApiError> {
        if Platform::detect(url) == Platform::Youtube
            && self.config.youtube_api_configured()
            && let Some(video_id) = youtube_video_id(url)
        {
            match self.youtube_info(&video_id).await {
                Ok(info) => return Ok(info),
                Err(error) => warn!("YouTube API fallo para {video_id}: {error}; se usa yt-dlp"),
            }
        }

        if is_likee_url(url) {
            let result = self.likee.extract_info(url).await?;
            return Ok(likee_video_info(result, url));
        }

        let cookies = self.cookie_file(url, credentials).await?;
        let outcome = self
            .ytdlp
            .info(url, cookies.as_ref().map(CookieFile::path))
            .await;
        if let Some(cookies) = cookies {
            cookies.remove().await;
        }
        outcome
    }

    pub async fn youtube_info(&self, video_id: &str) -> Result<VideoInfo, ApiError> {
        fetch_youtube_info(
            &self.fetcher,
            &self.youtube_endpoint,
            self.config.youtube_api_key.as_deref(),
            video_id,
        )
        .await
    }

    pub async fn likee_info(&self, url: &str) -> Result<ExtractionResult, ApiError> {
        if !is_likee_url(url) {
            return Err(ApiError::bad_request("No es un enlace de Likee"));
        }

        Ok(self.likee.extract_info(url).await?)
    }

    pub async fn download(
        &self,
        url: &str,
        credentials: &Credentials,
    ) -> Result<StoredMedia, ApiError> {
        self.media.ensure_dir().await?;

        if is_likee_url(url) {
            let info = self.video_info(url, &Credentials::default()).await?;
            let Some(video_url) = info.likee_video_url() else {
                return Err(ApiError::bad_request(
                    "No se pudo obtener el enlace directo del video de Likee",
                ));
            };
            return self.media.download_direct(&self.fetcher, video_url).await;
        }

        let (filename, path) = self.media.reserve();
        let cookies = self.cookie_file(url, credentials).await?;
        let outcome = self
            .ytdlp
            .download(url, &path, cookies.as_ref().map(CookieFile::path))
            .await;
        if let Some(cookies) = cookies {
            cookies.remove().await;
        }

        match outcome {
            Ok(()) => {
                let stored = self.media.stored(&filename).await;
                if stored.is_err() {
                    remove_quietly(&path).await;
                }
                stored
            }
            Err(error) => {
                remove_quietly(&path).await;
                Err(error)
            }
        }
    }

    pub fn extract_video_id(&self, url: &str) -> Result<VideoIdLookup, ApiError> {
        let Some(url) = non_empty(url) else {
            return Err(ApiError::bad_request(
                "URL no proporcionada. Envia {\"url\": \"https://youtube.com/watch?v=VIDEO_ID\"}",
            ));
        };

        let (video_id, platform) = if let Some(video_id) = youtube_video_id(url) {
            (Some(video_id), Platform::Youtube)
        } else if is_likee_url(url) {
            (crate::likee::extract_id(url), Platform::Likee)
        } else {
            (None, Platform::Other)
        };

        Ok(VideoIdLookup {
            video_id,
            original_url: url.to_string(),
            platform,
            api_key_configured: self.config.youtube_api_configured(),
        })
    }

    async fn cookie_file(
        &self,
        url: &str,
        credentials: &Credentials,
    ) -> Result<Option<CookieFile>, ApiError> {
        if Platform::detect(url) != Platform::Instagram || !credentials.is_complete() {
            return Ok(None);
        }

        info!("Usando cookies de Instagram para {url}");
        CookieFile::from_credentials(credentials).await.map(Some)
    }
}

fn likee_video_info(result: ExtractionResult, url: &str) -> VideoInfo {
    VideoInfo {
        title: Some(result.title.clone()),
        uploader: Some(result.author),
        view_count: Some(result.views),
        like_count: Some(result.likes),
        comment_count: Some(result.comments),
        thumbnail: result.thumbnail.as_deref().map(clean_thumbnail_url),
        description: Some(result.title),
        comments: Vec::new(),
        webpage_url: url.to_string(),
        extras: Some(PlatformExtras::Likee {
            video_url: result.video_url,
            post_id: result.post_id,
            author_id: result.author_id,
            upload_date: result.upload_date,
            shares: result.shares,
            downloads: result.downloads,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use serde_json::json;

    fn service(api_key: Option<&str>) -> VideoService {
        let config = AppConfig {
            youtube_api_key: api_key.map(ToString::to_string),
            ..AppConfig::default()
        };
        VideoService::new(Arc::new(config)).unwrap()
    }

    #[test]
    fn looks_up_ids_per_platform() {
        let service = service(Some("key"));

        let youtube = service
            .extract_video_id(" https://youtu.be/dQw4w9WgXcQ ")
            .unwrap();
        assert_eq!(youtube.video_id.as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(youtube.platform, Platform::Youtube);
        assert_eq!(youtube.original_url, "https://youtu.be/dQw4w9WgXcQ");
        assert!(youtube.api_key_configured);

        let likee = service
            .extract_video_id("https://likee.video/@user/video/123456")
            .unwrap();
        assert_eq!(likee.video_id.as_deref(), Some("123456"));
        assert_eq!(likee.platform, Platform::Likee);

        let other = service.extract_video_id("https://example.com/clip").unwrap();
        assert_eq!(other.video_id, None);
        assert_eq!(other.platform, Platform::Other);

        let error = service.extract_video_id("   ").unwrap_err();
        assert_eq!(error.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn lookup_never_echoes_the_key() {
        let lookup = service(Some("super-secret"))
            .extract_video_id("https://youtu.be/dQw4w9WgXcQ")
            .unwrap();
        let body = serde_json::to_string(&lookup).unwrap();
        assert!(!body.contains("super-secret"));
        assert!(body.contains("\"platform\":\"youtube\""));
    }

    #[tokio::test]
    async fn likee_info_rejects_other_hosts() {
        let error = service(None)
            .likee_info("https://vk.com/video1_2")
            .await
            .unwrap_err();
        assert_eq!(error.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn youtube_info_requires_a_key() {
        let error = service(None).youtube_info("dQw4w9WgXcQ").await.unwrap_err();
        assert_eq!(error.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn instagram_cookies_only_with_full_credentials() {
        let service = service(None);
        let partial = Credentials {
            sessionid: Some("s".into()),
            ..Credentials::default()
        };
        assert!(
            service
                .cookie_file("https://instagram.com/reel/x", &partial)
                .await
                .unwrap()
                .is_none()
        );

        let full = Credentials {
            sessionid: Some("s".into()),
            csrftoken: Some("c".into()),
            ds_user_id: Some("1".into()),
        };
        assert!(
            service
                .cookie_file("https://vk.com/video1_2", &full)
                .await
                .unwrap()
                .is_none()
        );

        let cookies = service
            .cookie_file("https://www.instagram.com/reel/x", &full)
            .await
            .unwrap()
            .unwrap();
        assert!(cookies.path().exists());
        cookies.remove().await;
    }

    #[tokio::test]
    async fn youtube_links_use_the_data_api_when_configured() {
        use wiremock::matchers::{method, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("id", "dQw4w9WgXcQ"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"snippet": {"title": "From API"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let service = service(Some("key"))
            .with_youtube_endpoint(server.uri())
            .with_ytdlp(YtDlp::new(None, 5).with_binary("yt-dlp-binary-that-does-not-exist"));

        let info = service
            .video_info("https://www.youtube.com/watch?v=dQw4w9WgXcQ", &Credentials::default())
            .await
            .unwrap();
        assert_eq!(info.title.as_deref(), Some("From API"));
    }

    #[tokio::test]
    async fn youtube_api_failure_falls_back_to_ytdlp() {
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .mount(&server)
            .await;

        let service = service(Some("key"))
            .with_youtube_endpoint(server.uri())
            .with_ytdlp(YtDlp::new(None, 5).with_binary("yt-dlp-binary-that-does-not-exist"));

        // The 404 from the API is swallowed; the missing binary is what surfaces.
        let error = service
            .video_info("https://youtu.be/dQw4w9WgXcQ", &Credentials::default())
            .await
            .unwrap_err();
        assert_eq!(error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(error.message.contains("yt-dlp"));
    }

    #[test]
    fn maps_likee_result_into_summary_shape() {
        let mut result = ExtractionResult::new("https://cdn.like/v.mp4", "json");
        result.title = "dance".into();
        result.author = "ann".into();
        result.views = 1_750_000;
        result.shares = 3;
        result.post_id = Some("123".into());
        result.thumbnail = Some("@https://img/t.jpg".into());

        let info = likee_video_info(result, "https://likee.video/@ann/video/123");
        assert_eq!(info.likee_video_url(), Some("https://cdn.like/v.mp4"));
        assert_eq!(info.thumbnail.as_deref(), Some("https://img/t.jpg"));

        let summary = crate::models::ParseSummary::from_info(info, "https://likee.video/@ann/video/123");
        let body = serde_json::to_value(&summary).unwrap();
        assert_eq!(body["platform"], json!("likee"));
        assert_eq!(body["views"], json!(1_750_000));
        assert_eq!(body["shares"], json!(3));
        assert_eq!(body["post_id"], json!("123"));
        assert_eq!(body["description"], json!("dance"));
        assert!(body.get("video_url").is_none());
    }
}
