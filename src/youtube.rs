use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::error::ApiError;
use crate::http::HttpFetcher;
use crate::models::{PlatformExtras, VideoInfo};

pub const YOUTUBE_API_URL: &str = "https://www.googleapis.com/youtube/v3/videos";
const YOUTUBE_API_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_TITLE: &str = "YouTube Video";
const DEFAULT_CHANNEL: &str = "Unknown Channel";

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
    #[serde(default)]
    content_details: ContentDetails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: Option<String>,
    channel_title: Option<String>,
    channel_id: Option<String>,
    description: Option<String>,
    published_at: Option<String>,
    category_id: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    maxres: Option<Thumbnail>,
    high: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: Option<String>,
}

/// Counters come back as decimal strings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

/// `endpoint` is [`YOUTUBE_API_URL`] outside of tests.
pub async fn fetch_youtube_info(
    fetcher: &HttpFetcher,
    endpoint: &str,
    api_key: Option<&str>,
    video_id: &str,
) -> Result<VideoInfo, ApiError> {
    let Some(api_key) = api_key else {
        return Err(ApiError::internal("API key not configured"));
    };

    let request_url = Url::parse_with_params(
        endpoint,
        [
            ("part", "snippet,statistics,contentDetails"),
            ("id", video_id),
            ("key", api_key),
        ],
    )
    .map_err(|error| ApiError::internal(format!("URL de YouTube API invalida: {error}")))?;

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let response = fetcher
        .get(
            request_url.as_str(),
            headers,
            Duration::from_secs(YOUTUBE_API_TIMEOUT_SECONDS),
        )
        .await
        .map_err(|error| {
            ApiError::internal(format!("Error al consultar YouTube API: {error}"))
        })?;

    match response.status() {
        StatusCode::OK => {}
        StatusCode::FORBIDDEN => {
            return Err(ApiError::forbidden(
                "Acceso denegado por YouTube API. Revisa la cuota y la clave.",
            ));
        }
        status => {
            return Err(ApiError::internal(format!(
                "YouTube API respondio con estado {status}"
            )));
        }
    }

    let body = response.json::<VideoListResponse>().await.map_err(|error| {
        ApiError::internal(format!("Respuesta de YouTube API no valida: {error}"))
    })?;

    let Some(item) = body.items.into_iter().next() else {
        debug!("YouTube API no devolvio items para {video_id}");
        return Err(ApiError::not_found(format!(
            "Video de YouTube {video_id} no encontrado o no disponible"
        )));
    };

    info!("Metadatos de YouTube obtenidos por API para {video_id}");
    Ok(into_video_info(item, video_id))
}

fn into_video_info(item: VideoItem, video_id: &str) -> VideoInfo {
    let VideoItem {
        snippet,
        statistics,
        content_details,
    } = item;

    let thumbnail = snippet
        .thumbnails
        .maxres
        .and_then(|thumbnail| thumbnail.url)
        .or_else(|| snippet.thumbnails.high.and_then(|thumbnail| thumbnail.url));

    VideoInfo {
        title: Some(snippet.title.unwrap_or_else(|| DEFAULT_TITLE.to_string())),
        uploader: Some(
            snippet
                .channel_title
                .unwrap_or_else(|| DEFAULT_CHANNEL.to_string()),
        ),
        view_count: Some(parse_count(statistics.view_count.as_deref())),
        like_count: Some(parse_count(statistics.like_count.as_deref())),
        comment_count: Some(parse_count(statistics.comment_count.as_deref())),
        thumbnail,
        description: Some(snippet.description.unwrap_or_default()),
        comments: Vec::new(),
        webpage_url: format!("https://youtube.com/watch?v={video_id}"),
        extras: Some(PlatformExtras::Youtube {
            video_id: video_id.to_string(),
            channel_id: snippet.channel_id,
            upload_date: snippet.published_at,
            duration: content_details.duration,
            tags: snippet.tags,
            category_id: snippet.category_id,
        }),
    }
}

fn parse_count(value: Option<&str>) -> u64 {
    value
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RetryPolicy;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(None, RetryPolicy::without_backoff()).unwrap()
    }

    #[tokio::test]
    async fn maps_video_resource() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/videos"))
            .and(query_param("id", "dQw4w9WgXcQ"))
            .and(query_param("key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "snippet": {
                        "title": "Never",
                        "channelTitle": "Rick",
                        "channelId": "UC1",
                        "publishedAt": "2009-10-25T06:57:33Z",
                        "categoryId": "10",
                        "tags": ["a", "b"],
                        "thumbnails": {"high": {"url": "https://i.ytimg.com/hq.jpg"}}
                    },
                    "statistics": {"viewCount": "1500", "likeCount": "20"},
                    "contentDetails": {"duration": "PT3M33S"}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = format!("{}/videos", server.uri());
        let info = fetch_youtube_info(&fetcher(), &endpoint, Some("secret"), "dQw4w9WgXcQ")
            .await
            .unwrap();

        assert_eq!(info.title.as_deref(), Some("Never"));
        assert_eq!(info.uploader.as_deref(), Some("Rick"));
        assert_eq!(info.view_count, Some(1500));
        assert_eq!(info.comment_count, Some(0));
        assert_eq!(info.thumbnail.as_deref(), Some("https://i.ytimg.com/hq.jpg"));
        match info.extras {
            Some(PlatformExtras::Youtube {
                video_id,
                channel_id,
                duration,
                tags,
                ..
            }) => {
                assert_eq!(video_id, "dQw4w9WgXcQ");
                assert_eq!(channel_id.as_deref(), Some("UC1"));
                assert_eq!(duration.as_deref(), Some("PT3M33S"));
                assert_eq!(tags, vec!["a", "b"]);
            }
            other => panic!("unexpected extras {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_items_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .mount(&server)
            .await;

        let error = fetch_youtube_info(&fetcher(), &server.uri(), Some("k"), "xxxxxxxxxxx")
            .await
            .unwrap_err();
        assert_eq!(error.status, axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_key_is_internal_error() {
        let error = fetch_youtube_info(&fetcher(), YOUTUBE_API_URL, None, "xxxxxxxxxxx")
            .await
            .unwrap_err();
        assert_eq!(error.status, axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.message, "API key not configured");
    }

    #[test]
    fn prefers_maxres_thumbnail_and_defaults_names() {
        let item: VideoItem = serde_json::from_value(json!({
            "snippet": {"thumbnails": {
                "maxres": {"url": "https://i.ytimg.com/max.jpg"},
                "high": {"url": "https://i.ytimg.com/hq.jpg"}
            }}
        }))
        .unwrap();

        let info = into_video_info(item, "abc");
        assert_eq!(info.thumbnail.as_deref(), Some("https://i.ytimg.com/max.jpg"));
        assert_eq!(info.title.as_deref(), Some(DEFAULT_TITLE));
        assert_eq!(info.uploader.as_deref(), Some(DEFAULT_CHANNEL));
        assert_eq!(info.webpage_url, "https://youtube.com/watch?v=abc");
    }
}
