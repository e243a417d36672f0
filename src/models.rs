use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const UNTITLED: &str = "Untitled Video";
pub const UNKNOWN_AUTHOR: &str = "Unknown";

const MEDIA_TOKENS: [&str; 5] = ["mp4", "video", ".m3u8", ".webm", ".mov"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub video_url: String,
    pub title: String,
    pub author: String,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
    pub likes: u64,
    pub views: u64,
    pub comments: u64,
    pub shares: u64,
    pub downloads: u64,
    pub post_id: Option<String>,
    pub author_id: Option<String>,
    pub author_username: Option<String>,
    pub upload_date: Option<String>,
    pub duration: Option<String>,
    pub country: Option<String>,
    pub music_name: Option<String>,
    pub music_owner: Option<String>,
    pub source: String,
}

impl ExtractionResult {
    pub fn new(video_url: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            video_url: video_url.into(),
            title: UNTITLED.to_string(),
            author: UNKNOWN_AUTHOR.to_string(),
            thumbnail: None,
            description: None,
            likes: 0,
            views: 0,
            comments: 0,
            shares: 0,
            downloads: 0,
            post_id: None,
            author_id: None,
            author_username: None,
            upload_date: None,
            duration: None,
            country: None,
            music_name: None,
            music_owner: None,
            source: source.into(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Acceptance gate: an absolute http(s) link that looks like a media file.
    pub fn is_usable(&self) -> bool {
        let url = self.video_url.trim().to_ascii_lowercase();
        (url.starts_with("http://") || url.starts_with("https://"))
            && MEDIA_TOKENS.iter().any(|token| url.contains(token))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "platform", rename_all = "lowercase")]
pub enum PlatformExtras {
    Youtube {
        video_id: String,
        channel_id: Option<String>,
        upload_date: Option<String>,
        duration: Option<String>,
        tags: Vec<String>,
        category_id: Option<String>,
    },
    Likee {
        #[serde(skip_serializing)]
        video_url: String,
        post_id: Option<String>,
        author_id: Option<String>,
        upload_date: Option<String>,
        shares: u64,
        downloads: u64,
    },
}

#[derive(Debug, Clone, Default)]
pub struct VideoInfo {
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub comment_count: Option<u64>,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
    pub comments: Vec<Value>,
    pub webpage_url: String,
    pub extras: Option<PlatformExtras>,
}

impl VideoInfo {
    pub fn likee_video_url(&self) -> Option<&str> {
        match &self.extras {
            Some(PlatformExtras::Likee { video_url, .. }) => Some(video_url.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParseSummary {
    pub title: String,
    pub author: String,
    pub views: Option<u64>,
    pub likes: Option<u64>,
    pub comment_count: u64,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
    pub comments: Vec<Value>,
    pub url: String,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub extras: Option<PlatformExtras>,
}

impl ParseSummary {
    pub fn from_info(info: VideoInfo, url: &str) -> Self {
        let comment_count = info
            .comment_count
            .unwrap_or(info.comments.len() as u64);

        Self {
            title: info
                .title
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| UNTITLED.to_string()),
            author: info
                .uploader
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| "Unknown author".to_string()),
            views: info.view_count,
            likes: info.like_count,
            comment_count,
            thumbnail: info.thumbnail.as_deref().map(crate::platforms::clean_thumbnail_url),
            description: info.description,
            comments: info.comments,
            url: url.to_string(),
            extras: info.extras,
        }
    }
}
