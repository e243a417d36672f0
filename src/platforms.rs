use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

const YOUTUBE_MARKERS: [&str; 4] = ["youtube.com", "youtu.be", "m.youtube.com", "www.youtube.com"];
const LIKEE_MARKERS: [&str; 2] = ["likee.video", "likee.com"];
const INSTAGRAM_MARKERS: [&str; 2] = ["instagram.com/", "instagr.am/"];
const VK_MARKERS: [&str; 8] = [
    "vk.com/video",
    "vk.com/clip",
    "vk.ru/video",
    "vk.ru/clip",
    "vkvideo.ru/clip",
    "vkvideo.ru/video",
    "m.vk.com/video",
    "m.vk.ru/video",
];
const TIKTOK_MARKERS: [&str; 3] = ["tiktok.com/", "vm.tiktok.com/", "m.tiktok.com/"];

static YOUTUBE_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"youtube\.com/watch\?v=([a-zA-Z0-9_-]{11})",
        r"youtu\.be/([a-zA-Z0-9_-]{11})",
        r"youtube\.com/embed/([a-zA-Z0-9_-]{11})",
        r"youtube\.com/shorts/([a-zA-Z0-9_-]{11})",
        r"m\.youtube\.com/watch\?v=([a-zA-Z0-9_-]{11})",
        r"youtube\.com/v/([a-zA-Z0-9_-]{11})",
        r"^([a-zA-Z0-9_-]{11})$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("youtube id pattern"))
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Likee,
    Instagram,
    Vk,
    Tiktok,
    Other,
}

impl Platform {
    pub fn detect(url: &str) -> Self {
        let lower = url.to_lowercase();

        if contains_any(&lower, &YOUTUBE_MARKERS) {
            Self::Youtube
        } else if contains_any(&lower, &LIKEE_MARKERS) {
            Self::Likee
        } else if contains_any(&lower, &INSTAGRAM_MARKERS) {
            Self::Instagram
        } else if contains_any(&lower, &VK_MARKERS) {
            Self::Vk
        } else if contains_any(&lower, &TIKTOK_MARKERS) {
            Self::Tiktok
        } else {
            Self::Other
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Likee => "likee",
            Self::Instagram => "instagram",
            Self::Vk => "vk",
            Self::Tiktok => "tiktok",
            Self::Other => "other",
        }
    }
}

fn contains_any(haystack: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| haystack.contains(marker))
}

pub fn is_likee_url(url: &str) -> bool {
    Platform::detect(url) == Platform::Likee
}

pub fn youtube_video_id(url: &str) -> Option<String> {
    let url = url.trim();
    YOUTUBE_ID_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(url))
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str().to_string())
}

pub fn clean_thumbnail_url(thumbnail: &str) -> String {
    let trimmed = thumbnail.trim_start_matches('@');
    match trimmed.find("http") {
        Some(index) => trimmed[index..].to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_platforms() {
        assert_eq!(Platform::detect("https://youtu.be/dQw4w9WgXcQ"), Platform::Youtube);
        assert_eq!(Platform::detect("https://likee.video/@a/video/1"), Platform::Likee);
        assert_eq!(Platform::detect("https://l.likee.video/v/abc"), Platform::Likee);
        assert_eq!(Platform::detect("https://www.instagram.com/reel/x/"), Platform::Instagram);
        assert_eq!(Platform::detect("https://vk.com/clip-1_2"), Platform::Vk);
        assert_eq!(Platform::detect("https://vm.tiktok.com/ZM123/"), Platform::Tiktok);
        assert_eq!(Platform::detect("https://example.com/x"), Platform::Other);
    }

    #[test]
    fn extracts_youtube_ids() {
        assert_eq!(
            youtube_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=1").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            youtube_video_id("https://youtube.com/shorts/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(youtube_video_id("dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(youtube_video_id("https://youtube.com/channel/abc"), None);
    }

    #[test]
    fn cleans_thumbnails() {
        assert_eq!(clean_thumbnail_url("@https://img/x.jpg"), "https://img/x.jpg");
        assert_eq!(clean_thumbnail_url("@@xxhttps://img/x.jpg"), "https://img/x.jpg");
        assert_eq!(clean_thumbnail_url("https://img/x.jpg"), "https://img/x.jpg");
        assert_eq!(clean_thumbnail_url("no-link"), "");
    }
}
