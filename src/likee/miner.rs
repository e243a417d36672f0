use serde_json::{Map, Value};

use super::numbers::parse_short_number;
use super::{LIKEE_TITLE, MINER_SOURCE};
use crate::models::{ExtractionResult, UNKNOWN_AUTHOR};

const MAX_DEPTH: usize = 10;
const MAX_ARRAY_ITEMS: usize = 5;

const USER_OBJECT_KEYS: [&str; 4] = ["user", "userInfo", "author", "creator"];
const USER_NAME_KEYS: [&str; 4] = ["nickname", "name", "username", "displayName"];
const SKIPPED_KEYS: [&str; 2] = ["toString", "valueOf"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    VideoUrl,
    Title,
    Thumbnail,
    Author,
    AuthorId,
    AuthorUsername,
    PostId,
    Likes,
    Views,
    Comments,
    Shares,
    UploadDate,
    Duration,
    Country,
    Downloads,
    MusicName,
    MusicOwner,
}

const SYNONYMS: [(Field, &[&str]); 17] = [
    (
        Field::VideoUrl,
        &["video_url", "videoUrl", "playUrl", "video", "playAddr", "videoAddr", "mp4Url"],
    ),
    (
        Field::Title,
        &["title", "content", "caption", "desc", "description", "msg_text"],
    ),
    (
        Field::Thumbnail,
        &["coverUrl", "thumbnail", "cover", "thumbUrl", "imageUrl", "image1"],
    ),
    (
        Field::Author,
        &["nick_name", "nickname", "name", "username", "displayName", "user_name"],
    ),
    (Field::AuthorId, &["poster_uid", "uid", "userId", "user_id"]),
    (Field::AuthorUsername, &["user_name", "likeeId", "username"]),
    (Field::PostId, &["post_id", "postId", "id", "video_id"]),
    (Field::Likes, &["like_count", "likeCount", "likes"]),
    (Field::Views, &["video_count", "playCount", "viewCount", "views"]),
    (Field::Comments, &["comment_count", "commentCount", "comments"]),
    (Field::Shares, &["share_count", "shareCount", "shares"]),
    (Field::UploadDate, &["uploadDate", "createTime", "createdAt"]),
    (Field::Duration, &["duration", "ISO8601_duration"]),
    (Field::Country, &["post_country", "country"]),
    (Field::Downloads, &["download_count", "downloadCount", "downloads"]),
    (Field::MusicName, &["music_name", "musicName", "sound_name"]),
    (Field::MusicOwner, &["musicOwnerName", "music_owner"]),
];

#[derive(Debug, Default, Clone)]
struct Fields {
    video_url: Option<String>,
    title: Option<String>,
    thumbnail: Option<String>,
    author: Option<String>,
    author_id: Option<String>,
    author_username: Option<String>,
    post_id: Option<String>,
    likes: Option<u64>,
    views: Option<u64>,
    comments: Option<u64>,
    shares: Option<u64>,
    upload_date: Option<String>,
    duration: Option<String>,
    country: Option<String>,
    downloads: Option<u64>,
    music_name: Option<String>,
    music_owner: Option<String>,
}

impl Fields {
    /// Stores `value` under `field`; returns false when the value is unusable
    /// for that field and the next spelling should be tried.
    fn set(&mut self, field: Field, value: &Value) -> bool {
        let text = || Some(stringify(value));
        let count = || Some(parse_short_number(value));

        match field {
            Field::VideoUrl => match value.as_str().and_then(normalize_media_url) {
                Some(url) => self.video_url = Some(url),
                None => return false,
            },
            Field::Title => self.title = text(),
            Field::Thumbnail => self.thumbnail = text(),
            Field::Author => self.author = text(),
            Field::AuthorId => self.author_id = text(),
            Field::AuthorUsername => self.author_username = text(),
            Field::PostId => self.post_id = text(),
            Field::Likes => self.likes = count(),
            Field::Views => self.views = count(),
            Field::Comments => self.comments = count(),
            Field::Shares => self.shares = count(),
            Field::UploadDate => self.upload_date = text(),
            Field::Duration => self.duration = text(),
            Field::Country => self.country = text(),
            Field::Downloads => self.downloads = count(),
            Field::MusicName => self.music_name = text(),
            Field::MusicOwner => self.music_owner = text(),
        }
        true
    }

    fn fill_defaults(&mut self) {
        self.title.get_or_insert_with(|| LIKEE_TITLE.to_string());
        self.author.get_or_insert_with(|| UNKNOWN_AUTHOR.to_string());
        self.likes.get_or_insert(0);
        self.views.get_or_insert(0);
        self.comments.get_or_insert(0);
        self.shares.get_or_insert(0);
        self.downloads.get_or_insert(0);
    }

    fn absorb(&mut self, parent: Fields) {
        fn keep<T>(slot: &mut Option<T>, fallback: Option<T>) {
            if slot.is_none() {
                *slot = fallback;
            }
        }

        keep(&mut self.video_url, parent.video_url);
        keep(&mut self.title, parent.title);
        keep(&mut self.thumbnail, parent.thumbnail);
        keep(&mut self.author, parent.author);
        keep(&mut self.author_id, parent.author_id);
        keep(&mut self.author_username, parent.author_username);
        keep(&mut self.post_id, parent.post_id);
        keep(&mut self.likes, parent.likes);
        keep(&mut self.views, parent.views);
        keep(&mut self.comments, parent.comments);
        keep(&mut self.shares, parent.shares);
        keep(&mut self.upload_date, parent.upload_date);
        keep(&mut self.duration, parent.duration);
        keep(&mut self.country, parent.country);
        keep(&mut self.downloads, parent.downloads);
        keep(&mut self.music_name, parent.music_name);
        keep(&mut self.music_owner, parent.music_owner);
    }

    fn into_result(self) -> Option<ExtractionResult> {
        let video_url = self.video_url?;
        let mut result = ExtractionResult::new(video_url, MINER_SOURCE);
        result.title = self.title.unwrap_or_else(|| LIKEE_TITLE.to_string());
        result.author = self.author.unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
        result.thumbnail = self.thumbnail;
        result.likes = self.likes.unwrap_or(0);
        result.views = self.views.unwrap_or(0);
        result.comments = self.comments.unwrap_or(0);
        result.shares = self.shares.unwrap_or(0);
        result.downloads = self.downloads.unwrap_or(0);
        result.post_id = self.post_id;
        result.author_id = self.author_id;
        result.author_username = self.author_username;
        result.upload_date = self.upload_date;
        result.duration = self.duration;
        result.country = self.country;
        result.music_name = self.music_name;
        result.music_owner = self.music_owner;
        Some(result)
    }
}

/// The record carries a generic `source`; callers replace it with the matcher
/// or endpoint that supplied the document.
pub fn mine(node: &Value) -> Option<ExtractionResult> {
    find(node, 0).and_then(Fields::into_result)
}

fn find(node: &Value, depth: usize) -> Option<Fields> {
    if depth > MAX_DEPTH {
        return None;
    }

    match node {
        Value::Object(map) => find_in_map(map, depth),
        Value::Array(items) => items
            .iter()
            .take(MAX_ARRAY_ITEMS)
            .find_map(|item| find(item, depth + 1)),
        _ => None,
    }
}

fn find_in_map(map: &Map<String, Value>, depth: usize) -> Option<Fields> {
    let mut fields = collect_fields(map);

    if fields.video_url.is_some() {
        fields.fill_defaults();
        return Some(fields);
    }

    map.iter()
        .filter(|(key, _)| !is_skipped_key(key))
        .find_map(|(_, child)| find(child, depth + 1))
        .map(|mut child| {
            child.absorb(fields);
            child
        })
}

fn collect_fields(map: &Map<String, Value>) -> Fields {
    let mut fields = Fields::default();

    for (field, keys) in SYNONYMS {
        for key in keys {
            if let Some(value) = map.get(*key).filter(|value| is_truthy(value))
                && fields.set(field, value)
            {
                break;
            }
        }
    }

    if fields.author.is_none() {
        fields.author = USER_OBJECT_KEYS
            .iter()
            .filter_map(|key| map.get(*key).and_then(Value::as_object))
            .find_map(|user| {
                USER_NAME_KEYS
                    .iter()
                    .filter_map(|key| user.get(*key))
                    .find(|value| is_truthy(value))
                    .map(stringify)
            });
    }

    fields
}

fn is_skipped_key(key: &str) -> bool {
    key.starts_with('_') || key.starts_with('$') || SKIPPED_KEYS.contains(&key)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|number| number != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

pub(crate) fn normalize_media_url(raw: &str) -> Option<String> {
    if !(raw.contains("http") || raw.starts_with("//")) {
        return None;
    }

    let clean = raw.replace("\\/", "/").replace("\\u0026", "&");
    if clean.starts_with("http") {
        Some(clean)
    } else {
        Some(format!("https:{clean}"))
    }
}
