use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use super::LIKEE_TITLE;
use crate::models::ExtractionResult;

pub const META_SOURCE: &str = "meta_tags";

struct MetaPatterns {
    title: Vec<Regex>,
    description: Vec<Regex>,
    video_url: Vec<Regex>,
    thumbnail: Vec<Regex>,
}

fn meta_tag(attribute: &str, name: &str) -> String {
    format!(
        r#"<meta[^>]*{attribute}=["']{name}["'][^>]*content=["']([^"']*)["']"#,
        name = regex::escape(name)
    )
}

fn compile(patterns: Vec<String>) -> Vec<Regex> {
    patterns
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .expect("meta tag pattern")
        })
        .collect()
}

static PATTERNS: LazyLock<MetaPatterns> = LazyLock::new(|| MetaPatterns {
    title: compile(vec![
        meta_tag("property", "og:title"),
        meta_tag("name", "twitter:title"),
        r"<title[^>]*>([^<]*)</title>".to_string(),
    ]),
    description: compile(vec![
        meta_tag("property", "og:description"),
        meta_tag("name", "description"),
    ]),
    video_url: compile(vec![
        meta_tag("property", "og:video"),
        meta_tag("property", "og:video:url"),
        meta_tag("property", "og:video:secure_url"),
        meta_tag("name", "twitter:player:stream"),
    ]),
    thumbnail: compile(vec![
        meta_tag("property", "og:image"),
        meta_tag("name", "twitter:image"),
    ]),
});

fn first_match(patterns: &[Regex], html: &str) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        pattern
            .captures(html)
            .and_then(|captures| captures.get(1))
            .map(|value| value.as_str().trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

pub fn extract_from_meta(html: &str) -> Option<ExtractionResult> {
    let video_url = first_match(&PATTERNS.video_url, html)?;

    let mut result = ExtractionResult::new(video_url, META_SOURCE);
    result.title = first_match(&PATTERNS.title, html).unwrap_or_else(|| LIKEE_TITLE.to_string());
    result.description = first_match(&PATTERNS.description, html);
    result.thumbnail = first_match(&PATTERNS.thumbnail, html);
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UNKNOWN_AUTHOR;

    #[test]
    fn reads_open_graph_tags() {
        let html = r#"<html><head>
            <title>Fallback title</title>
            <meta property="og:title" content="Dance clip">
            <meta property="og:description" content="so good">
            <meta property="og:image" content="https://img/cover.jpg">
            <meta property="og:video" content="https://cdn/clip.mp4">
        </head></html>"#;

        let result = extract_from_meta(html).unwrap();
        assert_eq!(result.video_url, "https://cdn/clip.mp4");
        assert_eq!(result.title, "Dance clip");
        assert_eq!(result.description.as_deref(), Some("so good"));
        assert_eq!(result.thumbnail.as_deref(), Some("https://img/cover.jpg"));
        assert_eq!(result.author, UNKNOWN_AUTHOR);
        assert_eq!(result.source, META_SOURCE);
    }

    #[test]
    fn falls_back_through_tag_variants() {
        let html = r#"<TITLE>Page</TITLE>
            <META PROPERTY='og:video:url' CONTENT='https://cdn/v.mp4'>
            <meta name="twitter:image" content="https://img/t.jpg">"#;

        let result = extract_from_meta(html).unwrap();
        assert_eq!(result.video_url, "https://cdn/v.mp4");
        assert_eq!(result.title, "Page");
        assert_eq!(result.thumbnail.as_deref(), Some("https://img/t.jpg"));
    }

    #[test]
    fn requires_video_tag() {
        let html = r#"<meta property="og:title" content="Only a title">"#;
        assert!(extract_from_meta(html).is_none());
    }

    #[test]
    fn blank_values_do_not_count() {
        let html = r#"<meta property="og:video" content="  ">"#;
        assert!(extract_from_meta(html).is_none());
    }

    #[test]
    fn defaults_title_when_missing() {
        let html = r#"<meta property="og:video" content="https://cdn/v.mp4">"#;
        assert_eq!(extract_from_meta(html).unwrap().title, LIKEE_TITLE);
    }
}
