use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

static ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"/video/(\d+)",
        r"postId=(\d+)",
        r"/v/([a-zA-Z0-9]+)",
        r"@[\w.]+/video/(\d+)",
        r"l\.likee\.video/v/([^/?&]+)",
        r"postid=(\d+)",
    ]
    .iter()
    .map(|pattern| {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .expect("likee id pattern")
    })
    .collect()
});

pub fn extract_id(url: &str) -> Option<String> {
    ID_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(url))
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_numeric_video_segment() {
        assert_eq!(
            extract_id("likee.video/@user/video/123456").as_deref(),
            Some("123456")
        );
        assert_eq!(
            extract_id("https://likee.video/@some.user/video/7001?lang=en").as_deref(),
            Some("7001")
        );
    }

    #[test]
    fn reads_post_id_query() {
        assert_eq!(
            extract_id("https://likee.video/share?postId=98765").as_deref(),
            Some("98765")
        );
        assert_eq!(
            extract_id("https://likee.video/share?POSTID=55").as_deref(),
            Some("55")
        );
    }

    #[test]
    fn reads_short_link_code() {
        assert_eq!(
            extract_id("https://l.likee.video/v/AbC12x").as_deref(),
            Some("AbC12x")
        );
    }

    #[test]
    fn unknown_shapes_have_no_id() {
        assert_eq!(extract_id("https://likee.video/@user"), None);
        assert_eq!(extract_id("https://likee.video/"), None);
    }
}
