use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use tracing::{debug, info};

use super::meta::extract_from_meta;
use super::miner::{mine, normalize_media_url};
use super::{LIKEE_TITLE, LikeeExtractor};
use crate::http::browser_headers;
use crate::models::ExtractionResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Blob,
    DirectUrl,
}

struct PagePattern {
    name: &'static str,
    regex: Regex,
    capture: Capture,
}

static PAGE_PATTERNS: LazyLock<Vec<PagePattern>> = LazyLock::new(|| {
    [
        ("window.data", r"window\.data\s*=\s*(\{[^;]+\});", Capture::Blob),
        ("__INITIAL_STATE__", r"__INITIAL_STATE__\s*=\s*(\{.+?\});", Capture::Blob),
        (
            "window.__INITIAL_STATE__",
            r"window\.__INITIAL_STATE__\s*=\s*(\{.+?\});",
            Capture::Blob,
        ),
        ("window.__NUXT__", r"window\.__NUXT__\s*=\s*(\{.+?\});", Capture::Blob),
        (
            "json-ld",
            r#"<script[^>]*type=["']application/ld\+json["'][^>]*>\s*(\{.+?\})\s*</script>"#,
            Capture::Blob,
        ),
        ("videoUrl", r#""videoUrl"\s*:\s*"([^"]+)""#, Capture::DirectUrl),
        ("playUrl", r#""playUrl"\s*:\s*"([^"]+)""#, Capture::DirectUrl),
        ("video_url", r#""video_url"\s*:\s*"([^"]+)""#, Capture::DirectUrl),
    ]
    .into_iter()
    .map(|(name, pattern, capture)| PagePattern {
        name,
        regex: RegexBuilder::new(pattern)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()
            .expect("page pattern"),
        capture,
    })
    .collect()
});

impl LikeeExtractor {
    pub async fn extract_via_page(&self, url: &str) -> Option<ExtractionResult> {
        self.pause(self.config.page_pacing).await;

        let response = match self
            .fetcher
            .get(url, browser_headers(), self.config.page_timeout)
            .await
        {
            Ok(response) => response,
            Err(error) => {
                debug!("No se pudo descargar la pagina {url}: {error}");
                return None;
            }
        };

        let final_url = response.url().to_string();
        if self.is_landing_page(&final_url) {
            info!("La pagina {url} redirigio a {final_url}; se descarta el scraping");
            return None;
        }

        let html = match response.text().await {
            Ok(html) => html,
            Err(error) => {
                debug!("No se pudo leer la pagina {url}: {error}");
                return None;
            }
        };

        extract_from_html(&html)
    }
}

pub fn extract_from_html(html: &str) -> Option<ExtractionResult> {
    PAGE_PATTERNS
        .iter()
        .find_map(|pattern| {
            pattern
                .regex
                .captures_iter(html)
                .filter_map(|captures| captures.get(1))
                .find_map(|capture| match pattern.capture {
                    Capture::DirectUrl => direct_result(capture.as_str(), pattern.name),
                    Capture::Blob => blob_result(capture.as_str(), pattern.name),
                })
        })
        .or_else(|| extract_from_meta(html))
}

fn direct_result(raw: &str, source: &str) -> Option<ExtractionResult> {
    let video_url = normalize_media_url(raw)?;
    debug!("Enlace directo encontrado por {source}");

    let mut result = ExtractionResult::new(video_url, source);
    result.title = LIKEE_TITLE.to_string();
    Some(result)
}

fn blob_result(raw: &str, source: &str) -> Option<ExtractionResult> {
    let unescaped = raw.replace("\\\"", "\"").replace("\\/", "/");
    let document = match serde_json::from_str::<Value>(&unescaped) {
        Ok(document) => document,
        Err(error) => {
            debug!("Bloque {source} no es JSON valido: {error}");
            return None;
        }
    };

    mine(&document).map(|result| result.with_source(source))
}
