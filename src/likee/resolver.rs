use tracing::{debug, warn};

use super::LikeeExtractor;
use crate::error::ExtractError;
use crate::http::browser_headers;

impl LikeeExtractor {
    /// Network failures are not fatal: the link is handed back unchanged. When
    /// the redirect chain ends on a landing page the content looks gone, but
    /// short links sometimes do that too, so the cascade gets one chance on the
    /// original link before the link is reported as [`ExtractError::NotFound`].
    pub async fn resolve(&self, url: &str) -> Result<String, ExtractError> {
        let response = match self
            .fetcher
            .head(url, browser_headers(), self.config.resolve_timeout)
            .await
        {
            Ok(response) => response,
            Err(error) => {
                debug!("No se pudo resolver {url}: {error}; se usa tal cual");
                return Ok(url.to_string());
            }
        };

        let final_url = response.url().to_string();
        if !self.is_landing_page(&final_url) {
            return Ok(final_url);
        }

        warn!("{url} redirige a {final_url}; probando extraccion directa");
        match self.run_cascade(url).await {
            Ok(_) => Ok(url.to_string()),
            Err(_) => Err(ExtractError::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{LikeeConfig, Pacing};
    use super::*;
    use crate::http::{HttpFetcher, RetryPolicy};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn extractor(server: &MockServer) -> LikeeExtractor {
        let fetcher = HttpFetcher::new(None, RetryPolicy::without_backoff()).unwrap();
        LikeeExtractor::new(
            fetcher,
            LikeeConfig {
                origin: server.uri(),
                site_roots: vec![server.uri()],
                api_endpoints: vec![format!("{}/api?postId={{id}}", server.uri())],
                page_pacing: Pacing::NONE,
                api_pacing: Pacing::NONE,
                ..LikeeConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn follows_redirect_to_content() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/v/abc"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", format!("{}/@u/video/42", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/@u/video/42"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let resolved = extractor(&server)
            .resolve(&format!("{}/v/abc", server.uri()))
            .await
            .unwrap();
        assert_eq!(resolved, format!("{}/@u/video/42", server.uri()));
    }

    #[tokio::test]
    async fn unreachable_host_returns_link_unchanged() {
        let fetcher = HttpFetcher::new(
            None,
            RetryPolicy {
                max_retries: 0,
                ..RetryPolicy::without_backoff()
            },
        )
        .unwrap();
        let extractor = LikeeExtractor::new(fetcher, LikeeConfig::default());

        let url = "http://127.0.0.1:9/@u/video/1";
        assert_eq!(extractor.resolve(url).await.unwrap(), url);
    }

    #[tokio::test]
    async fn soft_404_without_recovery_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/@u/video/7"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("Location", format!("{}/", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        // Recovery attempt: page scrape and API lookup both come back empty.
        Mock::given(method("GET"))
            .and(path("/@u/video/7"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(404))
            .expect(2)
            .mount(&server)
            .await;

        let outcome = extractor(&server)
            .resolve(&format!("{}/@u/video/7", server.uri()))
            .await;
        assert!(matches!(outcome, Err(ExtractError::NotFound)));
    }

    #[tokio::test]
    async fn soft_404_recovered_keeps_original_link() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/@u/video/8"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", format!("{}/trending", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/trending"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/@u/video/8"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<meta property="og:video" content="https://cdn.like/eight.mp4">"#,
            ))
            .mount(&server)
            .await;

        let url = format!("{}/@u/video/8", server.uri());
        assert_eq!(extractor(&server).resolve(&url).await.unwrap(), url);
    }
}
