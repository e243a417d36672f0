mod api;
mod ids;
mod meta;
mod miner;
mod numbers;
mod page;
mod resolver;

use std::time::Duration;

use rand::Rng;
use tracing::{debug, info};

use crate::error::ExtractError;
use crate::http::HttpFetcher;
use crate::models::ExtractionResult;

pub use api::{api_candidates, mine_api_response};
pub use ids::extract_id;
pub use meta::{META_SOURCE, extract_from_meta};
pub use miner::mine;
pub use numbers::{parse_short_number, parse_short_number_str};
pub use page::extract_from_html;

pub const LIKEE_TITLE: &str = "Likee Video";
pub(crate) const MINER_SOURCE: &str = "json";

const LANDING_MARKERS: [&str; 4] = ["trending", "m_index", "/home", "/explore"];

const DEFAULT_API_ENDPOINTS: [&str; 4] = [
    "https://api.like-video.com/likee-activity-flow-proxy/videoApi/getVideoInfo?postIds={id}",
    "https://likee.video/official_website/videoinfo/get?postId={id}",
    "https://api.likee.video/rest/n/video/info?postId={id}",
    "https://likee.video/rest/n/video/info?postId={id}",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub min: Duration,
    pub max: Duration,
}

impl Pacing {
    pub const NONE: Self = Self {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    pub const fn between_millis(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_millis(min),
            max: Duration::from_millis(max),
        }
    }

    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

#[derive(Debug, Clone)]
pub struct LikeeConfig {
    pub origin: String,
    /// Bare roots the site redirects to instead of answering 404.
    pub site_roots: Vec<String>,
    /// Private endpoints; `{id}` is replaced with the post id.
    pub api_endpoints: Vec<String>,
    pub page_pacing: Pacing,
    pub api_pacing: Pacing,
    pub page_timeout: Duration,
    pub api_timeout: Duration,
    pub resolve_timeout: Duration,
}

impl Default for LikeeConfig {
    fn default() -> Self {
        Self {
            origin: "https://likee.video".to_string(),
            site_roots: vec![
                "https://likee.video".to_string(),
                "https://www.likee.video".to_string(),
            ],
            api_endpoints: DEFAULT_API_ENDPOINTS.iter().map(ToString::to_string).collect(),
            page_pacing: Pacing::between_millis(1_000, 3_000),
            api_pacing: Pacing::between_millis(500, 2_000),
            page_timeout: Duration::from_secs(30),
            api_timeout: Duration::from_secs(15),
            resolve_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    PageHeuristic,
    PrivateApi,
}

impl Strategy {
    pub const CASCADE: [Strategy; 2] = [Strategy::PageHeuristic, Strategy::PrivateApi];

    pub fn name(self) -> &'static str {
        match self {
            Self::PageHeuristic => "page",
            Self::PrivateApi => "api",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LikeeExtractor {
    fetcher: HttpFetcher,
    config: LikeeConfig,
}

impl LikeeExtractor {
    pub fn new(fetcher: HttpFetcher, config: LikeeConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &LikeeConfig {
        &self.config
    }

    /// Resolution is advisory: a soft-404 verdict from the resolver is logged
    /// and extraction carries on with the original link.
    pub async fn extract_info(&self, url: &str) -> Result<ExtractionResult, ExtractError> {
        let url = normalize_input_url(url)?;

        let target = match self.resolve(&url).await {
            Ok(resolved) => resolved,
            Err(error) => {
                info!("Resolucion de {url} sin exito ({error}); se continua con la URL original");
                url.clone()
            }
        };

        self.run_cascade(&target).await
    }

    pub(crate) async fn run_cascade(&self, url: &str) -> Result<ExtractionResult, ExtractError> {
        for strategy in Strategy::CASCADE {
            debug!("Likee {url}: probando estrategia {}", strategy.name());
            let attempt = match strategy {
                Strategy::PageHeuristic => self.extract_via_page(url).await,
                Strategy::PrivateApi => self.extract_via_api(url).await,
            };

            match attempt {
                Some(result) if result.is_usable() => {
                    info!(
                        "Likee {url}: estrategia {} obtuvo video (fuente {})",
                        strategy.name(),
                        result.source
                    );
                    return Ok(result);
                }
                Some(result) => {
                    debug!(
                        "Likee {url}: estrategia {} devolvio un enlace no multimedia {:?}",
                        strategy.name(),
                        result.video_url
                    );
                }
                None => debug!("Likee {url}: estrategia {} sin resultado", strategy.name()),
            }
        }

        info!("Likee {url}: todas las estrategias agotadas");
        Err(ExtractError::NotFound)
    }

    pub fn is_landing_page(&self, final_url: &str) -> bool {
        let lower = final_url.to_lowercase();
        if LANDING_MARKERS.iter().any(|marker| lower.contains(marker)) {
            return true;
        }

        let bare = final_url.trim_end_matches('/');
        self.config
            .site_roots
            .iter()
            .any(|root| root.trim_end_matches('/') == bare)
    }

    async fn pause(&self, pacing: Pacing) {
        let wait = pacing.sample();
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

pub fn normalize_input_url(url: &str) -> Result<String, ExtractError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::InvalidUrl(url.to_string()));
    }

    if trimmed.starts_with("http") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("https://{trimmed}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RetryPolicy;

    fn extractor() -> LikeeExtractor {
        let fetcher = HttpFetcher::new(None, RetryPolicy::without_backoff()).unwrap();
        LikeeExtractor::new(fetcher, LikeeConfig::default())
    }

    #[test]
    fn normalizes_input_urls() {
        assert_eq!(
            normalize_input_url("  likee.video/@user/video/1 ").unwrap(),
            "https://likee.video/@user/video/1"
        );
        assert_eq!(
            normalize_input_url("http://likee.video/x").unwrap(),
            "http://likee.video/x"
        );
        assert!(matches!(
            normalize_input_url("   "),
            Err(ExtractError::InvalidUrl(_))
        ));
    }

    #[test]
    fn detects_landing_pages() {
        let extractor = extractor();
        assert!(extractor.is_landing_page("https://likee.video/"));
        assert!(extractor.is_landing_page("https://www.likee.video"));
        assert!(extractor.is_landing_page("https://likee.video/trending?lang=en"));
        assert!(extractor.is_landing_page("https://m.likee.video/m_index"));
        assert!(extractor.is_landing_page("https://likee.video/home"));
        assert!(!extractor.is_landing_page("https://likee.video/@user/video/123"));
    }

    #[test]
    fn pacing_stays_in_range() {
        let pacing = Pacing::between_millis(10, 20);
        for _ in 0..50 {
            let wait = pacing.sample();
            assert!(wait >= Duration::from_millis(10) && wait <= Duration::from_millis(20));
        }
        assert_eq!(Pacing::NONE.sample(), Duration::ZERO);
    }

    #[test]
    fn cascade_order_is_fixed() {
        assert_eq!(
            Strategy::CASCADE,
            [Strategy::PageHeuristic, Strategy::PrivateApi]
        );
    }
}
