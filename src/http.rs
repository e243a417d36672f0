use std::time::Duration;

use rand::seq::SliceRandom;
use reqwest::{
    Client, Method, Response, StatusCode,
    header::{
        ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CACHE_CONTROL, CONTENT_TYPE, HeaderMap,
        HeaderName, HeaderValue, ORIGIN, REFERER, RETRY_AFTER, USER_AGENT,
    },
};
use tracing::{debug, warn};

use crate::error::FetchError;

const MOBILE_USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 12; SM-G991B) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/103.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 15_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.0 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 11; Pixel 5) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/100.0.4896.79 Mobile Safari/537.36",
];
const APP_USER_AGENT: &str = "Likee/4.0.0 (iPhone; iOS 15.0; Scale/3.00)";
const WEBVIEW_USER_AGENT: &str =
    "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) AppleWebKit/605.1.15";

pub const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];
const MAX_REDIRECTS: usize = 10;
const BACKOFF_MAX: Duration = Duration::from_secs(120);
const POOL_IDLE_TIMEOUT_SECONDS: u64 = 90;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries on top of the first attempt.
    pub max_retries: u32,
    pub backoff_factor: Duration,
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: Duration::from_secs(1),
            retry_statuses: RETRY_STATUSES.to_vec(),
        }
    }
}

impl RetryPolicy {
    pub fn without_backoff() -> Self {
        Self {
            backoff_factor: Duration::ZERO,
            ..Self::default()
        }
    }

    fn retries_status(&self, status: StatusCode) -> bool {
        self.retry_statuses.contains(&status.as_u16())
    }

    /// Wait before the `retry`-th retry (1-based). The first retry goes out
    /// immediately, later ones double from `backoff_factor`.
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry <= 1 {
            return Duration::ZERO;
        }

        let exponent = (retry - 1).min(16);
        self.backoff_factor
            .saturating_mul(1u32 << exponent)
            .min(BACKOFF_MAX)
    }
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(proxy_url: Option<&str>, retry: RetryPolicy) -> Result<Self, FetchError> {
        Self::with_read_timeout(proxy_url, retry, DEFAULT_READ_TIMEOUT)
    }

    pub fn with_read_timeout(
        proxy_url: Option<&str>,
        retry: RetryPolicy,
        read_timeout: Duration,
    ) -> Result<Self, FetchError> {
        let mut builder = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .pool_idle_timeout(Duration::from_secs(POOL_IDLE_TIMEOUT_SECONDS))
            .read_timeout(read_timeout);

        if let Some(url) = proxy_url {
            let proxy = reqwest::Proxy::all(url).map_err(|source| FetchError::InvalidProxy {
                url: url.to_string(),
                source,
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(FetchError::Build)?;
        Ok(Self { client, retry })
    }

    pub async fn get(
        &self,
        url: &str,
        headers: HeaderMap,
        timeout: Duration,
    ) -> Result<Response, FetchError> {
        self.send(Method::GET, url, headers, Some(timeout)).await
    }

    /// GET for long bodies: no deadline on the whole transfer, only the
    /// client's read timeout between chunks.
    pub async fn get_streaming(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> Result<Response, FetchError> {
        self.send(Method::GET, url, headers, None).await
    }

    pub async fn head(
        &self,
        url: &str,
        headers: HeaderMap,
        timeout: Duration,
    ) -> Result<Response, FetchError> {
        self.send(Method::HEAD, url, headers, Some(timeout)).await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        timeout: Option<Duration>,
    ) -> Result<Response, FetchError> {
        let mut retry = 0;

        loop {
            let mut request = self
                .client
                .request(method.clone(), url)
                .headers(headers.clone());
            if let Some(timeout) = timeout {
                request = request.timeout(timeout);
            }
            let outcome = request.send().await;

            match outcome {
                Ok(response) if self.retry.retries_status(response.status()) => {
                    let status = response.status();
                    if retry >= self.retry.max_retries {
                        warn!("{method} {url} sigue respondiendo {status} tras {retry} reintentos");
                        return Err(FetchError::Status(status.as_u16()));
                    }

                    retry += 1;
                    let wait = retry_after(&response).unwrap_or_else(|| self.retry.backoff(retry));
                    debug!("{method} {url} respondio {status}; reintento {retry} en {wait:?}");
                    tokio::time::sleep(wait).await;
                }
                Ok(response) => return Ok(response),
                Err(error) if is_transient(&error) && retry < self.retry.max_retries => {
                    retry += 1;
                    let wait = self.retry.backoff(retry);
                    debug!("{method} {url} fallo ({error}); reintento {retry} en {wait:?}");
                    tokio::time::sleep(wait).await;
                }
                Err(error) => return Err(FetchError::Request(error)),
            }
        }
    }
}

/// Timeouts, refused connections and connections dropped mid-exchange.
fn is_transient(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request() || error.is_body()
}

fn retry_after(response: &Response) -> Option<Duration> {
    if !matches!(
        response.status(),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE
    ) {
        return None;
    }

    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(|seconds| Duration::from_secs(seconds).min(BACKOFF_MAX))
}

pub fn random_mobile_user_agent() -> &'static str {
    MOBILE_USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(MOBILE_USER_AGENTS[0])
}

pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(random_mobile_user_agent()));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9,ru;q=0.8"),
    );
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate, br"));
    headers.insert(
        HeaderName::from_static("upgrade-insecure-requests"),
        HeaderValue::from_static("1"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("document"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("navigate"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("none"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert(HeaderName::from_static("dnt"), HeaderValue::from_static("1"));
    headers
}

pub fn app_headers(origin: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(APP_USER_AGENT));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        HeaderName::from_static("x-requested-with"),
        HeaderValue::from_static("XMLHttpRequest"),
    );
    if let Ok(value) = HeaderValue::from_str(origin) {
        headers.insert(ORIGIN, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("{}/", origin.trim_end_matches('/'))) {
        headers.insert(REFERER, value);
    }
    headers
}

pub fn webview_json_headers(referer: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(WEBVIEW_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    if let Ok(value) = HeaderValue::from_str(referer) {
        headers.insert(REFERER, value);
    }
    headers
}
