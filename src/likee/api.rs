use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::LikeeExtractor;
use super::ids::extract_id;
use super::miner::mine;
use crate::http::{app_headers, webview_json_headers};
use crate::models::ExtractionResult;

const WRAPPER_KEYS: [&str; 5] = ["data", "result", "response", "videos", "videoInfo"];
const LIST_KEYS: [&str; 3] = ["data", "videos", "items"];
const LIST_ITEMS_CONSIDERED: usize = 3;

impl LikeeExtractor {
    pub async fn extract_via_api(&self, url: &str) -> Option<ExtractionResult> {
        let Some(post_id) = extract_id(url) else {
            debug!("No se encontro id de publicacion en {url}");
            return None;
        };

        let header_sets = [app_headers(&self.config.origin), webview_json_headers(url)];
        let encoded_id = urlencoding::encode(&post_id);

        for headers in &header_sets {
            for template in &self.config.api_endpoints {
                let endpoint = template.replace("{id}", &encoded_id);
                self.pause(self.config.api_pacing).await;

                if let Some(result) = self.query_endpoint(&endpoint, headers.clone()).await {
                    return Some(result.with_source(api_source(&endpoint)));
                }
            }
        }

        None
    }

    async fn query_endpoint(&self, endpoint: &str, headers: HeaderMap) -> Option<ExtractionResult> {
        let response = match self
            .fetcher
            .get(endpoint, headers, self.config.api_timeout)
            .await
        {
            Ok(response) => response,
            Err(error) => {
                debug!("Endpoint {endpoint} fallo: {error}");
                return None;
            }
        };

        if response.status() != StatusCode::OK {
            debug!("Endpoint {endpoint} respondio {}", response.status());
            return None;
        }

        let body = match response.json::<Value>().await {
            Ok(body) => body,
            Err(error) => {
                debug!("Endpoint {endpoint} no devolvio JSON: {error}");
                return None;
            }
        };

        mine_api_response(&body)
    }
}

pub fn api_candidates(body: &Value) -> Vec<&Value> {
    let mut candidates = vec![body];

    if let Value::Object(map) = body {
        candidates.extend(WRAPPER_KEYS.iter().filter_map(|key| map.get(*key)));

        for key in LIST_KEYS {
            if let Some(Value::Array(items)) = map.get(key) {
                candidates.extend(items.iter().take(LIST_ITEMS_CONSIDERED));
            }
        }
    }

    candidates
}

pub fn mine_api_response(body: &Value) -> Option<ExtractionResult> {
    api_candidates(body)
        .into_iter()
        .filter(|candidate| !is_empty_document(candidate))
        .find_map(mine)
}

fn is_empty_document(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// `api_<host>` of the endpoint that answered.
fn api_source(endpoint: &str) -> String {
    let host = Url::parse(endpoint).ok().and_then(|parsed| {
        parsed.host_str().map(|host| match parsed.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    });

    format!("api_{}", host.unwrap_or_else(|| "unknown".to_string()))
}
