//! HTTP client for the Clerk Backend API.

use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument};
use url::Url;

use crate::config::ClerkConfig;
use crate::errors::{Error, Result};

/// Clerk's maximum page size for list endpoints
pub const PAGE_SIZE: usize = 100;

const UNKNOWN_ERROR: &str = "Unknown Clerk API error";

/// Error payload returned by the Clerk API
#[derive(Debug, Deserialize)]
struct ClerkErrorBody {
    #[serde(default)]
    errors: Vec<ClerkErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct ClerkErrorEntry {
    message: Option<String>,
    long_message: Option<String>,
    #[allow(dead_code)]
    code: Option<String>,
}

/// Pick the most descriptive message out of an error response body.
pub fn parse_clerk_error(body: &str) -> String {
    serde_json::from_str::<ClerkErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.errors.into_iter().next())
        .and_then(|first| {
            first
                .long_message
                .filter(|m| !m.is_empty())
                .or(first.message.filter(|m| !m.is_empty()))
        })
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
}

/// Authenticated access to `https://api.clerk.com/v1` (or a configured replacement).
#[derive(Debug, Clone)]
pub struct ClerkClient {
    client: Client,
    base_url: Url,
    secret_key: String,
    api_version: Option<String>,
}

impl ClerkClient {
    pub fn new(config: &ClerkConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            secret_key: config.secret_key.clone(),
            api_version: config.api_version.clone(),
        })
    }

    /// Append path segments to the base URL. Segments are percent-encoded individually.
    pub fn url_for<S: AsRef<str>>(&self, segments: &[S]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| Error::Internal {
                operation: format!("build request URL from base {}", self.base_url),
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment.as_ref());
            }
        }
        Ok(url)
    }

    /// Make one authenticated request and return the decoded JSON response.
    ///
    /// The body is only sent for non-GET requests with at least one field.
    #[instrument(skip_all, fields(method = %method))]
    pub async fn request<S: AsRef<str>>(
        &self,
        method: Method,
        segments: &[S],
        body: &Map<String, Value>,
        query: &[(String, String)],
    ) -> Result<Value> {
        let url = self.url_for(segments)?;
        debug!("Clerk API request: {} {}", method, url);

        let mut request = self.client.request(method.clone(), url).bearer_auth(&self.secret_key);
        if let Some(version) = &self.api_version {
            request = request.header("Clerk-API-Version", version);
        }
        if !body.is_empty() && method != Method::GET {
            request = request.json(body);
        }
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.map_err(|e| Error::ClerkApi {
            status: None,
            message: e.to_string(),
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| Error::ClerkApi {
            status: Some(status),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            let message = parse_clerk_error(&text);
            debug!(status = %status, "Clerk API returned an error: {}", message);
            return Err(Error::ClerkApi {
                status: Some(status),
                message,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        serde_json::from_str(&text).map_err(|e| Error::ClerkApi {
            status: None,
            message: format!("Invalid JSON in Clerk API response: {e}"),
        })
    }

    /// Walk an offset-paginated list endpoint.
    ///
    /// `max` of `None` (or `Some(0)`) collects everything. Items come from the `data` field when
    /// present, otherwise from the response itself; a non-array response is returned as a single
    /// item.
    #[instrument(skip_all)]
    pub async fn request_all_items<S: AsRef<str>>(
        &self,
        method: Method,
        segments: &[S],
        query: &[(String, String)],
        max: Option<usize>,
    ) -> Result<Vec<Value>> {
        let max = max.filter(|m| *m > 0).unwrap_or(usize::MAX);
        let mut results: Vec<Value> = Vec::new();
        let mut offset = 0usize;

        loop {
            let page_limit = PAGE_SIZE.min(max - results.len());
            let mut page_query = query.to_vec();
            page_query.push(("limit".to_string(), page_limit.to_string()));
            page_query.push(("offset".to_string(), offset.to_string()));

            let response = self.request(method.clone(), segments, &Map::new(), &page_query).await?;
            let items = match response {
                Value::Object(mut object) if object.get("data").is_some_and(|d| !d.is_null()) => {
                    object.remove("data").unwrap_or(Value::Null)
                }
                other => other,
            };

            let Value::Array(items) = items else {
                results.push(items);
                break;
            };

            let page_len = items.len();
            results.extend(items);
            debug!(page_len, total = results.len(), "Fetched Clerk list page");

            if page_len < PAGE_SIZE || results.len() >= max {
                break;
            }
            offset += PAGE_SIZE;
        }

        results.truncate(max);
        Ok(results)
    }

    /// Cheapest authenticated call available: list a single user.
    pub async fn test_credentials(&self) -> Result<()> {
        self.request(Method::GET, &["users"], &Map::new(), &[("limit".to_string(), "1".to_string())])
            .await
            .map(|_| ())
    }
}

/// True for errors that mean the secret key was rejected
pub fn is_auth_failure(err: &Error) -> bool {
    matches!(
        err,
        Error::ClerkApi {
            status: Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN),
            ..
        }
    )
}
