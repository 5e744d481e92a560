//! HTTP fetcher backed by reqwest

use crate::error::FetchError;
use crate::fetchers::Fetcher;
use crate::types::{FetchRequest, FetchedPage};
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::redirect::Policy;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Binary content type prefixes
const BINARY_PREFIXES: &[&str] = &[
    "image/",
    "audio/",
    "video/",
    "application/octet-stream",
    "application/pdf",
    "application/zip",
    "application/gzip",
    "application/x-tar",
    "application/x-rar",
    "application/x-7z",
    "application/vnd.ms-",
    "application/vnd.openxmlformats",
    "font/",
];

const ACCEPT_VALUE: &str = "text/html, application/xhtml+xml, text/markdown, text/plain, */*;q=0.8";

/// Redirect hops followed before giving up
const MAX_REDIRECTS: usize = 10;

/// Plain GET fetcher
///
/// - redirects followed when the request asks for it
/// - non-2xx responses are errors
/// - binary content types are refused before the body is read
/// - the body is read until the request deadline, keeping what arrived
#[derive(Debug, Default, Clone)]
pub struct HttpFetcher;

impl HttpFetcher {
    pub fn new() -> Self {
        Self
    }

    fn client(&self, request: &FetchRequest) -> Result<reqwest::Client, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&request.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
        );
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));

        let redirects = if request.follow_redirects {
            Policy::limited(MAX_REDIRECTS)
        } else {
            Policy::none()
        };

        reqwest::Client::builder()
            .default_headers(headers)
            .redirect(redirects)
            .connect_timeout(request.timeout)
            .build()
            .map_err(FetchError::ClientBuildError)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<FetchedPage, FetchError> {
        let deadline = Instant::now() + request.timeout;
        let client = self.client(request)?;

        let response = tokio::time::timeout_at(deadline, client.get(&request.url).send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        let final_url = response.url().to_string();
        debug!(url = %request.url, final_url = %final_url, status = status.as_u16(), "Fetched");

        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if let Some(ct) = content_type.as_deref() {
            if is_binary_content_type(ct) {
                return Err(FetchError::BinaryContent(ct.to_string()));
            }
        }

        let (body, truncated) = read_body_until(response, deadline).await;

        Ok(FetchedPage {
            url: final_url,
            status_code: status.as_u16(),
            content_type,
            body: String::from_utf8_lossy(&body).into_owned(),
            truncated,
        })
    }
}

/// Check if content type indicates binary content
fn is_binary_content_type(content_type: &str) -> bool {
    let ct_lower = content_type.to_lowercase();
    BINARY_PREFIXES
        .iter()
        .any(|prefix| ct_lower.starts_with(prefix))
}

/// Read the response body until `deadline`, returning partial content on timeout
async fn read_body_until(response: reqwest::Response, deadline: Instant) -> (Bytes, bool) {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();

    loop {
        tokio::select! {
            chunk = stream.next() => {
                match chunk {
                    Some(Ok(bytes)) => body.extend_from_slice(&bytes),
                    Some(Err(e)) => {
                        error!("Error reading body chunk: {}", e);
                        let has_content = !body.is_empty();
                        return (Bytes::from(body), has_content);
                    }
                    None => return (Bytes::from(body), false),
                }
            }
            _ = tokio::time::sleep_until(deadline) => {
                warn!("Body timeout reached, returning partial content");
                return (Bytes::from(body), true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_binary_content_type() {
        assert!(is_binary_content_type("image/png"));
        assert!(is_binary_content_type("audio/mp3"));
        assert!(is_binary_content_type("application/pdf"));
        assert!(is_binary_content_type("Application/Octet-Stream"));
        assert!(is_binary_content_type(
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        ));
        assert!(is_binary_content_type("font/woff2"));

        assert!(!is_binary_content_type("text/html; charset=utf-8"));
        assert!(!is_binary_content_type("text/markdown"));
        assert!(!is_binary_content_type("application/json"));
    }

    #[test]
    fn test_fetcher_name() {
        assert_eq!(HttpFetcher::new().name(), "http");
    }
}
