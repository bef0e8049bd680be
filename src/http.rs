//! Minimal HTTP abstraction used by the content services.
//!
//! Content services only ever need "GET this URL, give me the status and the
//! bytes". Keeping that behind the [`HttpClient`] trait lets the services and
//! the scheduler run against an in-memory stub in tests while production code
//! goes through [`ReqwestClient`].

use crate::error::FetchError;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, instrument};

/// A fully buffered HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Numeric status code, e.g. `200`.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Build a response from a status and anything convertible to bytes.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Only `200` counts as success; redirects and other 2xx codes do not.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// The body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The body parsed as JSON.
    pub fn json(&self) -> Result<Value, FetchError> {
        serde_json::from_slice(&self.body).map_err(|e| FetchError::Payload(e.to_string()))
    }

    /// Turn a non-200 response into [`FetchError::Status`].
    pub fn require_ok(self, url: &str) -> Result<Self, FetchError> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(FetchError::Status {
                url: url.to_string(),
                status: self.status,
            })
        }
    }
}

/// Trait for issuing a single synchronous-looking GET.
///
/// Implementations return `Ok` for every response that arrived, whatever its
/// status; only transport failures are errors.
pub trait HttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError>;
}

/// [`HttpClient`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, FetchError> {
        let inner = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { inner })
    }
}

impl HttpClient for ReqwestClient {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let t0 = Instant::now();
        let res = self.inner.get(url).send().await?;
        let status = res.status().as_u16();
        let body = res.bytes().await?.to_vec();
        debug!(
            status,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "GET complete"
        );
        Ok(HttpResponse::new(status, body))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_require_ok_passes_200() {
        let res = HttpResponse::new(200, "hi");
        assert_eq!(res.require_ok("http://x").unwrap().text(), "hi");
    }

    #[test]
    fn test_require_ok_rejects_other_statuses() {
        let err = HttpResponse::new(503, "").require_ok("http://x").unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
    }

    #[test]
    fn test_json_payload_error() {
        let res = HttpResponse::new(200, "not json");
        assert!(matches!(res.json(), Err(FetchError::Payload(_))));
    }

    #[tokio::test]
    async fn test_reqwest_client_reports_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fact"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"fact\":\"purr\"}"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = ReqwestClient::new().unwrap();

        let ok = client.get(&format!("{}/fact", server.uri())).await.unwrap();
        assert_eq!(ok.status, 200);
        assert_eq!(ok.json().unwrap()["fact"], "purr");

        let missing = client.get(&format!("{}/missing", server.uri())).await.unwrap();
        assert_eq!(missing.status, 404);
    }
}
