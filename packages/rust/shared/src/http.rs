//! Basic-auth JSON client shared by the source and target API crates.
//!
//! Retries, pagination, and rate limiting are deliberately absent: every
//! call is one request, and any failure is returned to the caller as-is.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::{Credentials, ServiceEndpoint};
use crate::error::{FieldSyncError, Result};

/// User-Agent string for all API requests.
const USER_AGENT: &str = concat!("fieldsync/", env!("CARGO_PKG_VERSION"));

/// A JSON API rooted at one base URL. Cheap to clone (the inner
/// `reqwest::Client` is reference-counted), so it can be moved into tasks.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
}

impl ApiClient {
    /// Build a client for `endpoint` with the given per-request timeout.
    pub fn new(endpoint: &ServiceEndpoint, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FieldSyncError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: endpoint.base_url.clone(),
            credentials: endpoint.credentials.clone(),
        })
    }

    /// Resolve `path` against the base URL, keeping any base path prefix.
    pub fn url(&self, path: &str) -> Result<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined)
            .map_err(|e| FieldSyncError::validation(format!("invalid request URL '{joined}': {e}")))
    }

    /// `GET path?query` and decode the JSON body as `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.url(path)?;
        debug!(%url, "GET");

        let response = self
            .http
            .get(url.clone())
            .query(query)
            .basic_auth(&self.credentials.user, Some(&self.credentials.secret))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FieldSyncError::Network(format!("{url}: {e}")))?;

        decode(response, &url).await
    }

    /// `PUT path` with an already-serialized JSON body. The response body is
    /// drained but not interpreted.
    pub async fn put_json_bytes(&self, path: &str, body: Vec<u8>) -> Result<()> {
        let url = self.url(path)?;
        debug!(%url, bytes = body.len(), "PUT");

        let response = self
            .http
            .put(url.clone())
            .basic_auth(&self.credentials.user, Some(&self.credentials.secret))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| FieldSyncError::Network(format!("{url}: {e}")))?;

        check_status(&response, &url)?;

        response
            .bytes()
            .await
            .map_err(|e| FieldSyncError::Network(format!("{url}: failed to read body: {e}")))?;

        Ok(())
    }
}

fn check_status(response: &reqwest::Response, url: &Url) -> Result<()> {
    let status = response.status();
    if !status.is_success() {
        return Err(FieldSyncError::Http {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(())
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response, url: &Url) -> Result<T> {
    check_status(&response, url)?;

    let body = response
        .bytes()
        .await
        .map_err(|e| FieldSyncError::Network(format!("{url}: failed to read body: {e}")))?;

    serde_json::from_slice(&body).map_err(|e| FieldSyncError::decode(url.as_str(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn endpoint(base: &str) -> ServiceEndpoint {
        ServiceEndpoint {
            base_url: Url::parse(base).unwrap(),
            credentials: Credentials {
                user: "ops".into(),
                secret: "hunter2".into(),
            },
        }
    }

    #[test]
    fn url_keeps_base_path() {
        let client =
            ApiClient::new(&endpoint("https://example.com/api/"), Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.url("/projects").unwrap().as_str(),
            "https://example.com/api/projects"
        );

        let client =
            ApiClient::new(&endpoint("https://example.com"), Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.url("clients/10").unwrap().as_str(),
            "https://example.com/clients/10"
        );
    }

    #[tokio::test]
    async fn get_json_sends_basic_auth_and_query() {
        let server = MockServer::start().await;

        // "ops:hunter2" in base64
        Mock::given(method("GET"))
            .and(path("/things"))
            .and(query_param("since", "2013-01-01 00:00"))
            .and(header("authorization", "Basic b3BzOmh1bnRlcjI="))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"n": 3}"#))
            .mount(&server)
            .await;

        let client = ApiClient::new(&endpoint(&server.uri()), Duration::from_secs(5)).unwrap();
        let value: serde_json::Value = client
            .get_json("/things", &[("since", "2013-01-01 00:00")])
            .await
            .unwrap();

        assert_eq!(value["n"], 3);
    }

    #[tokio::test]
    async fn non_success_status_is_http_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = ApiClient::new(&endpoint(&server.uri()), Duration::from_secs(5)).unwrap();
        let err = client
            .get_json::<serde_json::Value>("/missing", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, FieldSyncError::Http { status: 404, .. }));
    }

    #[tokio::test]
    async fn bad_json_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let client = ApiClient::new(&endpoint(&server.uri()), Duration::from_secs(5)).unwrap();
        let err = client
            .get_json::<serde_json::Value>("/broken", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, FieldSyncError::Decode { .. }));
    }

    #[tokio::test]
    async fn put_sends_body_verbatim() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/fields/1.json"))
            .and(header("content-type", "application/json"))
            .and(body_string(r#"{"a":1}"#))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&endpoint(&server.uri()), Duration::from_secs(5)).unwrap();
        client
            .put_json_bytes("/fields/1.json", br#"{"a":1}"#.to_vec())
            .await
            .unwrap();
    }
}
