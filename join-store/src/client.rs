use std::time::Duration;

use reqwest::{header::HeaderValue, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::StoreURL;

const ETAG_REQUEST_HEADER: &str = "X-Firebase-ETag";
const IF_MATCH_HEADER: &str = "if-match";

/// Client for a path-addressed JSON document store (Firebase Realtime Database REST API).
///
/// Every node is reachable at `<base>/<path>.json`. Calls are issued once; there is no
/// retry, batching or transaction support.
#[derive(Debug, Clone)]
pub struct StoreClient {
    client: reqwest::Client,
    base_url: StoreURL,
    auth_token: Option<String>,
}

impl StoreClient {
    pub fn new(base_url: StoreURL, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            auth_token: None,
        })
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &StoreURL {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> StoreURL {
        self.base_url
            .json_endpoint(path)
            .with_auth(self.auth_token.as_deref())
    }

    async fn send(&self, request: RequestBuilder, call_name: &str) -> Result<Response, StoreError> {
        tracing::debug!("store call: {}", call_name);

        let resp = request
            .send()
            .await
            .map_err(|e| StoreError::ResponseError(format!("{} failed: {}", call_name, e)))?;

        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StoreError::Unauthorized),
            StatusCode::PRECONDITION_FAILED => Err(StoreError::PreconditionFailed),
            status if !status.is_success() => Err(StoreError::Status {
                status: status.as_u16(),
                call: call_name.to_string(),
            }),
            _ => Ok(resp),
        }
    }

    async fn read_json<T: DeserializeOwned>(
        resp: Response,
        call_name: &str,
    ) -> Result<T, StoreError> {
        resp.json::<T>().await.map_err(|e| {
            StoreError::ParsingError(format!("Failed to parse {} response as JSON: {}", call_name, e))
        })
    }

    /// Read the node at `path`. A missing node (JSON `null`) is `None`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, StoreError> {
        let call_name = format!("GET {}", path);
        let resp = self
            .send(self.client.get(self.endpoint(path).as_ref()), &call_name)
            .await?;

        Self::read_json::<Option<T>>(resp, &call_name).await
    }

    /// Read the node at `path` together with its current ETag.
    pub async fn get_with_etag<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<(Option<T>, ETag), StoreError> {
        let call_name = format!("GET {} (etag)", path);
        let request = self
            .client
            .get(self.endpoint(path).as_ref())
            .header(ETAG_REQUEST_HEADER, "true");
        let resp = self.send(request, &call_name).await?;

        let etag = resp
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(ETag::from)
            .ok_or_else(|| StoreError::ParsingError(format!("{} returned no ETag", call_name)))?;

        let value = Self::read_json::<Option<T>>(resp, &call_name).await?;
        Ok((value, etag))
    }

    /// Replace the node at `path`. Returns the JSON the store echoes back.
    pub async fn put<T: Serialize + ?Sized>(
        &self,
        path: &str,
        value: &T,
    ) -> Result<Value, StoreError> {
        let call_name = format!("PUT {}", path);
        let resp = self
            .send(
                self.client.put(self.endpoint(path).as_ref()).json(value),
                &call_name,
            )
            .await?;

        Self::read_json(resp, &call_name).await
    }

    /// Replace the node at `path` only if it still carries `etag`.
    ///
    /// Fails with [`StoreError::PreconditionFailed`] if the node changed since it was read.
    pub async fn put_if_match<T: Serialize + ?Sized>(
        &self,
        path: &str,
        value: &T,
        etag: &ETag,
    ) -> Result<Value, StoreError> {
        let call_name = format!("PUT {} (if-match)", path);
        let etag_header = HeaderValue::from_str(etag.as_str())
            .map_err(|e| StoreError::Other(format!("Invalid ETag {:?}: {}", etag.as_str(), e)))?;
        let request = self
            .client
            .put(self.endpoint(path).as_ref())
            .header(IF_MATCH_HEADER, etag_header)
            .json(value);
        let resp = self.send(request, &call_name).await?;

        Self::read_json(resp, &call_name).await
    }

    /// Merge the given children into the node at `path`.
    pub async fn patch<T: Serialize + ?Sized>(
        &self,
        path: &str,
        value: &T,
    ) -> Result<Value, StoreError> {
        let call_name = format!("PATCH {}", path);
        let resp = self
            .send(
                self.client.patch(self.endpoint(path).as_ref()).json(value),
                &call_name,
            )
            .await?;

        Self::read_json(resp, &call_name).await
    }

    /// Append a child under `path` with a store-generated key.
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        value: &T,
    ) -> Result<PushId, StoreError> {
        let call_name = format!("POST {}", path);
        let resp = self
            .send(
                self.client.post(self.endpoint(path).as_ref()).json(value),
                &call_name,
            )
            .await?;

        Self::read_json(resp, &call_name).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let call_name = format!("DELETE {}", path);
        let resp = self
            .send(self.client.delete(self.endpoint(path).as_ref()), &call_name)
            .await?;
        resp.bytes().await.map_err(|e| {
            StoreError::ResponseError(format!("{} body could not be read: {}", call_name, e))
        })?;
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Precondition failed: node changed since it was read")]
    PreconditionFailed,
    #[error("{call} returned status {status}")]
    Status { status: u16, call: String },
    #[error("ResponseError: {0}")]
    ResponseError(String),
    #[error("ParsingError: {0}")]
    ParsingError(String),
    #[error("InvalidUrl: {0}")]
    InvalidUrl(String),
    #[error("Other: {0}")]
    Other(String),
}

/// Response body of a POST: the generated child key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PushId {
    pub name: String,
}

/// Opaque version tag of a node, used for conditional writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ETag(String);

impl ETag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ETag {
    fn from(tag: &str) -> Self {
        Self(tag.to_string())
    }
}

impl From<String> for ETag {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve exactly one HTTP request with a canned response and hand back the raw request.
    async fn respond_once(
        status_line: &'static str,
        extra_headers: &'static str,
        body: &'static str,
    ) -> (StoreURL, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];

            loop {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);

                let text = String::from_utf8_lossy(&raw).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let lower = line.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if raw.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
                status_line,
                body.len(),
                extra_headers,
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();

            String::from_utf8_lossy(&raw).to_string()
        });

        (StoreURL::new(format!("http://{}/", addr)), handle)
    }

    fn client(base: StoreURL) -> StoreClient {
        StoreClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn get_reads_node_and_maps_null_to_none() {
        let (base, request) = respond_once("HTTP/1.1 200 OK", "", "null").await;

        let value: Option<Value> = client(base).get("contacts/abc").await.unwrap();

        assert!(value.is_none());
        let request = request.await.unwrap();
        assert!(request.starts_with("GET /contacts/abc.json HTTP/1.1"));
    }

    #[tokio::test]
    async fn put_sends_json_body_and_auth_query() {
        let (base, request) =
            respond_once("HTTP/1.1 200 OK", "", r#"{"name":"Anna Muster"}"#).await;

        let echoed = client(base)
            .with_auth_token("tok")
            .put("contacts/abc", &serde_json::json!({"name": "Anna Muster"}))
            .await
            .unwrap();

        assert_eq!(echoed["name"], "Anna Muster");
        let request = request.await.unwrap();
        assert!(request.starts_with("PUT /contacts/abc.json?auth=tok HTTP/1.1"));
        assert!(request.ends_with(r#"{"name":"Anna Muster"}"#));
    }

    #[tokio::test]
    async fn post_returns_generated_key() {
        let (base, request) = respond_once("HTTP/1.1 200 OK", "", r#"{"name":"-Nx9"}"#).await;

        let push = client(base)
            .post("tasks", &serde_json::json!({"Title": "Write docs"}))
            .await
            .unwrap();

        assert_eq!(push.name, "-Nx9");
        assert!(request.await.unwrap().starts_with("POST /tasks.json HTTP/1.1"));
    }

    #[tokio::test]
    async fn get_with_etag_requests_and_reads_tag() {
        let (base, request) =
            respond_once("HTTP/1.1 200 OK", "ETag: abc123\r\n", r#"{"a":1}"#).await;

        let (value, etag): (Option<Value>, ETag) =
            client(base).get_with_etag("tasks").await.unwrap();

        assert_eq!(value.unwrap()["a"], 1);
        assert_eq!(etag.as_str(), "abc123");
        let request = request.await.unwrap().to_ascii_lowercase();
        assert!(request.contains("x-firebase-etag: true"));
    }

    #[tokio::test]
    async fn put_if_match_maps_412_to_precondition_failed() {
        let (base, request) =
            respond_once("HTTP/1.1 412 Precondition Failed", "", r#"{"a":2}"#).await;

        let err = client(base)
            .put_if_match("tasks", &serde_json::json!({"a": 1}), &ETag::from("stale"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::PreconditionFailed));
        let request = request.await.unwrap().to_ascii_lowercase();
        assert!(request.contains("if-match: stale"));
    }

    #[tokio::test]
    async fn unauthorized_status_is_reported() {
        let (base, _request) =
            respond_once("HTTP/1.1 401 Unauthorized", "", r#"{"error":"denied"}"#).await;

        let err = client(base).delete("tasks/x").await.unwrap_err();

        assert!(matches!(err, StoreError::Unauthorized));
    }

    #[tokio::test]
    async fn other_failure_status_carries_call_name() {
        let (base, _request) =
            respond_once("HTTP/1.1 500 Internal Server Error", "", "{}").await;

        let err = client(base)
            .patch("tasks/x", &serde_json::json!({"Status": "done"}))
            .await
            .unwrap_err();

        match err {
            StoreError::Status { status, call } => {
                assert_eq!(status, 500);
                assert_eq!(call, "PATCH tasks/x");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn truncated_delete_response_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf).await.unwrap();
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\nnu")
                .await
                .unwrap();
            stream.shutdown().await.ok();
        });

        let err = client(StoreURL::new(format!("http://{}/", addr)))
            .delete("tasks/x")
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::ResponseError(_)));
    }
}
