//! Remote HTTP source (`json_http` driver).

use crate::backend::FlagSource;
use crate::envelope::{Envelope, MAX_ENVELOPE_BYTES};
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use flagcache_entity::Flag;
use reqwest::Client;
use std::time::Duration;
use tracing::instrument;

/// Fetches an envelope with a plain `GET` request.
///
/// The whole request, body included, is bounded by the configured timeout.
/// Any non-2xx response is a failure; the body of an error response is
/// never parsed.
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
    timeout: Duration,
    max_bytes: u64,
    client: Client,
}
impl HttpSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .or_raise(|| ErrorKind::InvalidConnection(url.clone()))?;
        Ok(Self { url, timeout, max_bytes: MAX_ENVELOPE_BYTES, client })
    }

    /// Reject response bodies larger than `max_bytes` instead of
    /// [`MAX_ENVELOPE_BYTES`].
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Timeouts get their own kind so logs make the cause obvious.
    fn check<T>(&self, result: reqwest::Result<T>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                let kind = match err.is_timeout() {
                    true => ErrorKind::Timeout(self.timeout),
                    false => ErrorKind::Network(format!("GET {}", self.url)),
                };
                Err(err).or_raise(|| kind)
            },
        }
    }
}

#[async_trait]
impl FlagSource for HttpSource {
    fn name(&self) -> &str {
        "json_http"
    }

    #[instrument(name = "fetch_http", skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<Vec<Flag>> {
        let mut response = self.check(self.client.get(&self.url).send().await)?;
        let status = response.status();
        if !status.is_success() {
            exn::bail!(ErrorKind::Status(status.as_u16()));
        }
        if let Some(length) = response.content_length()
            && length > self.max_bytes
        {
            exn::bail!(ErrorKind::TooLarge(self.max_bytes));
        }
        let mut body = Vec::new();
        while let Some(chunk) = self.check(response.chunk().await)? {
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                exn::bail!(ErrorKind::TooLarge(self.max_bytes));
            }
            body.extend_from_slice(&chunk);
        }
        let envelope = Envelope::from_slice_limited(&body, self.max_bytes)?;
        tracing::debug!(flags = envelope.flags.len(), bytes = body.len(), "Read envelope over HTTP");
        Ok(envelope.into_flags())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one canned HTTP response, returning the URL to hit.
    async fn serve_once(status: &'static str, body: &'static str, delay: Duration) -> String {
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        serve_raw(response, delay).await
    }

    /// Serve exactly one response written verbatim.
    async fn serve_raw(response: String, delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            tokio::time::sleep(delay).await;
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{address}/flags.json")
    }

    #[tokio::test]
    async fn test_fetch_over_http() {
        let url = serve_once("200 OK", r#"{"Flags": [{"ID": 7, "Key": "beta"}]}"#, Duration::ZERO).await;
        let source = HttpSource::new(url, Duration::from_secs(5)).unwrap();
        let flags = source.fetch().await.unwrap();
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].id, 7);
        assert_eq!(flags[0].key, "beta");
    }

    #[tokio::test]
    async fn test_non_success_status_fails() {
        let url = serve_once("503 Service Unavailable", r#"{"Flags": []}"#, Duration::ZERO).await;
        let source = HttpSource::new(url, Duration::from_secs(5)).unwrap();
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(*err, ErrorKind::Status(503)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_body_fails() {
        let url = serve_once("200 OK", "<html>oops</html>", Duration::ZERO).await;
        let source = HttpSource::new(url, Duration::from_secs(5)).unwrap();
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(*err, ErrorKind::Decode));
    }

    #[tokio::test]
    async fn test_declared_length_over_limit() {
        // Only the headers are sent; the declared length alone is enough to refuse.
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n",
            MAX_ENVELOPE_BYTES + 1
        );
        let url = serve_raw(response, Duration::ZERO).await;
        let source = HttpSource::new(url, Duration::from_secs(5)).unwrap();
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(*err, ErrorKind::TooLarge(MAX_ENVELOPE_BYTES)), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn test_chunked_body_over_limit() {
        let body = r#"{"Flags": [{"ID": 1, "Key": "a"}, {"ID": 2, "Key": "b"}]}"#;
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ntransfer-encoding: chunked\r\nconnection: close\r\n\r\n{:x}\r\n{body}\r\n0\r\n\r\n",
            body.len()
        );
        let url = serve_raw(response, Duration::ZERO).await;
        let source = HttpSource::new(url, Duration::from_secs(5)).unwrap().with_max_bytes(16);
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(*err, ErrorKind::TooLarge(16)), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn test_timeout() {
        let url = serve_once("200 OK", r#"{"Flags": []}"#, Duration::from_secs(5)).await;
        let source = HttpSource::new(url, Duration::from_millis(100)).unwrap();
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(*err, ErrorKind::Timeout(_)), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        // Bind then drop to get a port that nothing is listening on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);
        let source = HttpSource::new(format!("http://{address}/"), Duration::from_secs(2)).unwrap();
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(*err, ErrorKind::Network(_)), "unexpected error: {err:?}");
    }
}
