use std::time::Duration;

use super::ChunkSink;
use crate::config::HttpConfig;
use crate::error::SdkError;
use crate::stream::drive_byte_stream;

const ERROR_BODY_PREVIEW_CHARS: usize = 512;

fn build_reqwest_client(config: &HttpConfig) -> Result<reqwest::Client, SdkError> {
    let mut builder = reqwest::Client::builder()
        .tcp_nodelay(true)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(config.timeout_secs));

    if !config.use_env_proxy {
        builder = builder.no_proxy();
    }

    builder
        .build()
        .map_err(|err| SdkError::Transport(format!("Failed to build HTTP client: {err}")))
}

fn parse_url(url: &str) -> Result<url::Url, SdkError> {
    let parsed =
        url::Url::parse(url).map_err(|e| SdkError::Transport(format!("Invalid upstream URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(SdkError::Transport(format!(
            "Unsupported URL scheme: {other}"
        ))),
    }
}

/// Pull a human-readable message out of a non-2xx response body.
///
/// Understands `{"error":{"message":..}}`, `{"error":".."}` and
/// `{"message":..}`; anything else is returned as (truncated) text.
fn upstream_error_message(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        let message = value
            .get("error")
            .and_then(|error| error.get("message").or(Some(error)))
            .or_else(|| value.get("message"))
            .and_then(serde_json::Value::as_str);
        if let Some(message) = message {
            return message.to_string();
        }
    }
    String::from_utf8_lossy(body)
        .chars()
        .take(ERROR_BODY_PREVIEW_CHARS)
        .collect()
}

/// HTTP adapter for upstream vendors.
///
/// Sends one POST per call with no retries; request bodies arrive already
/// serialized.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with timeouts and proxy policy from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Transport`] when the HTTP client cannot be built.
    pub fn new(config: &HttpConfig) -> Result<Self, SdkError> {
        Ok(Self {
            client: build_reqwest_client(config)?,
        })
    }

    /// Wrap an existing client.
    #[must_use]
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send(
        &self,
        url: &str,
        headers: &http::HeaderMap,
        body: bytes::Bytes,
    ) -> Result<reqwest::Response, SdkError> {
        let parsed_url = parse_url(url)?;
        let mut request_headers = headers.clone();
        if !request_headers.contains_key(http::header::CONTENT_TYPE) {
            request_headers.insert(
                http::header::CONTENT_TYPE,
                http::HeaderValue::from_static("application/json"),
            );
        }

        let response = self
            .client
            .post(parsed_url)
            .headers(request_headers)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let message = upstream_error_message(&body);
        tracing::debug!(status = status.as_u16(), %message, "upstream returned error status");
        Err(SdkError::Upstream {
            status: status.as_u16(),
            message,
        })
    }

    /// POST `body` and return the complete response body.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Transport`] for invalid URLs and network failures,
    /// and [`SdkError::Upstream`] for non-2xx responses.
    pub async fn post_json(
        &self,
        url: &str,
        headers: &http::HeaderMap,
        body: bytes::Bytes,
    ) -> Result<bytes::Bytes, SdkError> {
        let response = self.send(url, headers, body).await?;
        Ok(response.bytes().await?)
    }

    /// POST `body` and feed the streamed response body into `sink`.
    ///
    /// Every outcome is reported through the sink: request failures and
    /// non-2xx statuses arrive as [`ChunkSink::on_error`]. Reading stops as
    /// soon as the sink returns [`std::ops::ControlFlow::Break`].
    ///
    /// Bytes already received are not replayed on failure; no retries.
    pub async fn post_streaming<K: ChunkSink + ?Sized>(
        &self,
        url: &str,
        headers: &http::HeaderMap,
        body: bytes::Bytes,
        sink: &mut K,
    ) {
        let response = match self.send(url, headers, body).await {
            Ok(response) => response,
            Err(err) => {
                sink.on_error(err);
                return;
            }
        };

        drive_byte_stream(response.bytes_stream(), sink).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_message_shapes() {
        assert_eq!(
            upstream_error_message(br#"{"error":{"message":"bad key","type":"auth"}}"#),
            "bad key"
        );
        assert_eq!(upstream_error_message(br#"{"error":"quota"}"#), "quota");
        assert_eq!(upstream_error_message(br#"{"message":"nope"}"#), "nope");
        assert_eq!(upstream_error_message(b"Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_upstream_error_message_truncates_text() {
        let body = "x".repeat(2_000);
        assert_eq!(
            upstream_error_message(body.as_bytes()).len(),
            ERROR_BODY_PREVIEW_CHARS
        );
    }

    #[test]
    fn test_parse_url_rejects_bad_input() {
        assert!(parse_url("not a url").is_err());
        assert!(parse_url("ftp://example.com/v1").is_err());
        assert!(parse_url("https://api.example.com/v1/messages").is_ok());
    }

    #[tokio::test]
    async fn test_invalid_url_reported_through_sink() {
        struct Recorder(Vec<String>);
        impl ChunkSink for Recorder {
            fn on_chunk(&mut self, _bytes: &[u8]) -> std::ops::ControlFlow<()> {
                self.0.push("chunk".into());
                std::ops::ControlFlow::Continue(())
            }
            fn on_complete(&mut self) {
                self.0.push("complete".into());
            }
            fn on_error(&mut self, error: SdkError) {
                self.0.push(error.to_string());
            }
        }

        let transport = HttpTransport::new(&HttpConfig::default()).unwrap();
        let mut sink = Recorder(Vec::new());
        transport
            .post_streaming("::bad::", &http::HeaderMap::new(), bytes::Bytes::new(), &mut sink)
            .await;
        assert_eq!(sink.0.len(), 1);
        assert!(sink.0[0].starts_with("Transport error: Invalid upstream URL"));
    }
}
