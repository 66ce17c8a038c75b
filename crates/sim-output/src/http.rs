//! HTTP sink.

use crate::error::SinkError;
use crate::sink::Sink;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use sim_core::{ConfigError, Record};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

/// Configuration of an `http` output.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpSinkConfig {
    #[serde(default = "default_url")]
    pub url: String,
    /// `POST` (default), `PUT` or `GET`; GET sends the record as `?data=`
    #[serde(default = "default_method")]
    pub method: String,
    /// Extra request headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_method() -> String {
    "POST".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Sends each record as one HTTP request.
pub struct HttpSink {
    client: Client,
    url: Url,
    method: Method,
}

impl HttpSink {
    pub fn new(config: HttpSinkConfig, stream: &str, index: usize) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::output(stream, index, message);

        let url = Url::parse(&config.url)
            .map_err(|e| invalid(format!("invalid url '{}': {e}", config.url)))?;

        let method = match config.method.to_ascii_uppercase().as_str() {
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "GET" => Method::GET,
            other => return Err(invalid(format!("unsupported HTTP method '{other}'"))),
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| invalid(format!("invalid header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| invalid(format!("invalid value for header '{name}': {e}")))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| invalid(format!("cannot build HTTP client: {e}")))?;

        info!("Created HTTP client for endpoint: {url}");
        Ok(Self {
            client,
            url,
            method,
        })
    }
}

#[async_trait]
impl Sink for HttpSink {
    async fn send(&mut self, text: &str, _record: &Record) -> Result<(), SinkError> {
        let request = if self.method == Method::GET {
            self.client.get(self.url.clone()).query(&[("data", text)])
        } else {
            self.client
                .request(self.method.clone(), self.url.clone())
                .body(text.to_string())
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::HttpStatus {
                method: self.method.to_string(),
                url: self.url.to_string(),
                status: status.as_u16(),
            });
        }

        debug!("Sent HTTP {} request to {}", self.method, self.url);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("http {} {}", self.method, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accept one connection, capture the raw request, answer with `status`.
    async fn one_shot_server(status: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                if request_complete(&raw) {
                    break;
                }
            }
            let response =
                format!("HTTP/1.1 {status}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&raw).to_string()
        });

        (format!("http://{addr}/ingest"), handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= header_end + 4 + content_length
    }

    fn config(url: String, method: &str) -> HttpSinkConfig {
        HttpSinkConfig {
            url,
            method: method.to_string(),
            headers: BTreeMap::from([("X-Source".to_string(), "stream-sim".to_string())]),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_post_sends_body_and_headers() {
        let (url, server) = one_shot_server("200 OK").await;
        let mut sink = HttpSink::new(config(url, "post"), "s", 0).unwrap();

        sink.send(r#"{"a":1}"#, &Record::new()).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /ingest"));
        assert!(request.to_ascii_lowercase().contains("x-source: stream-sim"));
        assert!(request.ends_with(r#"{"a":1}"#));
    }

    #[tokio::test]
    async fn test_get_sends_query_parameter() {
        let (url, server) = one_shot_server("204 No Content").await;
        let mut sink = HttpSink::new(config(url, "GET"), "s", 0).unwrap();

        sink.send("a=1", &Record::new()).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /ingest?data=a%3D1 "));
    }

    #[tokio::test]
    async fn test_non_2xx_is_an_error() {
        let (url, server) = one_shot_server("503 Service Unavailable").await;
        let mut sink = HttpSink::new(config(url, "POST"), "s", 0).unwrap();

        let result = sink.send("{}", &Record::new()).await;
        server.await.unwrap();
        assert!(matches!(
            result,
            Err(SinkError::HttpStatus { status: 503, .. })
        ));
    }

    #[test]
    fn test_invalid_config() {
        assert!(HttpSink::new(config("nope".to_string(), "POST"), "s", 0).is_err());
        assert!(
            HttpSink::new(config("http://localhost:1".to_string(), "DELETE"), "s", 0).is_err()
        );
    }
}
