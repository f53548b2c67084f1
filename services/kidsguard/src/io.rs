//! HTTP client abstraction for testability

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};

use crate::KidsGuardError;

/// HTTP response from a request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Lines of a server-push response body, without their terminators
pub type LineStream = BoxStream<'static, crate::Result<String>>;

/// Abstraction over HTTP client for dependency injection
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait HttpClient: Send + Sync {
    /// Send a GET request to the given URL
    async fn get(&self, url: &str) -> crate::Result<HttpResponse>;

    /// Send a POST request with a JSON body
    async fn post_json(&self, url: &str, body: &serde_json::Value)
        -> crate::Result<HttpResponse>;

    /// Open a long-lived GET request and stream its body line by line
    async fn open_stream(&self, url: &str) -> crate::Result<LineStream>;
}

/// Production HTTP client using reqwest
#[derive(Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
    /// Streams have no total deadline, so they get their own client
    stream_client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(request_timeout: Duration) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| KidsGuardError::Http(format!("Building HTTP client: {}", e)))?;
        Ok(Self {
            client,
            stream_client: reqwest::Client::new(),
        })
    }

    async fn finish(method: &str, url: &str, response: reqwest::Response) -> crate::Result<HttpResponse> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| KidsGuardError::Http(format!("Reading response body: {}", e)))?;

        tracing::debug!("{} {} -> {} ({} bytes)", method, url, status, body.len());
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str) -> crate::Result<HttpResponse> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| KidsGuardError::Http(format!("GET {} failed: {}", url, e)))?;

        Self::finish("GET", url, response).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> crate::Result<HttpResponse> {
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| KidsGuardError::Http(format!("POST {} failed: {}", url, e)))?;

        Self::finish("POST", url, response).await
    }

    async fn open_stream(&self, url: &str) -> crate::Result<LineStream> {
        tracing::debug!("GET {} (stream)", url);
        let response = self
            .stream_client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| KidsGuardError::Http(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(KidsGuardError::Http(format!(
                "GET {} returned status {}",
                url,
                status.as_u16()
            )));
        }

        let url = url.to_string();
        let mut chunks = response.bytes_stream();
        let lines = async_stream::stream! {
            let mut buffer: Vec<u8> = Vec::new();
            while let Some(chunk) = chunks.next().await {
                match chunk {
                    Ok(bytes) => {
                        buffer.extend_from_slice(&bytes);
                        while let Some(idx) = buffer.iter().position(|b| *b == b'\n') {
                            let line: Vec<u8> = buffer.drain(..=idx).collect();
                            let text = String::from_utf8_lossy(&line);
                            yield Ok(text.trim_end_matches(['\r', '\n']).to_string());
                        }
                    }
                    Err(e) => {
                        yield Err(KidsGuardError::Http(format!("Reading stream {}: {}", url, e)));
                        break;
                    }
                }
            }
            if !buffer.is_empty() {
                yield Ok(String::from_utf8_lossy(&buffer).trim_end().to_string());
            }
        };

        Ok(lines.boxed())
    }
}
