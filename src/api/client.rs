use super::logging::{debug_payload_enabled, emit_debug_payload};
use crate::config::{Config, STREAM_URL_ENV};
use crate::util::is_local_endpoint_url;
use anyhow::{anyhow, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::pin::Pin;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Opens the agent backend's SSE response as a byte stream.
#[derive(Clone)]
pub struct StreamClient {
    http: reqwest::Client,
    stream_url: String,
}

impl StreamClient {
    pub fn new(config: &Config) -> Result<Self> {
        let stream_url = config
            .stream_url
            .clone()
            .ok_or_else(|| anyhow!("{STREAM_URL_ENV} must be set to open a live stream"))?;

        Ok(Self {
            http: reqwest::Client::new(),
            stream_url,
        })
    }

    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    pub fn is_local_endpoint(&self) -> bool {
        is_local_endpoint_url(&self.stream_url)
    }

    /// POSTs `body` and returns the response body as it arrives.
    pub async fn open(&self, body: &Value) -> Result<ByteStream> {
        if debug_payload_enabled() {
            emit_debug_payload(&self.stream_url, body);
        }

        let response = self
            .http
            .post(&self.stream_url)
            .header("content-type", "application/json")
            .header("accept", "text/event-stream")
            .json(body)
            .send()
            .await
            .map_err(|error| map_stream_request_error(error, &self.stream_url))?
            .error_for_status()
            .map_err(|error| map_stream_request_error(error, &self.stream_url))?;

        tracing::debug!(url = %self.stream_url, status = %response.status(), "stream opened");

        let stream_url = self.stream_url.clone();
        let stream = response
            .bytes_stream()
            .map(move |item| item.map_err(|error| map_stream_request_error(error, &stream_url)));
        Ok(Box::pin(stream))
    }
}

fn map_stream_request_error(error: reqwest::Error, stream_url: &str) -> anyhow::Error {
    if error.is_connect() && is_local_endpoint_url(stream_url) {
        return anyhow!(
            "cannot reach local stream endpoint '{}': {}. Start the agent backend or update {}.",
            stream_url,
            error,
            STREAM_URL_ENV
        );
    }
    if error.is_connect() {
        return anyhow!("cannot reach stream endpoint '{}': {}", stream_url, error);
    }
    if error.is_timeout() {
        return anyhow!("stream request to '{}' timed out: {}", stream_url, error);
    }
    if let Some(status) = error.status() {
        return anyhow!(
            "stream endpoint '{}' returned HTTP {}: {}",
            stream_url,
            status,
            error
        );
    }
    anyhow!("stream request to '{}' failed: {}", stream_url, error)
}
