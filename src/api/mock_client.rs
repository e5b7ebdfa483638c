use crate::api::client::ByteStream;
use anyhow::{anyhow, Result};
use bytes::Bytes;
use futures::stream;
use std::sync::{Arc, Mutex};

/// Serves canned byte streams, one scripted response per `next_stream` call.
#[derive(Clone)]
pub struct MockStreamSource {
    responses: Arc<Mutex<Vec<Vec<Result<Bytes, String>>>>>,
}

impl MockStreamSource {
    pub fn new(responses: Vec<Vec<&str>>) -> Self {
        let scripted = responses
            .into_iter()
            .map(|chunks| {
                chunks
                    .into_iter()
                    .map(|chunk| Ok(Bytes::from(chunk.to_string())))
                    .collect()
            })
            .collect();
        Self {
            responses: Arc::new(Mutex::new(scripted)),
        }
    }

    /// One response made of raw byte chunks, optionally failing at the end.
    pub fn from_bytes(chunks: Vec<Vec<u8>>, trailing_error: Option<&str>) -> Self {
        let mut scripted: Vec<Result<Bytes, String>> =
            chunks.into_iter().map(|chunk| Ok(Bytes::from(chunk))).collect();
        if let Some(message) = trailing_error {
            scripted.push(Err(message.to_string()));
        }
        Self {
            responses: Arc::new(Mutex::new(vec![scripted])),
        }
    }

    pub fn next_stream(&self) -> Result<ByteStream> {
        let mut responses_guard = self.responses.lock().unwrap();
        if responses_guard.is_empty() {
            return Err(anyhow!("MockStreamSource: no more responses configured"));
        }
        let chunks: Vec<Result<Bytes>> = responses_guard
            .remove(0)
            .into_iter()
            .map(|item| item.map_err(|message| anyhow!(message)))
            .collect();
        Ok(Box::pin(stream::iter(chunks)))
    }
}
