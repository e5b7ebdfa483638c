use crate::api::client::ByteStream;
use crate::state::StreamAggregator;
use anyhow::Result;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PumpOutcome {
    pub chunks: usize,
    pub bytes: usize,
    /// Last token count reported by the stream.
    pub total_tokens: Option<u64>,
    pub cancelled: bool,
}

/// Drives `stream` into `aggregator` until it ends or `cancel` fires.
///
/// A transport error is recorded as an error update before it is returned.
/// Cancellation leaves the aggregator as it was after the last full chunk.
pub async fn pump_stream(
    mut stream: ByteStream,
    aggregator: &mut StreamAggregator,
    cancel: &CancellationToken,
) -> Result<PumpOutcome> {
    let mut decoder = Utf8ChunkDecoder::default();
    let mut outcome = PumpOutcome::default();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                outcome.cancelled = true;
                break;
            }
            next = stream.next() => next,
        };

        let Some(chunk_result) = next else {
            break;
        };
        let chunk = match chunk_result {
            Ok(chunk) => chunk,
            Err(error) => {
                tracing::warn!(error = %format!("{error:#}"), "stream transport failed");
                aggregator.add_error(&format!("Stream interrupted: {error:#}"));
                return Err(error.context("stream transport failed"));
            }
        };

        outcome.chunks += 1;
        outcome.bytes += chunk.len();
        let text = decoder.decode(&chunk);
        if !text.is_empty() {
            if let Some(tokens) = aggregator.add_raw_data(&text) {
                outcome.total_tokens = Some(tokens);
            }
        }
    }

    if !outcome.cancelled {
        let rest = decoder.finish();
        if !rest.is_empty() {
            if let Some(tokens) = aggregator.add_raw_data(&rest) {
                outcome.total_tokens = Some(tokens);
            }
        }
        if let Some(tokens) = aggregator.flush_pending_line() {
            outcome.total_tokens = Some(tokens);
        }
    }

    Ok(outcome)
}

/// Holds back the bytes of a code point split across chunks.
#[derive(Debug, Default)]
struct Utf8ChunkDecoder {
    carry: Vec<u8>,
}

impl Utf8ChunkDecoder {
    fn decode(&mut self, chunk: &[u8]) -> String {
        self.carry.extend_from_slice(chunk);
        match std::str::from_utf8(&self.carry) {
            Ok(text) => {
                let text = text.to_string();
                self.carry.clear();
                text
            }
            Err(error) if error.error_len().is_none() => {
                let valid = error.valid_up_to();
                let text = String::from_utf8_lossy(&self.carry[..valid]).into_owned();
                self.carry.drain(..valid);
                text
            }
            Err(_) => {
                let text = String::from_utf8_lossy(&self.carry).into_owned();
                self.carry.clear();
                text
            }
        }
    }

    fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.carry).into_owned();
        self.carry.clear();
        text
    }
}
