use agentfeed::api::logging::init_tracing;
use agentfeed::api::StreamClient;
use agentfeed::config::Config;
use agentfeed::runtime::pump_stream;
use agentfeed::state::{AggregatorEvent, StatusSnapshot, StreamAggregator};
use anyhow::{Context, Result};
use std::io::Write;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Replayed captures are fed in small slices to exercise reassembly.
const REPLAY_CHUNK_BYTES: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    let config = Config::load()?;
    config.validate()?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let mut aggregator =
        StreamAggregator::new(config.aggregator_config()).with_event_sender(event_tx);
    aggregator.start_streaming();

    let outcome = match std::env::args().nth(1) {
        Some(path) => replay_capture(&path, &mut aggregator),
        None => stream_live(&config, &mut aggregator).await,
    };

    if let Err(error) = &outcome {
        tracing::warn!(error = %format!("{error:#}"), "stream ended with an error");
    } else if aggregator.is_loading() {
        aggregator.complete(None);
    }

    report_status_changes(&mut event_rx);
    print_updates(&aggregator)?;

    outcome
}

fn replay_capture(path: &str, aggregator: &mut StreamAggregator) -> Result<()> {
    let capture =
        std::fs::read_to_string(path).with_context(|| format!("cannot read capture '{path}'"))?;
    for chunk in split_at_char_boundaries(&capture, REPLAY_CHUNK_BYTES) {
        aggregator.add_raw_data(chunk);
    }
    aggregator.flush_pending_line();
    Ok(())
}

async fn stream_live(config: &Config, aggregator: &mut StreamAggregator) -> Result<()> {
    let client = StreamClient::new(config)?;
    let body = config.request_body_json()?;
    tracing::info!(
        url = client.stream_url(),
        local = client.is_local_endpoint(),
        "opening stream"
    );

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let stream = match client.open(&body).await {
        Ok(stream) => stream,
        Err(error) => {
            aggregator.add_error(&format!("{error:#}"));
            return Err(error);
        }
    };
    let outcome = pump_stream(stream, aggregator, &cancel).await?;
    tracing::info!(
        chunks = outcome.chunks,
        bytes = outcome.bytes,
        tokens = ?outcome.total_tokens,
        cancelled = outcome.cancelled,
        "stream finished"
    );
    Ok(())
}

fn report_status_changes(event_rx: &mut mpsc::UnboundedReceiver<AggregatorEvent>) {
    let mut last: Option<StatusSnapshot> = None;
    while let Ok(event) = event_rx.try_recv() {
        let AggregatorEvent::Status(snapshot) = event else {
            continue;
        };
        if last.as_ref() == Some(&snapshot) || snapshot.status.is_empty() {
            continue;
        }
        if snapshot.token_info.is_empty() {
            eprintln!("[status] {}", snapshot.status);
        } else {
            eprintln!("[status] {} ({})", snapshot.status, snapshot.token_info);
        }
        last = Some(snapshot);
    }
}

fn print_updates(aggregator: &StreamAggregator) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for update in aggregator.updates() {
        let line = serde_json::to_string(update)?;
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

fn split_at_char_boundaries(text: &str, max_bytes: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + max_bytes.max(1)).min(text.len());
        while !text.is_char_boundary(end) {
            end += 1;
        }
        chunks.push(&text[start..end]);
        start = end;
    }
    chunks
}
