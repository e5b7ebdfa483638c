//! Session state for one agent run: the ordered update list plus the buffers
//! and status that feed it.

mod format;
mod ingest;
mod rules;


pub use format::{
    format_tool_calls, format_tool_result, format_updates, FormatError, ToolSummary,
};

use super::clock::{Clock, SessionClock, SystemClock};
use crate::api::normalize::PayloadNormalizer;
use crate::api::stream::LineReassembler;
use crate::types::{Update, UpdateKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 500;
pub const DEFAULT_DOC_DELIMITER: &str = "---";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Display threshold past which a record collapses behind a toggle.
    pub max_content_length: usize,
    /// Separator between documents inside `context_*` update fields.
    pub doc_delimiter: String,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            doc_delimiter: DEFAULT_DOC_DELIMITER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub status: String,
    pub loading: bool,
    pub token_info: String,
}

/// Notifications for a renderer that mirrors the update list.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregatorEvent {
    Appended { index: usize, update: Update },
    Merged { index: usize, delta: String },
    Status(StatusSnapshot),
    Reset,
}

pub struct StreamAggregator {
    config: AggregatorConfig,
    clock: SessionClock,
    updates: Vec<Update>,
    raw_text: String,
    reassembler: LineReassembler,
    normalizer: PayloadNormalizer,
    status: StatusSnapshot,
    event_tx: Option<mpsc::UnboundedSender<AggregatorEvent>>,
}

impl StreamAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: AggregatorConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock: SessionClock::new(clock),
            updates: Vec::new(),
            raw_text: String::new(),
            reassembler: LineReassembler::new(),
            normalizer: PayloadNormalizer::new(),
            status: StatusSnapshot::default(),
            event_tx: None,
        }
    }

    pub fn with_event_sender(mut self, event_tx: mpsc::UnboundedSender<AggregatorEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn updates(&self) -> &[Update] {
        &self.updates
    }

    /// Every chunk passed to `add_raw_data`, verbatim.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn status(&self) -> &StatusSnapshot {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status.loading
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.clock.start_time()
    }

    pub fn elapsed(&self) -> String {
        self.clock.elapsed()
    }

    /// Incomplete line carried over to the next chunk.
    pub fn pending_line(&self) -> &str {
        self.reassembler.pending()
    }

    /// Begins a fresh session starting now.
    pub fn start_streaming(&mut self) {
        self.begin_session(None);
    }

    pub fn start_streaming_at(&mut self, start: DateTime<Utc>) {
        self.begin_session(Some(start));
    }

    fn begin_session(&mut self, start: Option<DateTime<Utc>>) {
        self.clear_buffers();
        self.clock.start(start);
        self.status = StatusSnapshot {
            status: "Streaming in progress...".to_string(),
            loading: true,
            token_info: String::new(),
        };
        tracing::debug!(start = ?self.clock.start_time(), "stream session started");
        self.emit(AggregatorEvent::Reset);
        self.emit_status();
    }

    /// Drops all session state, including the start time.
    pub fn reset(&mut self) {
        self.clear_buffers();
        self.clock.clear();
        self.status = StatusSnapshot::default();
        self.emit(AggregatorEvent::Reset);
        self.emit_status();
    }

    fn clear_buffers(&mut self) {
        self.updates.clear();
        self.raw_text.clear();
        self.reassembler.clear();
    }

    fn push_update(&mut self, kind: UpdateKind) -> usize {
        let mut update = Update::new(kind, self.clock.elapsed());
        update.created_at = self.clock.now();
        let index = self.updates.len();
        self.updates.push(update.clone());
        self.emit(AggregatorEvent::Appended { index, update });
        index
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status.status = status.into();
    }

    fn emit_status(&self) {
        self.emit(AggregatorEvent::Status(self.status.clone()));
    }

    fn emit(&self, event: AggregatorEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}

impl Default for StreamAggregator {
    fn default() -> Self {
        Self::new(AggregatorConfig::default())
    }
}
