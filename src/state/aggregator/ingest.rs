use super::StreamAggregator;
use crate::api::stream::{classify_line, parse_data_line, ControlEvent, DataLine, SseLine};
use crate::types::UpdateKind;
use crate::util::preview_chars;

impl StreamAggregator {
    /// Feeds one raw SSE chunk through framing, parsing and aggregation.
    ///
    /// Returns the total token count if the chunk reported one.
    pub fn add_raw_data(&mut self, chunk: &str) -> Option<u64> {
        self.raw_text.push_str(chunk);
        let lines = self.reassembler.feed(chunk);
        let tokens = self.dispatch_lines(lines);
        self.emit_status();
        tokens
    }

    /// Treats a buffered, unterminated last line as complete. Call once the
    /// transport has ended.
    pub fn flush_pending_line(&mut self) -> Option<u64> {
        let tail = self.reassembler.flush();
        if tail.is_empty() {
            return None;
        }
        let tokens = self.dispatch_lines(vec![tail]);
        self.emit_status();
        tokens
    }

    /// Single-line ingestion for producers that send one `data: <json>` per
    /// call and close with `data: [DONE]`.
    pub fn process_stream_data(&mut self, line: &str) -> Option<u64> {
        match parse_data_line(line) {
            DataLine::Done => {
                self.complete(None);
                None
            }
            DataLine::Payload(payload) => {
                let tokens = self.apply_batch(&mut vec![payload]);
                self.emit_status();
                tokens
            }
            DataLine::Empty => None,
        }
    }

    fn dispatch_lines(&mut self, lines: Vec<String>) -> Option<u64> {
        let mut batch = Vec::new();
        let mut tokens = None;

        for line in lines {
            match classify_line(&line) {
                SseLine::Event(event) => {
                    // Keep wire order: payloads seen so far land before the event.
                    tokens = self.apply_batch(&mut batch).or(tokens);
                    self.apply_control_event(event);
                }
                SseLine::Data(payload) => batch.push(payload),
                SseLine::Comment | SseLine::Blank | SseLine::Ignored => {}
            }
        }

        self.apply_batch(&mut batch).or(tokens)
    }

    fn apply_batch(&mut self, batch: &mut Vec<String>) -> Option<u64> {
        let mut tokens = None;
        for payload in batch.drain(..) {
            match self.normalizer.parse(&payload) {
                Ok(value) => {
                    if let Some(count) = self.apply_payload(&value) {
                        tokens = Some(count);
                    }
                }
                Err(error) => {
                    tracing::debug!(
                        %error,
                        payload = %preview_chars(&payload, 200),
                        "dropping unparsable stream payload"
                    );
                }
            }
        }
        tokens
    }

    fn apply_control_event(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::Metadata => {
                self.push_update(UpdateKind::Progress {
                    content: "Processing...".to_string(),
                });
                self.set_status("Processing...");
            }
            ControlEvent::End => {
                self.push_update(UpdateKind::Progress {
                    content: "Complete.".to_string(),
                });
                self.set_status("Complete.");
            }
            ControlEvent::Error => {
                let elapsed = self.clock.elapsed();
                tracing::warn!(elapsed = %elapsed, "stream reported an error event");
                self.push_update(UpdateKind::Error {
                    content: "The stream reported an error.".to_string(),
                });
                self.set_status(format!("Stream failed after {elapsed}s"));
                self.status.loading = false;
            }
            ControlEvent::Marker(name) => {
                tracing::trace!(event = %name, "stream marker");
            }
        }
    }
}
