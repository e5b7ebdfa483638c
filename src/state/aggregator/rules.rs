use super::format::{format_tool_calls, format_tool_result, format_updates, value_as_text};
use super::{AggregatorEvent, StreamAggregator};
use crate::types::{
    FinalResultContent, ToggleText, ToolResultContent, UpdateKind, UpdateType, UpdatesContent,
};
use serde_json::Value;

impl StreamAggregator {
    /// Applies every recognized field of one parsed payload.
    ///
    /// A payload may carry several fields; each one runs its own rule. Token
    /// usage never becomes a record and is returned instead.
    pub(super) fn apply_payload(&mut self, value: &Value) -> Option<u64> {
        let Some(fields) = value.as_object() else {
            tracing::debug!(payload = %value, "ignoring non-object stream payload");
            return None;
        };

        if let Some(progress) = fields.get("progress") {
            self.push_progress(progress);
        }

        if let Some(content) = value.pointer("/llm/content").and_then(Value::as_str) {
            let node_name = fields
                .get("node_name")
                .or_else(|| value.pointer("/llm/node_name"))
                .filter(|node| !node.is_null())
                .map(value_as_text);
            self.merge_llm_content(content, node_name);
        }

        if let Some(final_result) = fields.get("final_result") {
            self.apply_final_result(final_result);
        }

        if let Some(tool_calls) = fields.get("tool_calls") {
            self.push_tool_calls(tool_calls);
        }

        if let Some(tool) = fields.get("tool").filter(|tool| tool.is_object()) {
            self.push_tool_result(tool);
        }

        if let Some(updates) = fields.get("updates").filter(|updates| updates.is_object()) {
            self.push_updates(updates);
        }

        let tokens = value
            .pointer("/usage/total_tokens")
            .or_else(|| fields.get("total_tokens"))
            .and_then(token_count);
        if let Some(count) = tokens {
            self.status.token_info = format!("Total tokens: {count}");
        }
        tokens
    }

    pub fn add_progress(&mut self, value: &Value) {
        self.push_progress(value);
        self.emit_status();
    }

    pub fn add_llm_content(&mut self, content: &str, node_name: Option<&str>) {
        self.merge_llm_content(content, node_name.map(str::to_string));
        self.emit_status();
    }

    pub fn add_final_result(&mut self, value: &Value) {
        self.apply_final_result(value);
        self.emit_status();
    }

    pub fn add_tool_calls(&mut self, value: &Value) {
        self.push_tool_calls(value);
        self.emit_status();
    }

    pub fn add_tool_result(&mut self, value: &Value) {
        self.push_tool_result(value);
        self.emit_status();
    }

    pub fn add_updates(&mut self, value: &Value) {
        self.push_updates(value);
        self.emit_status();
    }

    /// Records a caller-side failure and stops the loading indicator.
    pub fn add_error(&mut self, message: &str) {
        let elapsed = self.clock.elapsed();
        self.push_update(UpdateKind::Error {
            content: message.to_string(),
        });
        self.set_status(format!("Error after {elapsed}s: {message}"));
        self.status.loading = false;
        self.emit_status();
    }

    pub fn complete(&mut self, message: Option<&str>) {
        let elapsed = self.clock.elapsed();
        self.push_update(UpdateKind::Complete {
            content: message.unwrap_or("Stream complete.").to_string(),
        });
        self.set_status(format!("Completed in {elapsed}s"));
        self.status.loading = false;
        self.emit_status();
    }

    fn push_progress(&mut self, value: &Value) {
        let text = value_as_text(value);
        self.set_status(format!("[progress] {text}"));
        self.push_update(UpdateKind::Progress { content: text });
    }

    /// Extends the tail record when it is streaming text from the same node;
    /// anything else in between starts a new run.
    fn merge_llm_content(&mut self, content: &str, node_name: Option<String>) {
        if let Some(index) = self.updates.len().checked_sub(1) {
            if let UpdateKind::LlmContentStreaming {
                content: existing,
                node_name: tail_node,
            } = &mut self.updates[index].kind
            {
                if *tail_node == node_name {
                    existing.push_str(content);
                    self.emit(AggregatorEvent::Merged {
                        index,
                        delta: content.to_string(),
                    });
                    return;
                }
            }
        }

        self.push_update(UpdateKind::LlmContentStreaming {
            content: content.to_string(),
            node_name,
        });
    }

    /// Structured results become their own record; scalars accumulate into
    /// the single streaming final-result record wherever it sits.
    fn apply_final_result(&mut self, value: &Value) {
        match value {
            Value::Null => {}
            Value::Object(_) | Value::Array(_) => {
                let max = self.config.max_content_length;
                self.push_update(UpdateKind::FinalResult {
                    content: FinalResultContent {
                        text: ToggleText::new(value.to_string(), max, max),
                        is_json: true,
                    },
                });
            }
            scalar => {
                let piece = value_as_text(scalar);
                let existing = self
                    .updates
                    .iter()
                    .position(|update| update.update_type() == UpdateType::FinalResultStreaming);
                match existing {
                    Some(index) => {
                        if let UpdateKind::FinalResultStreaming { content } =
                            &mut self.updates[index].kind
                        {
                            content.push_str(&piece);
                        }
                        self.emit(AggregatorEvent::Merged {
                            index,
                            delta: piece,
                        });
                    }
                    None => {
                        self.push_update(UpdateKind::FinalResultStreaming { content: piece });
                    }
                }
            }
        }
    }

    fn push_tool_calls(&mut self, value: &Value) {
        let max = self.config.max_content_length;
        let text = format_tool_calls(value);
        self.push_update(UpdateKind::ToolCalls {
            content: ToggleText::new(text, max.saturating_mul(3) / 2, max),
        });
    }

    fn push_tool_result(&mut self, value: &Value) {
        let max = self.config.max_content_length;
        let summary = format_tool_result(value);
        self.push_update(UpdateKind::ToolResult {
            content: ToolResultContent {
                text: ToggleText::new(summary.text, max, max),
                status: summary.status,
                tool_name: summary.name,
            },
        });
    }

    fn push_updates(&mut self, value: &Value) {
        let max = self.config.max_content_length;
        let raw = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        let (text, is_formatted) = match format_updates(value, &self.config.doc_delimiter) {
            Ok(Some(formatted)) => (formatted, true),
            Ok(None) => (raw.clone(), false),
            Err(error) => {
                tracing::warn!(%error, "could not format updates payload, keeping raw JSON");
                (raw.clone(), false)
            }
        };

        self.push_update(UpdateKind::Updates {
            content: UpdatesContent {
                text: ToggleText::new(text, max, max),
                raw,
                is_formatted,
            },
        });
    }
}

/// Whole, non-negative numbers only; `12.0` counts as 12.
fn token_count(value: &Value) -> Option<u64> {
    let count = value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|n| {
                n.is_finite() && *n >= 0.0 && n.fract() == 0.0 && *n <= u64::MAX as f64
            })
            .map(|n| n as u64)
    });
    if count.is_none() {
        tracing::debug!(total_tokens = %value, "ignoring token count that is not a whole number");
    }
    count
}
