//! SSE framing: raw chunks in, complete classified lines out.

/// Reassembles complete lines from arbitrarily split text chunks.
#[derive(Debug, Default)]
pub struct LineReassembler {
    buffer: String,
    /// Bytes of `buffer` already known to hold no line terminator.
    scanned: usize,
}

impl LineReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every line completed by `chunk`, without terminators.
    ///
    /// Accepts `\r\n`, `\r` and `\n`. A trailing `\r` stays buffered until the
    /// next chunk shows whether it starts a `\r\n` pair.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);
        let mut lines = Vec::new();
        let mut start = 0;
        let bytes = self.buffer.as_bytes();
        let mut index = self.scanned;

        while index < bytes.len() {
            match bytes[index] {
                b'\n' => {
                    lines.push(self.buffer[start..index].to_string());
                    index += 1;
                    start = index;
                }
                b'\r' => {
                    if index + 1 == bytes.len() {
                        break;
                    }
                    lines.push(self.buffer[start..index].to_string());
                    index += if bytes[index + 1] == b'\n' { 2 } else { 1 };
                    start = index;
                }
                _ => index += 1,
            }
        }

        self.scanned = index - start;
        if start > 0 {
            self.buffer.drain(..start);
        }

        lines
    }

    /// Takes whatever incomplete tail is still buffered.
    pub fn flush(&mut self) -> String {
        self.scanned = 0;
        let mut tail = std::mem::take(&mut self.buffer);
        if tail.ends_with('\r') {
            tail.pop();
        }
        tail
    }

    pub fn pending(&self) -> &str {
        &self.buffer
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    Metadata,
    End,
    Error,
    /// `event: data` and every other event name; markers only.
    Marker(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    Event(ControlEvent),
    /// Trimmed, non-empty payload of a `data:` line.
    Data(String),
    Comment,
    Blank,
    Ignored,
}

pub fn classify_line(line: &str) -> SseLine {
    if let Some(rest) = line.strip_prefix("event:") {
        let event = match rest.trim() {
            "metadata" => ControlEvent::Metadata,
            "end" => ControlEvent::End,
            "error" => ControlEvent::Error,
            other => ControlEvent::Marker(other.to_string()),
        };
        return SseLine::Event(event);
    }

    if let Some(rest) = line.strip_prefix("data:") {
        let payload = rest.trim();
        if payload.is_empty() {
            return SseLine::Ignored;
        }
        return SseLine::Data(payload.to_string());
    }

    if line.starts_with(':') {
        return SseLine::Comment;
    }

    if line.trim().is_empty() {
        return SseLine::Blank;
    }

    SseLine::Ignored
}

/// Result of reading one line in the single-line `data: <json>` format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLine {
    Done,
    Payload(String),
    Empty,
}

pub const DONE_SENTINEL: &str = "[DONE]";

/// Reads one line of the non-SSE wire format, where the `data:` prefix is
/// optional and `[DONE]` closes the stream.
pub fn parse_data_line(line: &str) -> DataLine {
    let trimmed = line.trim();
    let payload = trimmed.strip_prefix("data:").unwrap_or(trimmed).trim();
    if payload.is_empty() {
        DataLine::Empty
    } else if payload == DONE_SENTINEL {
        DataLine::Done
    } else {
        DataLine::Payload(payload.to_string())
    }
}
