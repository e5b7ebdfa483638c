use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use serde_json::Value;
use thiserror::Error;

/// Foreign literal spellings and their JSON replacements.
const LITERAL_REPLACEMENTS: [(&str, &str); 3] =
    [("True", "true"), ("False", "false"), ("None", "null")];

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("empty payload")]
    Empty,
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Turns `data:` payload text into JSON, tolerating Python-style literals.
#[derive(Debug, Clone)]
pub struct PayloadNormalizer {
    literals: AhoCorasick,
}

impl Default for PayloadNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadNormalizer {
    pub fn new() -> Self {
        let patterns: Vec<&str> = LITERAL_REPLACEMENTS.iter().map(|(from, _)| *from).collect();
        let literals = AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(patterns)
            .expect("literal patterns are static and valid");
        Self { literals }
    }

    /// Rewrites whole-token `True`/`False`/`None` (any ASCII case).
    ///
    /// Tokens inside JSON strings are rewritten too; the upstream producer
    /// relies on that.
    pub fn repair_literals(&self, payload: &str) -> String {
        let bytes = payload.as_bytes();
        let mut repaired = String::with_capacity(payload.len());
        let mut copied_to = 0;

        for found in self.literals.find_iter(payload) {
            let before_ok = found.start() == 0 || !is_word_byte(bytes[found.start() - 1]);
            let after_ok = found.end() == bytes.len() || !is_word_byte(bytes[found.end()]);
            if !(before_ok && after_ok) {
                continue;
            }
            repaired.push_str(&payload[copied_to..found.start()]);
            repaired.push_str(LITERAL_REPLACEMENTS[found.pattern().as_usize()].1);
            copied_to = found.end();
        }

        repaired.push_str(&payload[copied_to..]);
        repaired
    }

    pub fn parse(&self, payload: &str) -> Result<Value, NormalizeError> {
        let trimmed = payload.trim();
        if trimmed.is_empty() {
            return Err(NormalizeError::Empty);
        }
        let repaired = self.repair_literals(trimmed);
        Ok(serde_json::from_str(&repaired)?)
    }
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}
