use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::truncate_chars;

/// One reviewable record produced by the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    pub id: String,
    #[serde(flatten)]
    pub kind: UpdateKind,
    /// Elapsed seconds since session start, fixed when the record is created.
    pub timestamp: String,
    pub created_at: DateTime<Utc>,
}

impl Update {
    pub fn new(kind: UpdateKind, timestamp: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            timestamp,
            created_at: Utc::now(),
        }
    }

    pub fn update_type(&self) -> UpdateType {
        self.kind.update_type()
    }

    /// The primary text of the record regardless of its content shape.
    pub fn text(&self) -> &str {
        match &self.kind {
            UpdateKind::Progress { content }
            | UpdateKind::LlmContentStreaming { content, .. }
            | UpdateKind::FinalResultStreaming { content }
            | UpdateKind::Error { content }
            | UpdateKind::Complete { content } => content,
            UpdateKind::FinalResult { content } => &content.text.content,
            UpdateKind::ToolCalls { content } => &content.content,
            UpdateKind::ToolResult { content } => &content.text.content,
            UpdateKind::Updates { content } => &content.text.content,
        }
    }

    pub fn node_name(&self) -> Option<&str> {
        match &self.kind {
            UpdateKind::LlmContentStreaming { node_name, .. } => node_name.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UpdateKind {
    Progress {
        content: String,
    },
    /// Model output accumulated per contiguous run of one execution node.
    LlmContentStreaming {
        content: String,
        #[serde(
            rename = "nodeName",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        node_name: Option<String>,
    },
    FinalResult {
        content: FinalResultContent,
    },
    /// Scalar final answer; at most one exists per session.
    FinalResultStreaming {
        content: String,
    },
    ToolCalls {
        content: ToggleText,
    },
    ToolResult {
        content: ToolResultContent,
    },
    Updates {
        content: UpdatesContent,
    },
    Error {
        content: String,
    },
    Complete {
        content: String,
    },
}

impl UpdateKind {
    pub fn update_type(&self) -> UpdateType {
        match self {
            Self::Progress { .. } => UpdateType::Progress,
            Self::LlmContentStreaming { .. } => UpdateType::LlmContentStreaming,
            Self::FinalResult { .. } => UpdateType::FinalResult,
            Self::FinalResultStreaming { .. } => UpdateType::FinalResultStreaming,
            Self::ToolCalls { .. } => UpdateType::ToolCalls,
            Self::ToolResult { .. } => UpdateType::ToolResult,
            Self::Updates { .. } => UpdateType::Updates,
            Self::Error { .. } => UpdateType::Error,
            Self::Complete { .. } => UpdateType::Complete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateType {
    Progress,
    LlmContentStreaming,
    FinalResult,
    FinalResultStreaming,
    ToolCalls,
    ToolResult,
    Updates,
    Error,
    Complete,
}

impl UpdateType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Progress => "progress",
            Self::LlmContentStreaming => "llm-content-streaming",
            Self::FinalResult => "final-result",
            Self::FinalResultStreaming => "final-result-streaming",
            Self::ToolCalls => "tool-calls",
            Self::ToolResult => "tool-result",
            Self::Updates => "updates",
            Self::Error => "error",
            Self::Complete => "complete",
        }
    }
}

/// Display text with an optional collapsed preview.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ToggleText {
    pub content: String,
    pub needs_toggle: bool,
    pub short_content: Option<String>,
}

impl ToggleText {
    /// `threshold` decides whether the text collapses; the preview is always
    /// the first `max_content_length` characters.
    pub fn new(content: String, threshold: usize, max_content_length: usize) -> Self {
        let needs_toggle = content.chars().count() > threshold;
        let short_content = needs_toggle.then(|| truncate_chars(&content, max_content_length));
        Self {
            content,
            needs_toggle,
            short_content,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FinalResultContent {
    #[serde(flatten)]
    pub text: ToggleText,
    pub is_json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultContent {
    #[serde(flatten)]
    pub text: ToggleText,
    pub status: String,
    pub tool_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdatesContent {
    #[serde(flatten)]
    pub text: ToggleText,
    /// Pretty-printed source payload backing the "copy raw" affordance.
    pub raw: String,
    pub is_formatted: bool,
}
