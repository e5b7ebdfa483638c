use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::state::{AggregatorConfig, DEFAULT_DOC_DELIMITER, DEFAULT_MAX_CONTENT_LENGTH};
use crate::util::is_local_endpoint_url;

pub const STREAM_URL_ENV: &str = "AGENTFEED_STREAM_URL";
pub const MAX_CONTENT_LENGTH_ENV: &str = "AGENTFEED_MAX_CONTENT_LENGTH";
pub const DOC_DELIMITER_ENV: &str = "AGENTFEED_DOC_DELIMITER";
pub const REQUEST_BODY_ENV: &str = "AGENTFEED_REQUEST_BODY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub stream_url: Option<String>,
    pub max_content_length: usize,
    pub doc_delimiter: String,
    pub request_body: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stream_url: None,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            doc_delimiter: DEFAULT_DOC_DELIMITER.to_string(),
            request_body: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let stream_url = non_empty_env(STREAM_URL_ENV);
        let max_content_length = match non_empty_env(MAX_CONTENT_LENGTH_ENV) {
            Some(raw) => raw.parse::<usize>().with_context(|| {
                format!("{MAX_CONTENT_LENGTH_ENV} must be a whole number, got '{raw}'")
            })?,
            None => DEFAULT_MAX_CONTENT_LENGTH,
        };
        // The delimiter may legitimately be whitespace, so it is not trimmed.
        let doc_delimiter = std::env::var(DOC_DELIMITER_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_DOC_DELIMITER.to_string());
        let request_body = non_empty_env(REQUEST_BODY_ENV);

        Ok(Self {
            stream_url,
            max_content_length,
            doc_delimiter,
            request_body,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.stream_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                bail!("Invalid {STREAM_URL_ENV} '{url}': expected http:// or https:// URL");
            }
            if url.starts_with("http://") && !is_local_endpoint_url(url) {
                bail!("{STREAM_URL_ENV} must use https:// for non-local endpoints (url: '{url}')");
            }
        }

        if self.max_content_length == 0 {
            bail!("{MAX_CONTENT_LENGTH_ENV} must be greater than zero");
        }

        if self.doc_delimiter.is_empty() {
            bail!("{DOC_DELIMITER_ENV} must not be empty");
        }

        if let Some(body) = &self.request_body {
            serde_json::from_str::<serde_json::Value>(body)
                .with_context(|| format!("{REQUEST_BODY_ENV} is not valid JSON"))?;
        }

        Ok(())
    }

    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            max_content_length: self.max_content_length,
            doc_delimiter: self.doc_delimiter.clone(),
        }
    }

    /// JSON body for the stream request; `{}` when none is configured.
    pub fn request_body_json(&self) -> Result<serde_json::Value> {
        match &self.request_body {
            Some(body) => serde_json::from_str(body)
                .with_context(|| format!("{REQUEST_BODY_ENV} is not valid JSON")),
            None => Ok(serde_json::json!({})),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
