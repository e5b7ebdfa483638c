use crate::util::preview_chars;
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Lines kept from the top of each context document.
const CONTEXT_LINES_PER_DOCUMENT: usize = 3;
/// Characters kept per context line and per document preview.
const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("`{key}` should be {expected}, found {found}")]
    UnexpectedShape {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Renders tool invocations as `Tool {n}: {name}({arguments})` lines.
///
/// Accepts both `{tool_calls: [...]}` and the message-shaped
/// `{content: {additional_kwargs: {tool_calls: [...]}}}`. Falls back to the
/// compact JSON of `value` when neither holds any call.
pub fn format_tool_calls(value: &Value) -> String {
    let calls = value
        .get("tool_calls")
        .and_then(Value::as_array)
        .filter(|calls| !calls.is_empty())
        .or_else(|| {
            value
                .pointer("/content/additional_kwargs/tool_calls")
                .and_then(Value::as_array)
        });

    let lines: Vec<String> = calls
        .into_iter()
        .flatten()
        .enumerate()
        .map(|(index, call)| {
            let function = call.get("function").unwrap_or(call);
            let name = function
                .get("name")
                .map(value_as_text)
                .unwrap_or_else(|| "unknown".to_string());
            let arguments = function
                .get("arguments")
                .map(value_as_text)
                .unwrap_or_default();
            format!("Tool {}: {name}({arguments})", index + 1)
        })
        .collect();

    if lines.is_empty() {
        value.to_string()
    } else {
        lines.join("\n")
    }
}

pub struct ToolSummary {
    pub text: String,
    pub name: String,
    pub status: String,
}

pub fn format_tool_result(value: &Value) -> ToolSummary {
    let name = value.get("name").map(value_as_text).unwrap_or_default();
    let status = value.get("status").map(value_as_text).unwrap_or_default();
    let content = value.get("content").map(value_as_text).unwrap_or_default();
    ToolSummary {
        text: format!("Tool: {name}\nStatus: {status}\nContent: {content}"),
        name,
        status,
    }
}

/// Structured rendering of an `updates` payload.
///
/// Returns `Ok(None)` when the payload carries no `additional_kwargs`, so the
/// caller can fall back to a JSON dump.
pub fn format_updates(value: &Value, doc_delimiter: &str) -> Result<Option<String>, FormatError> {
    let kwargs = value
        .get("additional_kwargs")
        .or_else(|| value.pointer("/updates/additional_kwargs"));
    let Some(kwargs) = kwargs else {
        return Ok(None);
    };
    let kwargs = kwargs
        .as_object()
        .ok_or_else(|| unexpected("additional_kwargs", "an object", kwargs))?;

    let mut sections = Vec::new();

    if let Some(node_name) = kwargs.get("node_name") {
        sections.push(format!("=== Node: {} ===", value_as_text(node_name)));
    }

    for (key, entry) in kwargs {
        if key.starts_with("context_") {
            sections.push(format_context_section(key, entry, doc_delimiter)?);
        } else if key.starts_with("docs_") {
            sections.push(format_docs_section(key, entry)?);
        }
    }

    if let Some(global_ref) = kwargs.get("global_ref") {
        sections.push(format_global_ref(global_ref)?);
    }

    if sections.is_empty() {
        sections.push("(no structured fields)".to_string());
    }

    Ok(Some(sections.join("\n\n")))
}

fn format_context_section(
    key: &str,
    entry: &Value,
    doc_delimiter: &str,
) -> Result<String, FormatError> {
    let documents: Vec<String> = match entry {
        Value::String(text) => text
            .split(doc_delimiter)
            .map(str::trim)
            .filter(|doc| !doc.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Array(items) => items
            .iter()
            .map(value_as_text)
            .filter(|doc| !doc.trim().is_empty())
            .collect(),
        Value::Null => Vec::new(),
        other => return Err(unexpected(key, "a string or an array", other)),
    };

    let mut out = format!("[{key}] {} document(s)", documents.len());
    for (index, document) in documents.iter().enumerate() {
        out.push_str(&format!("\n  Document {}:", index + 1));
        for line in document
            .lines()
            .filter(|line| !line.trim().is_empty())
            .take(CONTEXT_LINES_PER_DOCUMENT)
        {
            out.push_str(&format!("\n    {}", preview_chars(line.trim(), PREVIEW_CHARS)));
        }
    }
    Ok(out)
}

fn format_docs_section(key: &str, entry: &Value) -> Result<String, FormatError> {
    let docs: &[Value] = match entry {
        Value::Array(docs) => docs.as_slice(),
        Value::Null => &[],
        other => return Err(unexpected(key, "an array", other)),
    };

    let mut out = format!("[{key}] {} doc(s)", docs.len());
    for (index, doc) in docs.iter().enumerate() {
        let file_name = doc
            .pointer("/metadata/file_name")
            .map(value_as_text)
            .unwrap_or_else(|| "unknown".to_string());
        let page = doc
            .pointer("/metadata/page")
            .map(value_as_text)
            .unwrap_or_else(|| "-".to_string());
        let score = match doc.get("score") {
            Some(Value::Number(score)) => score
                .as_f64()
                .map(|score| format!("{score:.3}"))
                .unwrap_or_else(|| score.to_string()),
            Some(other) => value_as_text(other),
            None => "-".to_string(),
        };
        let content = doc.get("content").map(value_as_text).unwrap_or_default();
        let flattened = content.split_whitespace().collect::<Vec<_>>().join(" ");

        out.push_str(&format!(
            "\n  {}. {file_name} (page {page}, score {score})",
            index + 1
        ));
        if !flattened.is_empty() {
            out.push_str(&format!("\n     {}", preview_chars(&flattened, PREVIEW_CHARS)));
        }
    }
    Ok(out)
}

fn format_global_ref(entry: &Value) -> Result<String, FormatError> {
    let map: &Map<String, Value> = match entry {
        Value::Object(map) => map,
        other => return Err(unexpected("global_ref", "an object", other)),
    };
    let mut out = "[global_ref]".to_string();
    for (key, value) in map {
        out.push_str(&format!("\n  {key}: {}", value_as_text(value)));
    }
    Ok(out)
}

/// Strings verbatim, everything else as compact JSON.
pub fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number_as_text(number),
        other => other.to_string(),
    }
}

/// Whole floats print without a fraction, so `1.0` reads as `1`.
fn number_as_text(number: &Number) -> String {
    match number.as_f64() {
        Some(n) if number.is_f64() && n.fract() == 0.0 && n.abs() < 1e21 => {
            if n == 0.0 {
                "0".to_string()
            } else {
                format!("{n:.0}")
            }
        }
        _ => number.to_string(),
    }
}

fn unexpected(key: &str, expected: &'static str, found: &Value) -> FormatError {
    FormatError::UnexpectedShape {
        key: key.to_string(),
        expected,
        found: json_type_name(found),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
