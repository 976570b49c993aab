use crate::tools::{ToolParams, ToolSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write;

pub const REQUEST_START: &str = "<<<[TOOL_REQUEST]>>>";
pub const REQUEST_END: &str = "<<<[END_TOOL_REQUEST]>>>";
pub const VALUE_OPEN: &str = "「始」";
pub const VALUE_CLOSE: &str = "「末」";

/// Key naming the service inside a request block.
pub const TOOL_NAME_KEY: &str = "tool_name";

/// Joins rendered tool results into the follow-up user turn.
pub const TOOL_RESULT_SEPARATOR: &str = "\n\n---\n\n";

/// One tool request extracted from model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub args: BTreeMap<String, String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Arguments as invoker params; every value is a JSON string.
    pub fn params(&self) -> ToolParams {
        self.args
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect()
    }

    /// Render as a request block the parser accepts.
    pub fn to_block(&self) -> String {
        let mut block = format!("{REQUEST_START}\n{TOOL_NAME_KEY}: {VALUE_OPEN}{}{VALUE_CLOSE}\n", self.name);
        for (key, value) in &self.args {
            let _ = writeln!(block, "{key}: {VALUE_OPEN}{value}{VALUE_CLOSE}");
        }
        block.push_str(REQUEST_END);
        block
    }
}

/// Extract every well-formed tool request from `content`, in order.
///
/// Blocks without a closing marker are skipped and scanning resumes right
/// after their opening marker. Blocks without a `tool_name` entry are dropped.
pub fn parse_tool_calls(content: &str) -> Vec<ToolCall> {
    let mut calls = Vec::new();
    let mut cursor = 0;

    while let Some(found) = content[cursor..].find(REQUEST_START) {
        let body_start = cursor + found + REQUEST_START.len();
        let Some(len) = content[body_start..].find(REQUEST_END) else {
            tracing::debug!(offset = cursor + found, "unterminated tool request block");
            cursor = body_start;
            continue;
        };

        let body = content[body_start..body_start + len].trim();
        if let Some(call) = parse_block(body) {
            calls.push(call);
        } else {
            tracing::debug!("tool request block without tool_name dropped");
        }
        cursor = body_start + len + REQUEST_END.len();
    }

    calls
}

fn parse_block(body: &str) -> Option<ToolCall> {
    let mut name = None;
    let mut args = BTreeMap::new();

    for (key, value) in block_entries(body) {
        if key == TOOL_NAME_KEY {
            name = Some(value.to_string());
        } else {
            args.insert(key.to_string(), value.to_string());
        }
    }

    name.map(|name| ToolCall { name, args })
}

/// `key: 「始」value「末」` entries of one block. Values may span lines.
fn block_entries(body: &str) -> Vec<(&str, &str)> {
    let mut entries = Vec::new();
    let mut cursor = 0;

    while let Some(found) = body[cursor..].find(VALUE_OPEN) {
        let open = cursor + found;
        let value_start = open + VALUE_OPEN.len();
        let Some(len) = body[value_start..].find(VALUE_CLOSE) else {
            break;
        };

        match entry_key(&body[cursor..open]) {
            Some(key) => {
                entries.push((key, body[value_start..value_start + len].trim()));
                cursor = value_start + len + VALUE_CLOSE.len();
            }
            None => cursor = value_start,
        }
    }

    entries
}

/// Word immediately before a `:` that ends `prefix` (whitespace allowed
/// around the colon).
fn entry_key(prefix: &str) -> Option<&str> {
    let before_colon = prefix.trim_end().strip_suffix(':')?.trim_end();
    let start = before_colon
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_')
        .last()
        .map(|(index, _)| index)?;
    Some(&before_colon[start..])
}

/// Instructions telling a model how to phrase tool requests.
pub fn request_format_prompt(services: &[ToolSpec]) -> String {
    let mut prompt = format!(
        "To call a tool, output a block in exactly this format (it may appear more than once):\n\n\
         {REQUEST_START}\n\
         {TOOL_NAME_KEY}: {VALUE_OPEN}<service name>{VALUE_CLOSE}\n\
         param1: {VALUE_OPEN}<value 1>{VALUE_CLOSE}\n\
         param2: {VALUE_OPEN}<value 2>{VALUE_CLOSE}\n\
         {REQUEST_END}\n\n\
         If no tool is needed, answer directly.\n"
    );
    if !services.is_empty() {
        prompt.push_str("\nAvailable services:\n");
        for spec in services {
            let _ = writeln!(prompt, "- {}: {}", spec.name, spec.description);
        }
    }
    prompt
}

pub fn render_result(name: &str, result: &str) -> String {
    format!("Result from tool \"{name}\":\n{result}")
}

pub fn render_error(name: &str, error: &str) -> String {
    format!("Error executing tool {name}: {error}")
}
