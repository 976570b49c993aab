use super::types::{Plan, PlanStep};
use crate::error::ParseError;
use crate::tools::ToolSpec;
use serde_json::Value;
use std::fmt::Write as _;

pub struct PlanParser;

/// Plan input as it arrives from the model: raw text or an already decoded
/// object.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanInput {
    Text(String),
    Structured(Value),
}

impl From<&str> for PlanInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for PlanInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Value> for PlanInput {
    fn from(value: Value) -> Self {
        Self::Structured(value)
    }
}

impl PlanParser {
    pub fn schema_prompt(services: &[ToolSpec]) -> String {
        let mut prompt = String::from(concat!(
            "Whenever a task needs one or more services, respond with a JSON object in this exact format:\n",
            "{\n",
            "  \"plan\": {\n",
            "    \"start\": \"s1\",\n",
            "    \"steps\": [\n",
            "      {\n",
            "        \"id\": \"s1\",\n",
            "        \"desc\": \"<what this step does>\",\n",
            "        \"action\": { \"agent\": \"<service>\", \"params\": { ... } },\n",
            "        \"next\": \"s2\"\n",
            "      },\n",
            "      {\n",
            "        \"id\": \"s2\",\n",
            "        \"desc\": \"<fan-out point>\",\n",
            "        \"parallel\": [\"s3\", \"s4\"],\n",
            "        \"next\": { \"success\": \"s5\", \"fail\": \"s6\" }\n",
            "      }\n",
            "    ]\n",
            "  }\n",
            "}\n\n",
            "- Only use the fields id, desc, action, next and parallel.\n",
            "- `next` is a step id (linear) or an object keyed by outcome (branch).\n",
            "- `parallel` lists step ids that run concurrently before `next` is followed.\n",
            "- Steps must not loop back to an earlier step.\n",
            "For a plain conversational reply respond with {\"message\": \"<reply>\"} instead.\n",
        ));

        if !services.is_empty() {
            prompt.push_str("\nAvailable services:\n");
            for spec in services {
                let _ = writeln!(prompt, "- {}: {}", spec.name, spec.description);
            }
        }

        prompt
    }

    /// Decode a plan. Structured input is used as-is; text is decoded
    /// directly and, failing that, from the JSON object embedded in it.
    pub fn parse(input: impl Into<PlanInput>) -> Result<Plan, ParseError> {
        let value = match input.into() {
            PlanInput::Structured(value) => value,
            PlanInput::Text(text) => Self::decode_text(&text)?,
        };
        Self::parse_value(&value)
    }

    pub fn parse_value(value: &Value) -> Result<Plan, ParseError> {
        let Some(plan) = value.get("plan") else {
            return Err(ParseError::MissingPlan);
        };
        if !plan.is_object() {
            return Err(ParseError::Malformed("`plan` must be an object".into()));
        }

        let steps = match plan.get("steps") {
            None | Some(Value::Null) => return Err(ParseError::EmptySteps),
            Some(Value::Array(steps)) if steps.is_empty() => return Err(ParseError::EmptySteps),
            Some(Value::Array(steps)) => steps,
            Some(_) => return Err(ParseError::Malformed("`plan.steps` must be a list".into())),
        };

        let steps = steps
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                serde_json::from_value::<PlanStep>(raw.clone())
                    .map_err(|error| ParseError::Malformed(format!("step {}: {error}", index + 1)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let start = match plan.get("start") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) if id.trim().is_empty() => None,
            Some(Value::String(id)) => Some(id.clone()),
            Some(_) => return Err(ParseError::Malformed("`plan.start` must be a string".into())),
        };

        Ok(Plan::new(start, steps))
    }

    pub fn extract_json(text: &str) -> Option<&str> {
        if let Some(start) = text.find("```json") {
            let json_start = start + "```json".len();
            let rest = &text[json_start..];
            if let Some(end) = rest.find("```") {
                let candidate = rest[..end].trim();
                if !candidate.is_empty() {
                    return Some(candidate);
                }
            }
        }

        if let Some(start) = text.find("```\n{") {
            let json_start = start + "```\n".len();
            let rest = &text[json_start..];
            if let Some(end) = rest.find("```") {
                let candidate = rest[..end].trim();
                if !candidate.is_empty() {
                    return Some(candidate);
                }
            }
        }

        let open = text.find('{')?;
        let close = text.rfind('}')?;
        if close > open {
            return Some(&text[open..=close]);
        }

        None
    }

    fn decode_text(text: &str) -> Result<Value, ParseError> {
        match serde_json::from_str::<Value>(text.trim()) {
            Ok(value) => Ok(value),
            Err(direct_error) => Self::extract_json(text)
                .and_then(|candidate| serde_json::from_str::<Value>(candidate).ok())
                .ok_or_else(|| ParseError::InvalidJson(direct_error.to_string())),
        }
    }
}
