use serde_json::Value;
use tracing::warn;

use crate::risk::LlmJudgment;

/// Turn raw model output into a judgment.
///
/// Accepts fenced or chatty output, strict JSON, and relaxed JSON5. When no
/// JSON object can be recovered the whole text becomes the reasoning, so the
/// risk engine still receives a string.
pub fn parse_judgment(raw: &str) -> LlmJudgment {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return LlmJudgment::default();
    }
    let unfenced = strip_code_fence(trimmed).unwrap_or(trimmed);

    let Some(object) = json_object_slice(unfenced) else {
        return LlmJudgment::from_reasoning(trimmed);
    };

    let value = serde_json::from_str::<Value>(object)
        .ok()
        .or_else(|| json5::from_str::<Value>(object).ok());

    match value {
        Some(Value::Object(map)) => judgment_from_object(&map),
        _ => {
            warn!(
                preview = %preview(trimmed),
                "failed to parse structured JSON from LLM output; using raw text as reasoning"
            );
            LlmJudgment::from_reasoning(trimmed)
        }
    }
}

fn judgment_from_object(map: &serde_json::Map<String, Value>) -> LlmJudgment {
    let text = |key: &str| match map.get(key) {
        Some(Value::String(value)) => Some(value.trim().to_string()),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    };

    LlmJudgment {
        reasoning: text("reasoning").unwrap_or_default(),
        risk_score: map.get("risk_score").and_then(coerce_score),
        risk_level: text("risk_level"),
        verdict: text("verdict"),
        red_flags: match map.get("red_flags") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(flag) => Some(flag.trim().to_string()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .filter(|flag| !flag.is_empty())
                .collect(),
            _ => Vec::new(),
        },
    }
}

fn coerce_score(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|score| score.round() as i64)),
        Value::String(text) => text.trim().parse::<f64>().ok().map(|score| score.round() as i64),
        _ => None,
    }
}

fn json_object_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn strip_code_fence(input: &str) -> Option<&str> {
    let rest = input.strip_prefix("```")?;
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    let end = rest.rfind("```").unwrap_or(rest.len());
    Some(rest[..end].trim())
}

fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}
