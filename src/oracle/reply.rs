use serde::de::DeserializeOwned;

use crate::error::OracleError;

/// Strip a surrounding ```` ```json ```` (or bare ```` ``` ````) fence.
pub fn strip_code_fence(input: &str) -> &str {
    let trimmed = input.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the language tag on the opening fence line
    let body = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest.trim_start_matches("json"),
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// Parse a JSON object out of a model reply, tolerating code fences and
/// chatter around the object.
pub fn parse_json_reply<T: DeserializeOwned>(reply: &str) -> Result<T, OracleError> {
    let body = strip_code_fence(reply);
    if body.is_empty() {
        return Err(OracleError::malformed("empty reply"));
    }

    match serde_json::from_str(body) {
        Ok(v) => Ok(v),
        Err(first) => {
            let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) else {
                return Err(OracleError::malformed(format!("{first}: {}", preview(body))));
            };
            if end <= start {
                return Err(OracleError::malformed(format!("{first}: {}", preview(body))));
            }
            serde_json::from_str(&body[start..=end])
                .map_err(|e| OracleError::malformed(format!("{e}: {}", preview(body))))
        }
    }
}

/// Clamp a model-provided score into 0..=1. Non-finite values are malformed.
pub fn unit_score(field: &str, value: f64) -> Result<f64, OracleError> {
    if value.is_finite() {
        Ok(value.clamp(0.0, 1.0))
    } else {
        Err(OracleError::malformed(format!("{field} is not a finite number")))
    }
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(100).collect();
    if text.chars().count() > 100 {
        out.push_str("...");
    }
    out
}
