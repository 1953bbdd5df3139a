use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use skyprice_core::{Field, PropertyDraft};

use crate::ExtractionError;

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[a-zA-Z]*\s*(.*?)\s*```\s*$").expect("code fence pattern is valid")
});

/// Parses the model's reply into a draft. The reply must be a flat JSON
/// object carrying all nine keys with number, string or null values.
pub fn parse_reply(content: &str) -> Result<PropertyDraft, ExtractionError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ExtractionError::EmptyReply);
    }

    let json = CODE_FENCE
        .captures(trimmed)
        .and_then(|captures| captures.get(1))
        .map(|inner| inner.as_str())
        .unwrap_or(trimmed);

    let value: Value =
        serde_json::from_str(json).map_err(|e| ExtractionError::Parse(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| ExtractionError::Parse("reply is not a JSON object".to_string()))?;

    let mut draft = PropertyDraft::default();
    for field in Field::ALL {
        let key = field.wire_name();
        let value = object.get(key).ok_or(ExtractionError::MissingKey(key))?;
        match value {
            Value::Null | Value::Number(_) | Value::String(_) => {
                draft.set(field, Some(value.clone()));
            }
            _ => return Err(ExtractionError::UnexpectedValue(key)),
        }
    }

    Ok(draft)
}
