use nr_core::{Error, Result};
use serde::de::DeserializeOwned;

/// Parses a JSON object out of a generated reply.
///
/// Models often wrap JSON in markdown fences or surround it with prose, so
/// the outermost `{ ... }` span is taken before deserializing.
pub fn extract_json<T: DeserializeOwned>(provider: &str, raw: &str) -> Result<T> {
    let trimmed = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    let candidate = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    };
    serde_json::from_str(candidate).map_err(|e| {
        let preview: String = raw.chars().take(80).collect();
        Error::Provider(format!(
            "{provider} returned an unexpected reply shape ({e}): {preview:?}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Label {
        name: String,
        summary: Option<String>,
    }

    #[test]
    fn test_plain_json() {
        let label: Label = extract_json("p", r#"{"name": "AI", "summary": "Models"}"#).unwrap();
        assert_eq!(label.name, "AI");
        assert_eq!(label.summary.as_deref(), Some("Models"));
    }

    #[test]
    fn test_fenced_and_prose() {
        let raw = "Sure! Here it is:\n```json\n{\"name\": \"Space\"}\n```\nHope this helps.";
        let label: Label = extract_json("p", raw).unwrap();
        assert_eq!(label.name, "Space");
        assert!(label.summary.is_none());
    }

    #[test]
    fn test_invalid_reply() {
        let err = extract_json::<Label>("groq", "I cannot help with that").unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
        assert!(err.to_string().contains("groq"));

        let err = extract_json::<Label>("groq", r#"{"title": "no name"}"#).unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }
}
