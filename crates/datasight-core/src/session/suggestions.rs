use crate::constants::limits;
use crate::decode;
use crate::llm::{ChatOptions, LlmClient, Message};
use serde::{Deserialize, Serialize};

const SUGGESTIONS_PROMPT: &str = r#"Based on the ongoing conversation about data analysis, generate 2-3 relevant next step suggestions.
Each suggestion should have a title and a brief description.
Respond directly with JSON, following this schema:
{
  "suggestions": [
    {
      "title": string,
      "description": string,
      "icon": string (one of: "chart", "compare", "export", "filter", "predict", "share", "question", "code")
    }
  ]
}"#;

/// Category tag for a suggestion. Unknown tags decode as `Question`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum SuggestionIcon {
    Chart,
    Compare,
    Export,
    Filter,
    Predict,
    Share,
    Question,
    Code,
}

impl SuggestionIcon {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Chart => "chart",
            Self::Compare => "compare",
            Self::Export => "export",
            Self::Filter => "filter",
            Self::Predict => "predict",
            Self::Share => "share",
            Self::Question => "question",
            Self::Code => "code",
        }
    }
}

impl From<String> for SuggestionIcon {
    fn from(tag: String) -> Self {
        match tag.to_lowercase().as_str() {
            "chart" => Self::Chart,
            "compare" => Self::Compare,
            "export" => Self::Export,
            "filter" => Self::Filter,
            "predict" => Self::Predict,
            "share" => Self::Share,
            "code" => Self::Code,
            _ => Self::Question,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub title: String,
    pub description: String,
    #[serde(default = "default_icon")]
    pub icon: SuggestionIcon,
}

fn default_icon() -> SuggestionIcon {
    SuggestionIcon::Question
}

impl Suggestion {
    fn new(title: &str, description: &str, icon: SuggestionIcon) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            icon,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SuggestionPayload {
    suggestions: Vec<Suggestion>,
}

/// Shown before any conversation exists.
pub fn default_suggestions() -> Vec<Suggestion> {
    vec![
        Suggestion::new(
            "Upload Data",
            "Upload your data files for comprehensive analysis and insights.",
            SuggestionIcon::Chart,
        ),
        Suggestion::new(
            "Ask Technical Questions",
            "Ask about specific data points, trends, or statistical analysis.",
            SuggestionIcon::Code,
        ),
    ]
}

/// Used when the model's reply does not decode.
pub fn malformed_fallback() -> Vec<Suggestion> {
    vec![
        Suggestion::new(
            "Run Predictive Analysis",
            "Project future trends based on the current data patterns.",
            SuggestionIcon::Predict,
        ),
        Suggestion::new(
            "Export Analysis Report",
            "Generate a comprehensive PDF report with all insights.",
            SuggestionIcon::Export,
        ),
    ]
}

/// Used when the request itself fails.
pub fn unavailable_fallback() -> Vec<Suggestion> {
    vec![Suggestion::new(
        "Ask Follow-up Questions",
        "Ask further questions to get more insights from your data.",
        SuggestionIcon::Question,
    )]
}

/// Decode a structured suggestions reply, falling back on anything unusable.
///
/// Any reply that does not decode as a non-empty `suggestions` list,
/// including valid JSON without that key, gets the malformed fallback.
/// The single-item fallback is reserved for a failed request.
pub fn parse_suggestions(raw: &str) -> Vec<Suggestion> {
    let mut suggestions = decode::decode_or(raw, "suggestions", || SuggestionPayload {
        suggestions: malformed_fallback(),
    })
    .suggestions;

    if suggestions.is_empty() {
        tracing::warn!("model returned no suggestions, using fallback");
        return malformed_fallback();
    }
    suggestions.truncate(limits::MAX_SUGGESTIONS);
    suggestions
}

/// Next-step suggestions for a conversation. Best effort: never fails.
///
/// A conversation of one message or less (empty, or only the system
/// message) gets the static defaults without a remote call.
pub async fn refresh_suggestions(llm: &dyn LlmClient, conversation: &[Message]) -> Vec<Suggestion> {
    if conversation.len() <= 1 {
        return default_suggestions();
    }

    let mut request = vec![Message::system(SUGGESTIONS_PROMPT)];
    request.extend(conversation.iter().filter(|m| !m.is_system()).cloned());

    match llm.chat(&request, ChatOptions::structured()).await {
        Ok(response) => parse_suggestions(response.message.text().unwrap_or_default()),
        Err(e) => {
            tracing::warn!("suggestions request failed: {}", e);
            unavailable_fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_payload_with_unknown_icon() {
        let raw = r#"{"suggestions":[
            {"title":"Compare regions","description":"Side by side","icon":"compare"},
            {"title":"Something","description":"Else","icon":"rocket"}
        ]}"#;
        let parsed = parse_suggestions(raw);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].icon, SuggestionIcon::Compare);
        assert_eq!(parsed[1].icon, SuggestionIcon::Question);
    }

    #[test]
    fn test_parse_malformed_gives_two_item_fallback() {
        assert_eq!(parse_suggestions("not json at all"), malformed_fallback());
        assert_eq!(parse_suggestions(r#"{"suggestions": []}"#), malformed_fallback());
        assert_eq!(malformed_fallback().len(), 2);
    }

    #[test]
    fn test_json_without_suggestions_key_is_malformed() {
        assert_eq!(parse_suggestions(r#"{"items": [{"title": "x"}]}"#), malformed_fallback());
        assert_eq!(parse_suggestions("[]"), malformed_fallback());
        assert_ne!(parse_suggestions("{}"), unavailable_fallback());
    }

    #[test]
    fn test_parse_caps_at_three() {
        let item = r#"{"title":"t","description":"d","icon":"chart"}"#;
        let raw = format!(r#"{{"suggestions":[{item},{item},{item},{item}]}}"#);
        assert_eq!(parse_suggestions(&raw).len(), 3);
    }

    #[test]
    fn test_icon_serializes_lowercase() {
        assert_eq!(serde_json::to_value(SuggestionIcon::Predict).unwrap(), "predict");
    }
}
