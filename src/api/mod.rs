//! Wire payloads exchanged with the relay, plus the text-extraction rules
//! for whole-document responses.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::core::constants::{NO_ASSISTANT_MESSAGE, NO_RESPONSE_TEXT};
use crate::core::message::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningSummary {
    Auto,
    Concise,
    Detailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reasoning {
    pub effort: ReasoningEffort,
    pub summary: ReasoningSummary,
}

/// Body of `POST /api/chat`. The input is the whole transcript flattened to
/// one string; see [`flatten_transcript`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Reasoning>,
}

/// Whole-document (non-streaming) response shape. Every field defaults so a
/// shape mismatch degrades to the placeholder strings instead of failing the
/// exchange.
#[derive(Debug, Default, Deserialize)]
pub struct ResponseDocument {
    #[serde(default)]
    pub output: Vec<OutputItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OutputItem {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

/// Resolve a whole-document response to its reply text: the first
/// `message`/`assistant` output item, then its first `output_text` part.
pub fn extract_output_text(doc: &ResponseDocument) -> String {
    let Some(item) = doc
        .output
        .iter()
        .find(|item| item.kind == "message" && item.role == "assistant")
    else {
        return NO_ASSISTANT_MESSAGE.to_string();
    };
    match item.content.iter().find(|part| part.kind == "output_text") {
        Some(part) => part.text.clone(),
        None => NO_RESPONSE_TEXT.to_string(),
    }
}

/// Join every message's content with newlines, no role tags. The model sees
/// one flattened transcript; multi-turn structure is not preserved on the
/// wire.
pub fn flatten_transcript<'a>(history: impl IntoIterator<Item = &'a Message>) -> String {
    history
        .into_iter()
        .map(|msg| msg.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_the_first_assistant_output_text() {
        let doc: ResponseDocument = serde_json::from_str(
            r#"{"output":[
                {"type":"reasoning","role":"assistant","content":[]},
                {"type":"message","role":"assistant","content":[
                    {"type":"annotation","text":"not this"},
                    {"type":"output_text","text":"Hi there"}
                ]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(extract_output_text(&doc), "Hi there");
    }

    #[test]
    fn missing_assistant_item_yields_the_fixed_placeholder() {
        let doc: ResponseDocument =
            serde_json::from_str(r#"{"output":[{"type":"reasoning","role":"assistant"}]}"#)
                .unwrap();
        assert_eq!(extract_output_text(&doc), NO_ASSISTANT_MESSAGE);

        let empty: ResponseDocument = serde_json::from_str("{}").unwrap();
        assert_eq!(extract_output_text(&empty), NO_ASSISTANT_MESSAGE);
    }

    #[test]
    fn assistant_item_without_output_text_yields_the_other_placeholder() {
        let doc: ResponseDocument = serde_json::from_str(
            r#"{"output":[{"type":"message","role":"assistant","content":[
                {"type":"refusal","text":"no"}
            ]}]}"#,
        )
        .unwrap();
        assert_eq!(extract_output_text(&doc), NO_RESPONSE_TEXT);
    }

    #[test]
    fn flatten_joins_contents_without_role_tags() {
        let history = [
            Message::assistant("Hello!"),
            Message::user("Tell me a joke"),
            Message::assistant("Why did the chicken cross the road?"),
        ];
        assert_eq!(
            flatten_transcript(&history),
            "Hello!\nTell me a joke\nWhy did the chicken cross the road?"
        );
    }

    #[test]
    fn reasoning_is_omitted_from_the_request_when_absent() {
        let bare = ChatRequest {
            input: "hi".into(),
            reasoning: None,
        };
        let json = serde_json::to_value(&bare).unwrap();
        assert!(json.get("reasoning").is_none());

        let with = ChatRequest {
            input: "hi".into(),
            reasoning: Some(Reasoning {
                effort: ReasoningEffort::High,
                summary: ReasoningSummary::Concise,
            }),
        };
        let json = serde_json::to_value(&with).unwrap();
        assert_eq!(json["reasoning"]["effort"], "high");
        assert_eq!(json["reasoning"]["summary"], "concise");
    }
}
