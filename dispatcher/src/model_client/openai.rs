//! OpenAI-compatible Chat Completions payloads.

use serde::{Deserialize, Serialize};

use super::{truncate_text, Prompt};

#[derive(Debug, Serialize)]
pub(super) struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f64,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

pub(super) fn build_request<'a>(
    model: &'a str,
    prompt: &'a Prompt,
    temperature: f64,
    max_tokens: Option<u32>,
) -> ChatCompletionRequest<'a> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = prompt.system.as_deref() {
        messages.push(Message {
            role: "system",
            content: system,
        });
    }
    messages.push(Message {
        role: "user",
        content: &prompt.user,
    });

    ChatCompletionRequest {
        model,
        messages,
        temperature,
        stream: false,
        max_tokens,
    }
}

pub(super) fn extract_text(body: &str) -> Result<String, String> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| format!("invalid JSON response: {e}; body={}", truncate_text(body)))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| format!("no completion content: {}", truncate_text(body)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_with_system() {
        let prompt = Prompt::new("You are the writer", "draft a memo");
        let json = serde_json::to_value(build_request("w1", &prompt, 0.2, None)).unwrap();
        assert_eq!(json["model"], "w1");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "draft a memo");
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn request_serializes_max_tokens() {
        let prompt = Prompt {
            system: None,
            user: "hi".to_string(),
        };
        let json = serde_json::to_value(build_request("h1", &prompt, 0.0, Some(256))).unwrap();
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
        assert_eq!(json["max_tokens"], 256);
    }

    #[test]
    fn extracts_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#;
        assert_eq!(extract_text(body).unwrap(), "hello");
    }

    #[test]
    fn missing_content_is_an_error() {
        assert!(extract_text(r#"{"choices":[]}"#).is_err());
        assert!(extract_text(r#"{"choices":[{"message":{"content":null}}]}"#).is_err());
        assert!(extract_text("not json").is_err());
    }
}
