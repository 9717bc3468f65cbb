//! Ollama `/api/chat` payloads.

use serde::{Deserialize, Serialize};

use super::{truncate_text, Prompt};

#[derive(Debug, Serialize)]
pub(super) struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
    options: Options,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct Options {
    temperature: f64,
    // Ollama's name for max_tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    error: Option<String>,
    message: Option<ResponseMessage>,
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
) -> ChatRequest<'a> {
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

    ChatRequest {
        model,
        messages,
        stream: false,
        options: Options {
            temperature,
            num_predict: max_tokens,
        },
    }
}

pub(super) fn extract_text(body: &str) -> Result<String, String> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| format!("invalid JSON response: {e}; body={}", truncate_text(body)))?;
    if let Some(error) = parsed.error {
        return Err(format!("ollama returned an error: {}", truncate_text(&error)));
    }
    parsed
        .message
        .and_then(|message| message.content)
        .ok_or_else(|| format!("no message content: {}", truncate_text(body)))
}
