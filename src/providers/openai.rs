use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::json;
use tera::{Context as TeraContext, Tera};

use super::retry::{RATE_LIMIT_BASE_DELAY, is_rate_limited, retry_after, wait_with_backoff};
use super::{Provider, ProviderFuture, ProviderOptions, build_http_client, get_env};
use crate::languages::TargetLanguage;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub(crate) const DEFAULT_MODEL: &str = "gpt-4o-mini";

const SYSTEM_PROMPT_TEMPLATE: &str = "You translate document text. Translate the user's message into {{ target_label }} ({{ target_code }}). Keep line breaks and numbering as they are. Reply with the translated text only, without notes or quotes.";

#[derive(Debug, Clone)]
pub struct OpenAI {
    client: reqwest::Client,
    key: String,
    model: String,
    base_url: String,
    max_retries: usize,
}

impl OpenAI {
    pub fn new(key: impl Into<String>, options: &ProviderOptions) -> Result<Self> {
        Ok(Self {
            client: build_http_client(options)?,
            key: key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: get_env("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            max_retries: options.max_retries,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }
}

impl Provider for OpenAI {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn translate(&self, text: &str, target: TargetLanguage) -> ProviderFuture {
        let provider = self.clone();
        let text = text.to_string();
        Box::pin(async move { call_chat_completions(provider, text, target).await })
    }
}

pub(crate) fn render_system_prompt(target: TargetLanguage) -> Result<String> {
    let mut context = TeraContext::new();
    context.insert("target_label", target.label());
    context.insert("target_code", target.code());
    Tera::one_off(SYSTEM_PROMPT_TEMPLATE, &context, false)
        .with_context(|| "failed to render system prompt")
}

async fn call_chat_completions(
    provider: OpenAI,
    text: String,
    target: TargetLanguage,
) -> Result<String> {
    let url = format!("{}/chat/completions", provider.base_url.trim_end_matches('/'));
    let body = json!({
        "model": provider.model,
        "temperature": 0,
        "messages": [
            {"role": "system", "content": render_system_prompt(target)?},
            {"role": "user", "content": text}
        ]
    });

    let mut attempt = 0usize;
    let mut delay = RATE_LIMIT_BASE_DELAY;
    loop {
        let response = provider
            .client
            .post(&url)
            .bearer_auth(&provider.key)
            .json(&body)
            .send()
            .await
            .with_context(|| "OpenAI request failed")?;

        let status = response.status();
        let retry_after = retry_after(response.headers());
        let text = response.text().await.unwrap_or_default();
        if status.is_success() {
            return extract_message_content(&text);
        }
        if is_rate_limited(status, &text) && attempt < provider.max_retries {
            attempt += 1;
            delay =
                wait_with_backoff("OpenAI", attempt, provider.max_retries, delay, retry_after).await;
            continue;
        }
        return Err(anyhow!(
            "OpenAI API error ({}): {}",
            status,
            extract_openai_error(&text).unwrap_or(text)
        ));
    }
}

fn extract_message_content(text: &str) -> Result<String> {
    let payload: OpenAIResponse =
        serde_json::from_str(text).with_context(|| "failed to parse OpenAI response JSON")?;
    let content = payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| anyhow!("no message content returned from OpenAI"))?;
    Ok(content)
}

fn extract_openai_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<OpenAIError>,
    }

    #[derive(Deserialize)]
    struct OpenAIError {
        message: Option<String>,
        #[serde(rename = "type")]
        kind: Option<String>,
        code: Option<String>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    let parts = [
        error.message,
        error.kind.map(|kind| format!("type: {}", kind)),
        error.code.map(|code| format!("code: {}", code)),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.trim().is_empty())
    .collect::<Vec<_>>();
    if parts.is_empty() {
        Some("unknown error".to_string())
    } else {
        Some(parts.join(" | "))
    }
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}
