use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use super::retry::{RATE_LIMIT_BASE_DELAY, is_rate_limited, retry_after, wait_with_backoff};
use super::{Provider, ProviderFuture, ProviderOptions, build_http_client, get_env};
use crate::languages::TargetLanguage;

const DEFAULT_BASE_URL: &str = "https://translate.googleapis.com";

/// Google Translate web endpoint (`client=gtx`); needs no API key and
/// auto-detects the source language.
#[derive(Debug, Clone)]
pub struct GoogleTranslate {
    client: reqwest::Client,
    base_url: String,
    max_retries: usize,
}

impl GoogleTranslate {
    pub fn new(options: &ProviderOptions) -> Result<Self> {
        Ok(Self {
            client: build_http_client(options)?,
            base_url: get_env("GOOGLE_TRANSLATE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            max_retries: options.max_retries,
        })
    }
}

impl Provider for GoogleTranslate {
    fn name(&self) -> &'static str {
        "google"
    }

    fn translate(&self, text: &str, target: TargetLanguage) -> ProviderFuture {
        let client = self.client.clone();
        let url = format!("{}/translate_a/single", self.base_url.trim_end_matches('/'));
        let text = text.to_string();
        let max_retries = self.max_retries;
        Box::pin(async move {
            request_translation(&client, &url, &text, target_code(target), max_retries).await
        })
    }
}

async fn request_translation(
    client: &reqwest::Client,
    url: &str,
    text: &str,
    target: &str,
    max_retries: usize,
) -> Result<String> {
    let mut attempt = 0usize;
    let mut delay = RATE_LIMIT_BASE_DELAY;
    loop {
        let response = client
            .post(url)
            .query(&[("client", "gtx"), ("sl", "auto"), ("tl", target), ("dt", "t")])
            .form(&[("q", text)])
            .send()
            .await
            .with_context(|| "Google Translate request failed")?;

        let status = response.status();
        let retry_after = retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();
        if status.is_success() {
            return extract_translation(&body);
        }
        if is_rate_limited(status, &body) && attempt < max_retries {
            attempt += 1;
            delay = wait_with_backoff("Google Translate", attempt, max_retries, delay, retry_after)
                .await;
            continue;
        }
        return Err(anyhow!(
            "Google Translate error ({}): {}",
            status,
            body.trim()
        ));
    }
}

fn target_code(target: TargetLanguage) -> &'static str {
    match target {
        TargetLanguage::ChineseSimplified => "zh-CN",
        other => other.code(),
    }
}

/// The response is a nested array; element 0 holds one
/// `[translated, original, ...]` entry per sentence.
fn extract_translation(body: &str) -> Result<String> {
    let payload: Value =
        serde_json::from_str(body).with_context(|| "failed to parse Google Translate response")?;
    let segments = payload
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("no translation segments in Google Translate response"))?;

    let mut translated = String::new();
    for segment in segments {
        if let Some(part) = segment.get(0).and_then(Value::as_str) {
            translated.push_str(part);
        }
    }
    if translated.is_empty() {
        return Err(anyhow!("Google Translate returned an empty translation"));
    }
    Ok(translated)
}
