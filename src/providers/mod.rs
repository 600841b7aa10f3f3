use anyhow::{Context, Result, anyhow};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::languages::TargetLanguage;

mod google;
mod openai;
mod retry;

pub use google::GoogleTranslate;
pub use openai::OpenAI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Google,
    OpenAI,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::OpenAI => "openai",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSelection {
    pub provider: ProviderKind,
    pub requested_model: Option<String>,
}

/// Transport options shared by every HTTP-backed provider.
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    pub timeout: Duration,
    pub max_retries: usize,
}

pub type ProviderFuture = Pin<Box<dyn Future<Output = Result<String>> + Send>>;

/// A remote translation capability. Implementations return an error for any
/// failure; the fallback policy lives in [`crate::Translator`].
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;
    fn translate(&self, text: &str, target: TargetLanguage) -> ProviderFuture;
}

#[derive(Debug, Clone)]
pub enum ProviderImpl {
    Google(GoogleTranslate),
    OpenAI(OpenAI),
}

impl Provider for ProviderImpl {
    fn name(&self) -> &'static str {
        match self {
            ProviderImpl::Google(provider) => provider.name(),
            ProviderImpl::OpenAI(provider) => provider.name(),
        }
    }

    fn translate(&self, text: &str, target: TargetLanguage) -> ProviderFuture {
        match self {
            ProviderImpl::Google(provider) => provider.translate(text, target),
            ProviderImpl::OpenAI(provider) => provider.translate(text, target),
        }
    }
}

pub fn build_provider(
    selection: &ProviderSelection,
    override_key: Option<&str>,
    options: &ProviderOptions,
) -> Result<ProviderImpl> {
    match selection.provider {
        ProviderKind::Google => Ok(ProviderImpl::Google(GoogleTranslate::new(options)?)),
        ProviderKind::OpenAI => {
            let key = resolve_openai_key(override_key)
                .with_context(|| "no API key found for selected provider")?;
            let mut provider = OpenAI::new(key, options)?;
            if let Some(model) = selection.requested_model.as_deref() {
                provider = provider.with_model(model);
            }
            Ok(ProviderImpl::OpenAI(provider))
        }
    }
}

pub fn resolve_provider_selection(provider_arg: &str) -> Result<ProviderSelection> {
    let raw = provider_arg.trim();
    if raw.is_empty() {
        return Err(anyhow!("provider argument is empty"));
    }

    if let Some(provider) = provider_from_name(&raw.to_lowercase()) {
        return Ok(ProviderSelection {
            provider,
            requested_model: None,
        });
    }

    if let Some((provider, model)) = parse_provider_model_pair(raw) {
        return Ok(ProviderSelection {
            provider,
            requested_model: model,
        });
    }

    Err(anyhow!(
        "unknown provider '{}'. Use google, openai or openai:MODEL",
        raw
    ))
}

/// The gtx endpoint is keyless, so only OpenAI needs one.
pub fn resolve_openai_key(override_key: Option<&str>) -> Result<String> {
    if let Some(key) = override_key.filter(|key| !key.trim().is_empty()) {
        return Ok(key.to_string());
    }
    get_env("OPENAI_API_KEY").ok_or_else(|| {
        anyhow!(
            "API key not found for provider {}",
            ProviderKind::OpenAI.as_str()
        )
    })
}

fn parse_provider_model_pair(input: &str) -> Option<(ProviderKind, Option<String>)> {
    let (provider_part, model_part) = input.split_once(':')?;
    let provider = provider_from_name(&provider_part.trim().to_lowercase())?;
    let model = if model_part.trim().is_empty() {
        None
    } else {
        Some(model_part.trim().to_string())
    };
    Some((provider, model))
}

fn provider_from_name(name: &str) -> Option<ProviderKind> {
    match name {
        "google" | "gtx" => Some(ProviderKind::Google),
        "openai" => Some(ProviderKind::OpenAI),
        _ => None,
    }
}

pub(crate) fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

pub(crate) fn build_http_client(options: &ProviderOptions) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(options.timeout)
        .build()
        .with_context(|| "failed to build HTTP client")
}
