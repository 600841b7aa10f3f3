use tracing::{debug, warn};

use crate::languages::TargetLanguage;
use crate::providers::Provider;

/// Result of a single translation call. A failed call carries the original
/// text so callers can pass it through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationOutcome {
    Translated(String),
    Fallback { original: String, reason: String },
}

impl TranslationOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, TranslationOutcome::Fallback { .. })
    }

    pub fn text(&self) -> &str {
        match self {
            TranslationOutcome::Translated(text) => text,
            TranslationOutcome::Fallback { original, .. } => original,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            TranslationOutcome::Translated(text) => text,
            TranslationOutcome::Fallback { original, .. } => original,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Translator<P: Provider> {
    provider: P,
}

impl<P: Provider> Translator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Translates `text`, falling back to the original on any provider error.
    pub async fn translate(&self, text: &str, target: TargetLanguage) -> TranslationOutcome {
        debug!(
            "translating {} chars to {} via {}",
            text.chars().count(),
            target,
            self.provider.name()
        );
        match self.provider.translate(text, target).await {
            Ok(translated) => TranslationOutcome::Translated(translated),
            Err(err) => {
                warn!(
                    "translation via {} failed, keeping original text: {:#}",
                    self.provider.name(),
                    err
                );
                TranslationOutcome::Fallback {
                    original: text.to_string(),
                    reason: format!("{:#}", err),
                }
            }
        }
    }
}
