use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

pub mod documents;
pub mod languages;
pub mod logging;
pub mod pipeline;
mod providers;
pub mod server;
pub mod settings;
mod translator;

#[cfg(test)]
mod test_util;

pub use documents::{DocumentError, DocumentKind};
pub use languages::TargetLanguage;
pub use pipeline::{DocumentTranslation, Pipeline};
pub use providers::{
    GoogleTranslate, OpenAI, Provider, ProviderFuture, ProviderImpl, ProviderKind,
    ProviderOptions,
};
pub use translator::{TranslationOutcome, Translator};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub addr: Option<String>,
    pub provider: Option<String>,
    pub key: Option<String>,
    pub settings_path: Option<String>,
}

/// Loads settings, builds the shared translator and serves until shutdown.
pub async fn run(config: Config) -> Result<()> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;

    let provider_arg = config.provider.as_deref().unwrap_or(&settings.provider);
    let mut selection = providers::resolve_provider_selection(provider_arg)?;
    if selection.requested_model.is_none() {
        selection.requested_model = settings.model.clone();
    }
    let options = ProviderOptions {
        timeout: settings.timeout,
        max_retries: settings.max_retries,
    };
    let provider = providers::build_provider(&selection, config.key.as_deref(), &options)
        .with_context(|| format!("failed to set up provider {}", provider_arg))?;
    info!("using translation provider {}", provider.name());

    let pipeline = Pipeline::new(
        Translator::new(provider),
        documents::pdf::PdfLayout::from_settings(&settings),
    );
    let state = server::AppState::new(pipeline, settings.max_upload_bytes)?;
    let addr = config.addr.unwrap_or_else(|| settings.server_addr.clone());
    server::run_server(state, &addr).await
}
