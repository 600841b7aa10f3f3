use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_addr: String,
    pub max_upload_bytes: usize,
    pub provider: String,
    pub model: Option<String>,
    pub timeout: Duration,
    pub max_retries: usize,
    pub pdf_font_size: f32,
    pub pdf_margin: f32,
    pub pdf_line_spacing: f32,
    pub pdf_font_path: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:5000".to_string(),
            max_upload_bytes: 32 * 1024 * 1024,
            provider: "google".to_string(),
            model: None,
            timeout: Duration::from_secs(30),
            max_retries: 2,
            pdf_font_size: 12.0,
            pdf_margin: 72.0,
            pdf_line_spacing: 1.2,
            pdf_font_path: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    server: Option<ServerSettings>,
    translator: Option<TranslatorSettings>,
    pdf: Option<PdfSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
    max_upload_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct TranslatorSettings {
    provider: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct PdfSettings {
    font_size: Option<f32>,
    margin: Option<f32>,
    line_spacing: Option<f32>,
    font_path: Option<String>,
}

/// Loads settings from the embedded defaults, then `settings.toml` and
/// `settings.local.toml` in the working directory, then `extra_path`.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).with_context(|| "failed to parse default settings")?;
    settings.merge(defaults);

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            settings
                .merge_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
        }
    }

    Ok(settings)
}

impl Settings {
    pub fn merge_str(&mut self, content: &str) -> Result<()> {
        let parsed: SettingsFile = toml::from_str(content)?;
        self.merge(parsed);
        Ok(())
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(server) = incoming.server {
            if let Some(addr) = server.addr {
                if !addr.trim().is_empty() {
                    self.server_addr = addr.trim().to_string();
                }
            }
            if let Some(limit) = server.max_upload_bytes {
                if limit > 0 {
                    self.max_upload_bytes = limit;
                }
            }
        }
        if let Some(translator) = incoming.translator {
            if let Some(provider) = translator.provider {
                if !provider.trim().is_empty() {
                    self.provider = provider.trim().to_string();
                }
            }
            if let Some(model) = translator.model {
                if !model.trim().is_empty() {
                    self.model = Some(model.trim().to_string());
                }
            }
            if let Some(secs) = translator.timeout_secs {
                if secs > 0 {
                    self.timeout = Duration::from_secs(secs);
                }
            }
            if let Some(retries) = translator.max_retries {
                self.max_retries = retries;
            }
        }
        if let Some(pdf) = incoming.pdf {
            if let Some(size) = pdf.font_size {
                if size > 0.0 {
                    self.pdf_font_size = size;
                }
            }
            if let Some(margin) = pdf.margin {
                if margin >= 0.0 {
                    self.pdf_margin = margin;
                }
            }
            if let Some(spacing) = pdf.line_spacing {
                if spacing > 0.0 {
                    self.pdf_line_spacing = spacing;
                }
            }
            if let Some(path) = pdf.font_path {
                if !path.trim().is_empty() {
                    self.pdf_font_path = Some(path);
                }
            }
        }
    }
}
