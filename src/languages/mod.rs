use anyhow::{Result, anyhow};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Target languages offered by the upload form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetLanguage {
    English,
    Spanish,
    French,
    German,
    Italian,
    Portuguese,
    Russian,
    ChineseSimplified,
}

impl TargetLanguage {
    pub const ALL: [TargetLanguage; 8] = [
        TargetLanguage::English,
        TargetLanguage::Spanish,
        TargetLanguage::French,
        TargetLanguage::German,
        TargetLanguage::Italian,
        TargetLanguage::Portuguese,
        TargetLanguage::Russian,
        TargetLanguage::ChineseSimplified,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            TargetLanguage::English => "en",
            TargetLanguage::Spanish => "es",
            TargetLanguage::French => "fr",
            TargetLanguage::German => "de",
            TargetLanguage::Italian => "it",
            TargetLanguage::Portuguese => "pt",
            TargetLanguage::Russian => "ru",
            TargetLanguage::ChineseSimplified => "zh-cn",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TargetLanguage::English => "English",
            TargetLanguage::Spanish => "Spanish",
            TargetLanguage::French => "French",
            TargetLanguage::German => "German",
            TargetLanguage::Italian => "Italian",
            TargetLanguage::Portuguese => "Portuguese",
            TargetLanguage::Russian => "Russian",
            TargetLanguage::ChineseSimplified => "Chinese",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = normalize_code(code);
        Self::ALL
            .into_iter()
            .find(|language| language.code() == code)
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TargetLanguage {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        Self::from_code(value).ok_or_else(|| {
            anyhow!(
                "unsupported target language '{}' (expected one of: {})",
                value.trim(),
                supported_codes().join(", ")
            )
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguageOption {
    pub value: &'static str,
    pub label: &'static str,
}

pub fn language_options() -> Vec<LanguageOption> {
    TargetLanguage::ALL
        .iter()
        .map(|language| LanguageOption {
            value: language.code(),
            label: language.label(),
        })
        .collect()
}

pub fn supported_codes() -> Vec<&'static str> {
    TargetLanguage::ALL.iter().map(|language| language.code()).collect()
}

fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase().replace('_', "-")
}
