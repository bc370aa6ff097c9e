use serde::{Deserialize, Serialize};

/// Language of the phrase that introduces the review data in each prompt payload
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptLanguage {
    #[serde(rename = "de")]
    #[default]
    German,
    #[serde(rename = "en")]
    English,
}

impl std::fmt::Display for PromptLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromptLanguage::German => write!(f, "de"),
            PromptLanguage::English => write!(f, "en"),
        }
    }
}

impl std::str::FromStr for PromptLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "de" | "german" | "deutsch" => Ok(PromptLanguage::German),
            "en" | "english" => Ok(PromptLanguage::English),
            _ => Err(format!("Unknown prompt language: {}", s)),
        }
    }
}

impl PromptLanguage {
    /// Phrase placed between the prompt template and the serialized reviews.
    pub fn data_intro(&self) -> &'static str {
        match self {
            PromptLanguage::German => "Hier sind die zu analysierenden Daten:",
            PromptLanguage::English => "Here is the data to analyze:",
        }
    }
}
