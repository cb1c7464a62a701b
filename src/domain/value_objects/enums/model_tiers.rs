use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Generation tier recorded on each analysis row.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    #[default]
    Flash,
    Pro,
}

impl Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tier = match self {
            ModelTier::Flash => "flash",
            ModelTier::Pro => "pro",
        };
        write!(f, "{}", tier)
    }
}

impl ModelTier {
    pub fn from_str(value: &str) -> Self {
        match value {
            "pro" => ModelTier::Pro,
            _ => ModelTier::Flash,
        }
    }

    /// Gemini model id used for this tier.
    pub fn model_id(&self) -> &'static str {
        match self {
            ModelTier::Flash => "gemini-2.0-flash-exp",
            ModelTier::Pro => "gemini-2.5-pro",
        }
    }
}
