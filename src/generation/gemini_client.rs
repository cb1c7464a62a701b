use anyhow::Result;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::domain::value_objects::enums::model_tiers::ModelTier;

const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Minimal Gemini generateContent client built on reqwest.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }

    /// Generates free-form text for the given prompt on the tier's model.
    pub async fn generate_content(&self, prompt: &str, tier: ModelTier) -> Result<String> {
        let url = format!(
            "{GEMINI_API_BASE_URL}/models/{}:generateContent?key={}",
            tier.model_id(),
            self.api_key
        );

        let resp = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(&json!({
                "contents": [{ "parts": [{ "text": prompt }] }],
                "generationConfig": {
                    "temperature": 0.7,
                    "maxOutputTokens": 4096,
                },
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!(
                status = %status,
                model = tier.model_id(),
                response_body = %body,
                "gemini api request failed"
            );
            anyhow::bail!("Gemini API request failed (status {status})");
        }

        let parsed: GenerateContentResponse = resp.json().await?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text);

        text.ok_or_else(|| anyhow::anyhow!("Gemini API response has no text candidate"))
    }
}
