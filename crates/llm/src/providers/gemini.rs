use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::provider::{GenerationError, TextGenerator};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Finish reasons that mean the candidate was withheld.
const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII", "RECITATION"];

pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
}

impl GeminiGenerator {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.7,
            max_tokens: 8192,
        }
    }

    pub fn with_generation_config(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build the request body for the Gemini generateContent API.
    fn build_request_body(prompt: &str, temperature: f32, max_tokens: u32) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }],
            }],
            "generationConfig": {
                "temperature": temperature,
                "maxOutputTokens": max_tokens,
            },
        })
    }

    /// Pull the generated text out of a response, classifying refusals.
    fn parse_response(resp: &Value) -> Result<String, GenerationError> {
        if let Some(reason) = resp["promptFeedback"]["blockReason"].as_str() {
            return Err(GenerationError::ContentBlocked(format!("prompt blocked: {reason}")));
        }

        let candidate = &resp["candidates"][0];
        if candidate.is_null() {
            return Err(GenerationError::MalformedResponse("no candidates in response".into()));
        }

        let text: String = candidate["content"]["parts"]
            .as_array()
            .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            if let Some(reason) = candidate["finishReason"]
                .as_str()
                .filter(|r| BLOCKING_FINISH_REASONS.contains(r))
            {
                return Err(GenerationError::ContentBlocked(format!("response withheld: {reason}")));
            }
            return Err(GenerationError::MalformedResponse(
                "missing candidates[0].content.parts[].text".into(),
            ));
        }
        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = Self::build_request_body(prompt, self.temperature, self.max_tokens);

        debug!(model = %self.model, prompt_chars = prompt.len(), "Gemini request");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::from_status(status, body));
        }

        let raw = response.text().await?;
        let resp: Value = serde_json::from_str(&raw)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;
        Self::parse_response(&resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_structure() {
        let body = GeminiGenerator::build_request_body("Summarize this.", 0.1, 4096);

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "Summarize this.");

        let temp = body["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temp - 0.1).abs() < 1e-6, "temperature should be ~0.1, got {temp}");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 4096);
    }

    #[test]
    fn parses_multi_part_text() {
        let resp = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello, " }, { "text": "world" }] },
                "finishReason": "STOP",
            }]
        });
        assert_eq!(GeminiGenerator::parse_response(&resp).unwrap(), "Hello, world");
    }

    #[test]
    fn blocked_prompt_is_content_blocked() {
        let resp = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = GeminiGenerator::parse_response(&resp).unwrap_err();
        assert!(matches!(err, GenerationError::ContentBlocked(_)));
    }

    #[test]
    fn withheld_candidate_is_content_blocked() {
        let resp = json!({ "candidates": [{ "finishReason": "SAFETY" }] });
        let err = GeminiGenerator::parse_response(&resp).unwrap_err();
        assert!(matches!(err, GenerationError::ContentBlocked(ref m) if m.contains("SAFETY")));
    }

    #[test]
    fn missing_text_is_malformed() {
        let err = GeminiGenerator::parse_response(&json!({})).unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));

        let resp = json!({ "candidates": [{ "content": { "parts": [] }, "finishReason": "STOP" }] });
        let err = GeminiGenerator::parse_response(&resp).unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let g = GeminiGenerator::new("k".into(), "m".into()).with_base_url("http://localhost:9/");
        assert_eq!(g.base_url, "http://localhost:9");
    }
}
