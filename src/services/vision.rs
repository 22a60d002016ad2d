//! Prescription image analysis through an OpenAI-compatible vision model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::config::VisionConfig;

const USER_INSTRUCTION: &str = "Analyze this medical prescription image and extract structured data.";

// Per-1K-token prices used for cost accounting.
const INPUT_COST_PER_1K: f64 = 0.005;
const OUTPUT_COST_PER_1K: f64 = 0.015;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("OpenAI API key not configured")]
    MissingApiKey,
    #[error("vision request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("vision service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("vision service returned no content")]
    EmptyResponse,
    #[error("could not parse vision response: {0}")]
    Parse(String),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Structured fields read off a prescription image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionExtraction {
    pub is_prescription: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practice_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medications: Option<Vec<Medication>>,
    pub overall_confidence: f64,
    pub scan_quality: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_warnings: Option<Vec<String>>,
}

impl PrescriptionExtraction {
    /// Confidence scores must be percentages.
    pub fn check(&self) -> Result<(), VisionError> {
        for (field, value) in [
            ("overallConfidence", self.overall_confidence),
            ("scanQuality", self.scan_quality),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(VisionError::Invalid(format!("{field} must be between 0 and 100, got {value}")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

impl TokenUsage {
    /// Dollar cost, rounded to four decimals.
    pub fn cost(&self) -> f64 {
        let input = self.prompt_tokens as f64 * INPUT_COST_PER_1K / 1000.0;
        let output = self.completion_tokens as f64 * OUTPUT_COST_PER_1K / 1000.0;
        ((input + output) * 10_000.0).round() / 10_000.0
    }
}

#[derive(Debug, Clone)]
pub struct VisionAnalysis {
    pub extraction: PrescriptionExtraction,
    pub usage: TokenUsage,
}

#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    /// `image` is a `data:image/...;base64,` URL.
    async fn analyze(&self, image: &str) -> Result<VisionAnalysis, VisionError>;
}

/// Chat-completions client asking for a JSON object response.
pub struct OpenAiVision {
    client: reqwest::Client,
    config: VisionConfig,
}

impl OpenAiVision {
    pub fn new(client: reqwest::Client, config: VisionConfig) -> Self {
        OpenAiVision { client, config }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

fn parse_completion(response: ChatResponse) -> Result<VisionAnalysis, VisionError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(VisionError::EmptyResponse)?;
    let extraction: PrescriptionExtraction =
        serde_json::from_str(&content).map_err(|err| VisionError::Parse(err.to_string()))?;
    extraction.check()?;
    Ok(VisionAnalysis {
        extraction,
        usage: response.usage.unwrap_or_default(),
    })
}

#[async_trait]
impl VisionAnalyzer for OpenAiVision {
    async fn analyze(&self, image: &str) -> Result<VisionAnalysis, VisionError> {
        let api_key = self.config.api_key.as_deref().ok_or(VisionError::MissingApiKey)?;
        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": self.config.system_prompt },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": USER_INSTRUCTION },
                        { "type": "image_url", "image_url": { "url": image } }
                    ]
                }
            ]
        });

        tracing::debug!(model = %self.config.model, "requesting prescription analysis");
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url.trim_end_matches('/')))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| VisionError::Parse(err.to_string()))?;
        parse_completion(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(content: &str) -> ChatResponse {
        serde_json::from_value(json!({
            "choices": [{ "message": { "content": content } }],
            "usage": { "prompt_tokens": 1200, "completion_tokens": 300 }
        }))
        .unwrap()
    }

    #[test]
    fn cost_uses_token_prices() {
        let usage = TokenUsage {
            prompt_tokens: 1200,
            completion_tokens: 300,
        };
        assert_eq!(usage.cost(), 0.0105);
        assert_eq!(TokenUsage::default().cost(), 0.0);
    }

    #[test]
    fn completion_content_becomes_extraction() {
        let analysis = parse_completion(completion(
            r#"{"isPrescription":true,"doctorName":"Sipho","medications":[{"name":"Amoxicillin","dosage":"500mg","frequency":"3x daily","duration":"7 days"}],"overallConfidence":87,"scanQuality":90}"#,
        ))
        .unwrap();
        assert!(analysis.extraction.is_prescription);
        assert_eq!(analysis.extraction.medications.as_ref().unwrap()[0].name, "Amoxicillin");
        assert_eq!(analysis.usage.prompt_tokens, 1200);

        let serialized = serde_json::to_value(&analysis.extraction).unwrap();
        assert_eq!(serialized["overallConfidence"], 87.0);
        assert!(serialized.get("patientName").is_none());
    }

    #[test]
    fn out_of_range_confidence_is_rejected() {
        let err = parse_completion(completion(
            r#"{"isPrescription":true,"overallConfidence":140,"scanQuality":90}"#,
        ))
        .unwrap_err();
        assert!(matches!(err, VisionError::Invalid(_)));
        assert!(matches!(parse_completion(completion("  ")), Err(VisionError::EmptyResponse)));
        assert!(matches!(parse_completion(completion("not json")), Err(VisionError::Parse(_))));
    }
}
