//! GeminiClient - handles communication with the Gemini generateContent API.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::angles::{self, AnalysisResult};
use crate::media::DEFAULT_IMAGE_MIME;
use crate::prompt::{render_user_prompt, GenerationInputs, GENERATOR_SYSTEM_PROMPT};

/// The environment variable name for the Gemini API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default base URL for the Gemini API.
pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Model used for affiliate content generation.
pub const TEXT_MODEL: &str = "gemini-2.5-flash";

/// Model used for product image editing.
pub const IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// Sampling temperature for content generation.
pub const GENERATION_TEMPERATURE: f32 = 0.7;

/// Placeholder text used when the model returns no text at all.
pub const EMPTY_RESPONSE_FALLBACK: &str = "No response generated.";

/// Edit instruction used when the caller provides an empty one.
pub const DEFAULT_EDIT_INSTRUCTION: &str = "Edit this image to look more cinematic.";

/// Default timeout for HTTP requests (120 seconds). A generateContent call
/// blocks until the full completion is ready, so this is far longer than a
/// typical request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Validate a product link before sending it to the API.
///
/// # Arguments
/// * `link` - The product page URL supplied by the user
///
/// # Returns
/// `Ok(())` if the link is usable, `Err(GeminiError)` otherwise.
pub fn validate_product_link(link: &str) -> Result<(), GeminiError> {
    if link.trim().is_empty() {
        return Err(GeminiError::EmptyProductLink);
    }

    Ok(())
}

/// Per-call settings: API key and endpoint base.
///
/// Built fresh by the caller for every operation rather than stored in the
/// client, so a key exported after startup is seen without restarting.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    api_key: String,
    base_url: String,
}

impl ClientConfig {
    /// Read the API key from the `GEMINI_API_KEY` environment variable.
    ///
    /// An absent or empty key is not rejected here. Text and image requests
    /// sent without a key fail upstream with the server's own error, and the
    /// video flow checks its capability gate before building any request.
    pub fn from_env() -> Self {
        let api_key = std::env::var(GEMINI_API_KEY_ENV).unwrap_or_default();
        Self {
            api_key,
            base_url: GEMINI_API_BASE_URL.to_string(),
        }
    }

    /// Create a config with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: GEMINI_API_BASE_URL.to_string(),
        }
    }

    /// Create a config with a custom base URL.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Get the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether a non-empty API key is present.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Request body for the generateContent endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

/// One content part. Exactly one of the fields is set in practice.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn inline(mime_type: impl Into<String>, data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: Some(mime_type.into()),
                data,
            }),
        }
    }
}

/// Base64 image payload, in requests and responses alike.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

/// Response body from the generateContent endpoint, reduced to the fields
/// the flows actually read.
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate, empty when the
    /// response carries no text.
    fn first_text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// First part of the first candidate that carries a non-empty inline
    /// image payload.
    fn first_inline_image(&self) -> Option<&InlineData> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .and_then(|content| {
                content.parts.iter().find_map(|part| {
                    part.inline_data
                        .as_ref()
                        .filter(|inline| !inline.data.is_empty())
                })
            })
    }
}

/// HTTP client for the Gemini API.
///
/// Holds only the connection pool; credentials and endpoint come in through
/// a [`ClientConfig`] on every call.
pub struct GeminiClient {
    http_client: reqwest::Client,
}

impl GeminiClient {
    /// Create a new GeminiClient with reasonable timeouts.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::HttpError` if the underlying HTTP client cannot
    /// be constructed.
    pub fn new() -> Result<Self, GeminiError> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self { http_client })
    }

    pub(super) fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// Generate the full affiliate analysis for a product link.
    ///
    /// Renders the generator template with the given inputs, sends it to the
    /// text model with the generator system instruction, and parses the
    /// response into a general analysis plus angle blocks.
    ///
    /// # Arguments
    ///
    /// * `config` - Per-call API settings
    /// * `inputs` - Product link plus ratio, style, and tone selections
    ///
    /// # Returns
    ///
    /// An `AnalysisResult`. A model response that ignores the expected output
    /// format still succeeds, with all text in `general_analysis`.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::EmptyProductLink` if the link is blank,
    /// `GeminiError::ApiError` if the API rejects the request,
    /// or `GeminiError::HttpError` if the request fails.
    pub async fn generate_affiliate_content(
        &self,
        config: &ClientConfig,
        inputs: &GenerationInputs,
    ) -> Result<AnalysisResult, GeminiError> {
        validate_product_link(&inputs.product_link)?;

        log::info!(
            "Generating affiliate content for link: {}",
            inputs.product_link
        );

        let prompt = render_user_prompt(inputs);
        let text = self
            .generate_content(
                config,
                &prompt,
                Some(GENERATOR_SYSTEM_PROMPT),
                Some(GENERATION_TEMPERATURE),
            )
            .await?;

        Ok(angles::parse(&text))
    }

    /// Send a prompt to the text model and return the response text.
    ///
    /// # Arguments
    ///
    /// * `config` - Per-call API settings
    /// * `prompt` - The user prompt
    /// * `system_instruction` - Optional system instruction
    /// * `temperature` - Optional sampling temperature
    ///
    /// # Returns
    ///
    /// The concatenated text parts of the first candidate. A response with
    /// no text is not an error: the fixed fallback text is returned instead
    /// so downstream display code always has something to show.
    pub async fn generate_content(
        &self,
        config: &ClientConfig,
        prompt: &str,
        system_instruction: Option<&str>,
        temperature: Option<f32>,
    ) -> Result<String, GeminiError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part::text(prompt)],
            }],
            system_instruction: system_instruction.map(|text| Content {
                parts: vec![Part::text(text)],
            }),
            generation_config: temperature.map(|temperature| GenerationConfig { temperature }),
        };

        let response = self
            .post_generate_content(config, TEXT_MODEL, &request)
            .await?;

        let text = response.first_text();
        if text.is_empty() {
            log::warn!("Model returned no text, substituting fallback response");
            return Ok(EMPTY_RESPONSE_FALLBACK.to_string());
        }

        Ok(text)
    }

    /// Edit a product image with the image model.
    ///
    /// Sends the image bytes plus an edit instruction and returns the first
    /// image the model sends back, as a base64 `data:` URI ready for saving
    /// or further animation.
    ///
    /// # Arguments
    ///
    /// * `config` - Per-call API settings
    /// * `image` - Raw bytes of the source image
    /// * `mime_type` - MIME type of the source image
    /// * `instruction` - Edit instruction; when empty, a stock cinematic
    ///   instruction is used
    ///
    /// # Returns
    ///
    /// A `data:<mime>;base64,<payload>` URI for the edited image.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::NoImageReturned` if the response carries no
    /// image part, `GeminiError::ApiError` if the API rejects the request,
    /// or `GeminiError::HttpError` if the request fails.
    pub async fn edit_image(
        &self,
        config: &ClientConfig,
        image: &[u8],
        mime_type: &str,
        instruction: &str,
    ) -> Result<String, GeminiError> {
        let instruction = if instruction.is_empty() {
            DEFAULT_EDIT_INSTRUCTION
        } else {
            instruction
        };

        log::info!("Editing image ({} bytes): {}", image.len(), instruction);

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::inline(mime_type, STANDARD.encode(image)),
                    Part::text(instruction),
                ],
            }],
            system_instruction: None,
            generation_config: None,
        };

        let response = self
            .post_generate_content(config, IMAGE_MODEL, &request)
            .await?;

        match response.first_inline_image() {
            Some(inline) => {
                let mime_type = inline
                    .mime_type
                    .as_deref()
                    .filter(|mime| !mime.is_empty())
                    .unwrap_or(DEFAULT_IMAGE_MIME);
                Ok(format!("data:{};base64,{}", mime_type, inline.data))
            }
            None => Err(GeminiError::NoImageReturned),
        }
    }

    /// POST a generateContent request to the given model.
    async fn post_generate_content(
        &self,
        config: &ClientConfig,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            config.base_url(),
            model
        );

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", config.api_key())
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GeminiError::ApiError(format!(
                "API request failed with status {}: {}",
                status, error_text
            )));
        }

        let content_response: GenerateContentResponse = response.json().await?;
        Ok(content_response)
    }
}

/// Errors that can occur during Gemini API operations.
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("API key not configured")]
    MissingApiKey,

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("No image returned from the model. Try a different prompt.")]
    NoImageReturned,

    #[error("No video URI returned.")]
    NoVideoReturned,

    #[error("Video generation timed out")]
    Timeout,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Product link cannot be empty")]
    EmptyProductLink,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_config_uses_default_base_url() {
        let config = ClientConfig::new("test-api-key");
        assert_eq!(config.api_key(), "test-api-key");
        assert_eq!(config.base_url(), GEMINI_API_BASE_URL);
        assert!(config.has_api_key());
    }

    #[test]
    fn test_with_base_url_overrides_endpoint() {
        let config = ClientConfig::with_base_url("test-key", "https://custom.api");
        assert_eq!(config.api_key(), "test-key");
        assert_eq!(config.base_url(), "https://custom.api");
    }

    #[test]
    fn test_empty_key_is_allowed_but_flagged() {
        let config = ClientConfig::new("");
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_from_env_reads_environment() {
        // Env vars are shared state, so save and restore around the test.
        let original = std::env::var(GEMINI_API_KEY_ENV).ok();

        std::env::set_var(GEMINI_API_KEY_ENV, "test-key-from-env");
        let config = ClientConfig::from_env();
        assert_eq!(config.api_key(), "test-key-from-env");
        assert_eq!(config.base_url(), GEMINI_API_BASE_URL);
        assert!(config.has_api_key());

        // An unset variable still yields a usable config; the key check
        // happens later, at the capability gate.
        std::env::remove_var(GEMINI_API_KEY_ENV);
        let config = ClientConfig::from_env();
        assert_eq!(config.api_key(), "");
        assert!(!config.has_api_key());

        if let Some(val) = original {
            std::env::set_var(GEMINI_API_KEY_ENV, val);
        }
    }

    #[test]
    fn test_validate_product_link() {
        assert!(validate_product_link("https://shop.example/item").is_ok());
        assert!(matches!(
            validate_product_link(""),
            Err(GeminiError::EmptyProductLink)
        ));
        assert!(matches!(
            validate_product_link("   \n\t"),
            Err(GeminiError::EmptyProductLink)
        ));
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part::text("hello")],
            }],
            system_instruction: Some(Content {
                parts: vec![Part::text("system")],
            }),
            generation_config: Some(GenerationConfig { temperature: 0.7 }),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "system");
        assert!((json["generationConfig"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        // Unset part fields must not appear on the wire.
        assert!(json["contents"][0]["parts"][0].get("inlineData").is_none());
    }

    #[test]
    fn test_inline_part_serializes_camel_case() {
        let part = Part::inline("image/png", "QUJD".to_string());
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["inlineData"]["mimeType"], "image/png");
        assert_eq!(json["inlineData"]["data"], "QUJD");
        assert!(json.get("text").is_none());
    }

    #[test]
    fn test_first_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello " }, { "text": "world" }] }
            }]
        }))
        .unwrap();
        assert_eq!(response.first_text(), "Hello world");
    }

    #[test]
    fn test_first_text_empty_on_missing_candidates() {
        let response: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(response.first_text(), "");
    }

    #[test]
    fn test_first_inline_image_skips_text_and_empty_parts() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "some commentary" },
                    { "inlineData": { "mimeType": "image/png", "data": "" } },
                    { "inlineData": { "mimeType": "image/jpeg", "data": "QUJD" } }
                ] }
            }]
        }))
        .unwrap();

        let inline = response.first_inline_image().unwrap();
        assert_eq!(inline.mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(inline.data, "QUJD");
    }

    #[test]
    fn test_first_inline_image_none_for_text_only() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "no image here" }] } }]
        }))
        .unwrap();
        assert!(response.first_inline_image().is_none());
    }
}
