use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::GenericImageView;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Trait for vision-language providers that can critique an image.
///
/// The prompt arrives fully prepared (critique instructions plus any
/// reference material); providers only handle transport and image
/// encoding. One call is one inference — providers never retry on their
/// own.
pub trait VisionProvider: Send + Sync {
    /// Run the model once over the prompt and image, returning its raw
    /// text completion.
    fn critique_image(&self, prompt: &str, image: &[u8]) -> Result<String>;

    /// Get the provider name for display
    fn provider_name(&self) -> &'static str;
}

/// Largest dimension an image is resized to before upload.
const MAX_IMAGE_DIMENSION: u32 = 1024;

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(120);

// ============================================================================
// OpenAI-compatible provider (works with LM Studio, OpenAI, and compatible APIs)
// ============================================================================

pub struct OpenAICompatibleProvider {
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: Vec<OpenAIContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum OpenAIContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: String,
}

impl OpenAICompatibleProvider {
    pub fn new(endpoint: &str, model: &str, api_key: Option<&str>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: api_key.map(|s| s.to_string()),
        }
    }
}

impl VisionProvider for OpenAICompatibleProvider {
    fn critique_image(&self, prompt: &str, image: &[u8]) -> Result<String> {
        let (base64_image, mime_type) = encode_image(image, MAX_IMAGE_DIMENSION)?;
        let data_url = format!("data:{};base64,{}", mime_type, base64_image);

        let request = OpenAIChatRequest {
            model: self.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: vec![
                    OpenAIContentPart::Text {
                        text: prompt.to_string(),
                    },
                    OpenAIContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ],
            }],
            max_tokens: 2000,
            temperature: 0.7,
        };

        let url = format!("{}/chat/completions", self.endpoint);

        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();

        let mut req = agent.post(&url).set("Content-Type", "application/json");

        if let Some(ref api_key) = self.api_key {
            req = req.set("Authorization", &format!("Bearer {}", api_key));
        }

        let response = req
            .send_json(&request)
            .map_err(|e| anyhow!("LLM request failed: {}", e))?;

        let chat_response: OpenAIChatResponse = response
            .into_json()
            .map_err(|e| anyhow!("Failed to parse LLM response: {}", e))?;

        chat_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| anyhow!("No response from LLM"))
    }

    fn provider_name(&self) -> &'static str {
        "OpenAI-compatible"
    }
}

// ============================================================================
// Anthropic Claude provider
// ============================================================================

pub struct AnthropicProvider {
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum AnthropicContent {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image { source: AnthropicImageSource },
}

#[derive(Debug, Serialize)]
struct AnthropicImageSource {
    #[serde(rename = "type")]
    source_type: String,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicResponseContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponseContent {
    text: Option<String>,
}

impl AnthropicProvider {
    pub fn new(api_key: &str, model: Option<&str>) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.unwrap_or("claude-sonnet-4-20250514").to_string(),
        }
    }
}

impl VisionProvider for AnthropicProvider {
    fn critique_image(&self, prompt: &str, image: &[u8]) -> Result<String> {
        let (base64_image, media_type) = encode_image(image, MAX_IMAGE_DIMENSION)?;

        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: 2000,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: vec![
                    AnthropicContent::Image {
                        source: AnthropicImageSource {
                            source_type: "base64".to_string(),
                            media_type: media_type.to_string(),
                            data: base64_image,
                        },
                    },
                    AnthropicContent::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
        };

        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();

        let response = agent
            .post("https://api.anthropic.com/v1/messages")
            .set("Content-Type", "application/json")
            .set("x-api-key", &self.api_key)
            .set("anthropic-version", "2023-06-01")
            .send_json(&request)
            .map_err(|e| anyhow!("Anthropic request failed: {}", e))?;

        let anthropic_response: AnthropicResponse = response
            .into_json()
            .map_err(|e| anyhow!("Failed to parse Anthropic response: {}", e))?;

        anthropic_response
            .content
            .first()
            .and_then(|c| c.text.clone())
            .ok_or_else(|| anyhow!("No response from Anthropic"))
    }

    fn provider_name(&self) -> &'static str {
        "Anthropic Claude"
    }
}

// ============================================================================
// Ollama provider
// ============================================================================

pub struct OllamaProvider {
    endpoint: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    images: Vec<String>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaProvider {
    pub fn new(endpoint: Option<&str>, model: &str) -> Self {
        Self {
            endpoint: endpoint.unwrap_or("http://localhost:11434").to_string(),
            model: model.to_string(),
        }
    }
}

impl VisionProvider for OllamaProvider {
    fn critique_image(&self, prompt: &str, image: &[u8]) -> Result<String> {
        let (base64_image, _mime_type) = encode_image(image, MAX_IMAGE_DIMENSION)?;

        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            images: vec![base64_image],
            stream: false,
        };

        let url = format!("{}/api/generate", self.endpoint);

        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(180))
            .build();

        let response = agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_json(&request)
            .map_err(|e| anyhow!("Ollama request failed: {}", e))?;

        let ollama_response: OllamaResponse = response
            .into_json()
            .map_err(|e| anyhow!("Failed to parse Ollama response: {}", e))?;

        Ok(ollama_response.response)
    }

    fn provider_name(&self) -> &'static str {
        "Ollama"
    }
}

/// Decode image bytes, resize if either dimension exceeds `max_dimension`,
/// re-encode as JPEG, and return the base64-encoded string along with the
/// MIME type.
fn encode_image(data: &[u8], max_dimension: u32) -> Result<(String, &'static str)> {
    let img = image::load_from_memory(data)
        .map_err(|e| anyhow!("Failed to decode image: {}", e))?;

    let (width, height) = img.dimensions();
    let img = if width > max_dimension || height > max_dimension {
        img.resize(
            max_dimension,
            max_dimension,
            image::imageops::FilterType::Triangle,
        )
    } else {
        img
    };

    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, 85);
    img.write_with_encoder(encoder)
        .map_err(|e| anyhow!("Failed to encode image as JPEG: {}", e))?;

    let base64_image = BASE64.encode(buf.into_inner());
    Ok((base64_image, "image/jpeg"))
}

// ============================================================================
// Factory function
// ============================================================================

use crate::config::{LlmConfig, LlmProviderType};

/// Create a vision provider based on configuration
pub fn create_provider(config: &LlmConfig) -> Box<dyn VisionProvider> {
    match config.provider {
        LlmProviderType::LmStudio => Box::new(OpenAICompatibleProvider::new(
            &config.endpoint,
            &config.model,
            config.api_key.as_deref(),
        )),
        LlmProviderType::OpenAI => Box::new(OpenAICompatibleProvider::new(
            "https://api.openai.com/v1",
            &config.model,
            config.api_key.as_deref(),
        )),
        LlmProviderType::Anthropic => {
            let api_key = config.api_key.as_deref().unwrap_or("");
            Box::new(AnthropicProvider::new(api_key, Some(&config.model)))
        }
        LlmProviderType::Ollama => Box::new(OllamaProvider::new(
            Some(&config.endpoint),
            &config.model,
        )),
    }
}
