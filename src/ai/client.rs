//! [`SuggestionService`] over an OpenAI-compatible HTTP API.
//!
//! - DPI and compression suggestions: `POST {base_url}/chat/completions` with
//!   the image attached as an `image_url` data URI and `response_format`
//!   forced to a JSON object.
//! - Related images: `POST {base_url}/images/edits` (multipart), answer read
//!   from `data[0].b64_json`.

use super::{
    CompressionSuggestion, CompressionSuggestionRequest, DpiSuggestion, DpiSuggestionRequest,
    RelatedImage, RelatedImageRequest, RemoteServiceError, SuggestionService, data_uri,
};
use crate::config::AiConfig;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::blocking::{Client, Response, multipart};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const DPI_PROMPT: &str = "You advise on print resolution. Given a photo, its current DPI and \
the print size in inches, recommend a DPI that prints sharply and say whether to upscale, \
resample or edit the image first. Answer with a JSON object: \
{\"suggested_dpi\": number, \"action_suggestion\": string}.";

const COMPRESSION_PROMPT: &str = "You pick JPEG quality settings. Given an image and an \
optional target level (0 = smallest file, 100 = best quality), choose the lowest quality that \
keeps the image visually clean, honoring the target when one is given. Answer with a JSON \
object: {\"quality\": integer 0-100, \"optimization_details\": string}.";

const RELATED_PROMPT: &str = "Generate an image that is visually similar to this one.";

pub struct HttpSuggestionService {
    client: Client,
    base_url: String,
    model: String,
    image_model: String,
    api_key: String,
}

impl std::fmt::Debug for HttpSuggestionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSuggestionService")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("image_model", &self.image_model)
            .finish_non_exhaustive()
    }
}

impl HttpSuggestionService {
    /// Build a client from config, reading the API key from `config.api_key_env`.
    pub fn from_config(config: &AiConfig) -> Result<Self, RemoteServiceError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| RemoteServiceError::MissingCredentials(config.api_key_env.clone()))?;
        Self::new(config, api_key)
    }

    pub fn new(config: &AiConfig, api_key: String) -> Result<Self, RemoteServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            image_model: config.image_model.clone(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// One chat completion with an image attached; returns the parsed JSON answer.
    fn chat_json(
        &self,
        system_prompt: &str,
        text: String,
        image_data_uri: &str,
    ) -> Result<serde_json::Value, RemoteServiceError> {
        let body = json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": system_prompt },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": text },
                        { "type": "image_url", "image_url": { "url": image_data_uri } }
                    ]
                }
            ]
        });

        debug!(model = %self.model, image_len = image_data_uri.len(), "chat completion request");
        let response = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?;
        let response = check_status(response)?;

        let chat: ChatCompletionResponse = response.json()?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RemoteServiceError::Malformed("no message content".into()))?;
        serde_json::from_str(content.trim())
            .map_err(|e| RemoteServiceError::Malformed(format!("answer is not JSON: {e}")))
    }
}

impl SuggestionService for HttpSuggestionService {
    fn suggest_dpi(
        &self,
        request: &DpiSuggestionRequest,
    ) -> Result<DpiSuggestion, RemoteServiceError> {
        let text = format!(
            "Current DPI: {}\nDesired print size: {}x{} inches",
            request.current_dpi, request.desired_print_size.width, request.desired_print_size.height
        );
        let answer = self.chat_json(DPI_PROMPT, text, &request.photo_data_uri)?;
        DpiSuggestion::from_model_json(&answer)
    }

    fn generate_related(
        &self,
        request: &RelatedImageRequest,
    ) -> Result<RelatedImage, RemoteServiceError> {
        let source = data_uri::decode(&request.source_image)?;
        let prompt = match request.prompt.as_deref().map(str::trim) {
            Some(extra) if !extra.is_empty() => format!("{RELATED_PROMPT} {extra}"),
            _ => RELATED_PROMPT.to_string(),
        };
        let extension = source.mime.rsplit('/').next().unwrap_or("png").to_string();
        let image = multipart::Part::bytes(source.bytes)
            .file_name(format!("source.{extension}"))
            .mime_str(&source.mime)?;
        let form = multipart::Form::new()
            .text("model", self.image_model.clone())
            .text("prompt", prompt)
            .text("n", "1")
            .part("image", image);

        debug!(model = %self.image_model, "image edit request");
        let response = self
            .client
            .post(self.url("images/edits"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()?;
        let response = check_status(response)?;

        let images: ImagesResponse = response.json()?;
        let b64 = images
            .data
            .into_iter()
            .find_map(|d| d.b64_json)
            .ok_or_else(|| RemoteServiceError::Malformed("no image in response".into()))?;
        let bytes = STANDARD
            .decode(b64.trim())
            .map_err(|e| RemoteServiceError::Malformed(format!("image is not base64: {e}")))?;
        Ok(RelatedImage {
            related_image: data_uri::encode("image/png", &bytes),
        })
    }

    fn suggest_compression(
        &self,
        request: &CompressionSuggestionRequest,
    ) -> Result<CompressionSuggestion, RemoteServiceError> {
        let text = match request.compression_level {
            Some(level) => format!("Requested level: {level}"),
            None => "No level requested; pick the best one.".to_string(),
        };
        let answer = self.chat_json(COMPRESSION_PROMPT, text, &request.image_data_uri)?;
        CompressionSuggestion::from_model_json(&answer)
    }
}

fn check_status(response: Response) -> Result<Response, RemoteServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(api_error(status.as_u16(), &body))
}

/// Build a [`RemoteServiceError::Status`], preferring the API's own message.
fn api_error(status: u16, body: &str) -> RemoteServiceError {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("error"))
        .map(|error| {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            match error.get("type").and_then(|t| t.as_str()) {
                Some(kind) => format!("{message} ({kind})"),
                None => message.to_string(),
            }
        })
        .unwrap_or_else(|| {
            let body = body.trim();
            if body.is_empty() {
                "no response body".to_string()
            } else {
                body.chars().take(200).collect()
            }
        });
    RemoteServiceError::Status { status, message }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}
