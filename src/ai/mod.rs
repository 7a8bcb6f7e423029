//! AI-backed suggestions: print DPI, related-image generation, and
//! model-chosen compression.
//!
//! The model is an external collaborator behind the [`SuggestionService`]
//! trait. [`HttpSuggestionService`](client::HttpSuggestionService) talks to an
//! OpenAI-compatible API; tests use a mock. Images cross the boundary as
//! [data URIs](data_uri).
//!
//! AI compression never lets the model produce pixels: the model only picks a
//! quality, and the image is encoded locally with the pipeline's JPEG encoder.
//!
//! Calls are blocking, made once, and never retried. Every failure surfaces as
//! a [`RemoteServiceError`].

pub mod client;
pub mod data_uri;

pub use client::HttpSuggestionService;

use crate::imaging::{
    CompressionReport, CompressionSetting, ImageBackend, PipelineError, PrintSize, Quality,
    SourceFile, compress_image,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// DPI assumed when the caller does not know the image's current DPI.
pub const DEFAULT_CURRENT_DPI: u32 = 72;

#[derive(Error, Debug)]
pub enum RemoteServiceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("API key not set (expected in ${0})")]
    MissingCredentials(String),
    #[error("invalid data URI: {0}")]
    InvalidDataUri(String),
}

/// Errors of the flows that mix a remote call with local encoding.
#[derive(Error, Debug)]
pub enum AiError {
    #[error(transparent)]
    Remote(#[from] RemoteServiceError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DpiSuggestionRequest {
    pub photo_data_uri: String,
    pub current_dpi: u32,
    pub desired_print_size: PrintSize,
}

impl DpiSuggestionRequest {
    pub fn new(
        photo_data_uri: String,
        current_dpi: Option<u32>,
        desired_print_size: PrintSize,
    ) -> Self {
        Self {
            photo_data_uri,
            current_dpi: current_dpi.filter(|&d| d > 0).unwrap_or(DEFAULT_CURRENT_DPI),
            desired_print_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DpiSuggestion {
    pub suggested_dpi: u32,
    pub action_suggestion: String,
}

impl DpiSuggestion {
    /// Read the model's JSON answer. A missing or non-positive DPI is malformed.
    pub fn from_model_json(value: &serde_json::Value) -> Result<Self, RemoteServiceError> {
        let dpi = value
            .get("suggested_dpi")
            .and_then(serde_json::Value::as_f64)
            .filter(|d| d.is_finite() && d.round() >= 1.0)
            .ok_or_else(|| RemoteServiceError::Malformed("missing or zero suggested_dpi".into()))?;
        let action = value
            .get("action_suggestion")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();
        Ok(Self {
            suggested_dpi: dpi.round().min(u32::MAX as f64) as u32,
            action_suggestion: action,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedImageRequest {
    pub source_image: String,
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedImage {
    pub related_image: String,
}

/// Ask the model for a quality. `compression_level` is a guide when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionSuggestionRequest {
    pub image_data_uri: String,
    pub compression_level: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionSuggestion {
    pub quality: Quality,
    pub optimization_details: String,
}

impl CompressionSuggestion {
    pub fn from_model_json(value: &serde_json::Value) -> Result<Self, RemoteServiceError> {
        let quality = value
            .get("quality")
            .and_then(serde_json::Value::as_f64)
            .filter(|q| q.is_finite() && *q >= 0.0)
            .ok_or_else(|| RemoteServiceError::Malformed("missing quality".into()))?;
        let details = value
            .get("optimization_details")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();
        Ok(Self {
            quality: Quality::new(quality.round().min(100.0) as u32),
            optimization_details: details,
        })
    }
}

/// The hosted model, as seen by the tools.
pub trait SuggestionService {
    fn suggest_dpi(
        &self,
        request: &DpiSuggestionRequest,
    ) -> Result<DpiSuggestion, RemoteServiceError>;

    fn generate_related(
        &self,
        request: &RelatedImageRequest,
    ) -> Result<RelatedImage, RemoteServiceError>;

    fn suggest_compression(
        &self,
        request: &CompressionSuggestionRequest,
    ) -> Result<CompressionSuggestion, RemoteServiceError>;
}

/// Turn a [`CompressionSetting`] into a concrete quality, asking the model
/// only for [`CompressionSetting::AiSuggested`]. The second value is the
/// model's explanation, if it was consulted.
pub fn resolve_quality(
    service: &impl SuggestionService,
    setting: CompressionSetting,
    image_data_uri: &str,
) -> Result<(Quality, Option<String>), RemoteServiceError> {
    match setting {
        CompressionSetting::Fixed(quality) => Ok((quality, None)),
        CompressionSetting::AiSuggested => {
            let suggestion = service.suggest_compression(&CompressionSuggestionRequest {
                image_data_uri: image_data_uri.to_string(),
                compression_level: None,
            })?;
            Ok((suggestion.quality, Some(suggestion.optimization_details)))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiCompressionRequest {
    pub image_data_uri: String,
    pub compression_level: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiCompressionResponse {
    pub compressed_image_data_uri: String,
    pub optimization_details: String,
    pub report: CompressionReport,
}

/// Compress a data-URI image to JPEG. The requested level is used as-is;
/// without one the model picks it.
pub fn compress_image_with_ai(
    service: &impl SuggestionService,
    backend: &impl ImageBackend,
    request: &AiCompressionRequest,
) -> Result<AiCompressionResponse, AiError> {
    let source = data_uri::decode(&request.image_data_uri)?;
    let setting = match request.compression_level {
        Some(level) => CompressionSetting::Fixed(Quality::new(level)),
        None => CompressionSetting::AiSuggested,
    };
    let (quality, details) = resolve_quality(service, setting, &request.image_data_uri)?;

    let file = SourceFile::new("image", source.bytes, Some(&source.mime));
    let compressed = compress_image(backend, &file, quality)?;
    info!(quality = quality.value(), ai_chosen = details.is_some(), "AI compression");

    let optimization_details = details
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| format!("Re-encoded as JPEG at quality {quality}."));
    Ok(AiCompressionResponse {
        compressed_image_data_uri: data_uri::encode("image/jpeg", &compressed.output.bytes),
        optimization_details,
        report: compressed.report,
    })
}
