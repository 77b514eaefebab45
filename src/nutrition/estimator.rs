//! Asks the completion model for a macro estimate and parses its JSON reply.

use anyhow::Context;
use axum::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use super::EstimateError;
use crate::config::AnthropicConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;
const DEFAULT_MEDIA_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Text(String),
    Image { media_type: String, data: String },
}

/// A single user turn sent to the completion model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub content: Vec<ContentBlock>,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Returns the model's raw reply text.
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub media_type: String,
    /// Base64 payload, passed through untouched.
    pub data: String,
}

impl ImageInput {
    /// Accepts `data:<type>;base64,<payload>`; anything else is treated as a
    /// bare base64 payload. The media type defaults to `image/jpeg`.
    pub fn from_data_url(raw: &str) -> Self {
        lazy_static! {
            static ref DATA_URL_RE: Regex =
                Regex::new(r"(?s)^data:([^;,]*)(?:;[^,]*)?,(.*)$").unwrap();
        }
        match DATA_URL_RE.captures(raw.trim()) {
            Some(caps) => {
                let media_type = caps
                    .get(1)
                    .map(|m| m.as_str().trim())
                    .filter(|m| !m.is_empty())
                    .unwrap_or(DEFAULT_MEDIA_TYPE);
                Self {
                    media_type: media_type.to_string(),
                    data: caps.get(2).map(|m| m.as_str()).unwrap_or_default().to_string(),
                }
            }
            None => Self {
                media_type: DEFAULT_MEDIA_TYPE.to_string(),
                data: raw.trim().to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutritionRecord {
    pub food: String,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

#[derive(Debug, Deserialize)]
struct TextReply {
    calories: f64,
    protein_g: f64,
    carbs_g: f64,
    fat_g: f64,
}

#[derive(Debug, Deserialize)]
struct ImageReply {
    food: String,
    calories: f64,
    protein_g: f64,
    carbs_g: f64,
    fat_g: f64,
}

pub fn text_prompt(description: &str) -> String {
    format!(
        "Estimate the nutritional content of the following food: \"{description}\".\n\
         Respond with ONLY a JSON object and no other text, in exactly this shape:\n\
         {{\"calories\": number, \"protein_g\": number, \"carbs_g\": number, \"fat_g\": number}}"
    )
}

pub fn image_prompt(context: Option<&str>) -> String {
    let context = context
        .map(|c| format!(" Additional context from the user: \"{c}\"."))
        .unwrap_or_default();
    format!(
        "Identify the food in this image and estimate its nutritional content.{context}\n\
         Respond with ONLY a JSON object and no other text, in exactly this shape:\n\
         {{\"food\": string, \"calories\": number, \"protein_g\": number, \"carbs_g\": number, \"fat_g\": number}}"
    )
}

/// Estimates one food item from a description, an image, or both (the
/// description then serves as context for the image).
#[instrument(skip(client, image))]
pub async fn estimate(
    client: &dyn CompletionClient,
    description: Option<&str>,
    image: Option<ImageInput>,
) -> Result<NutritionRecord, EstimateError> {
    let description = description.map(str::trim).filter(|d| !d.is_empty());
    match (description, image) {
        (None, None) => Err(EstimateError::MissingInput),
        (Some(desc), None) => {
            let request = CompletionRequest {
                content: vec![ContentBlock::Text(text_prompt(desc))],
            };
            let reply = client.complete(&request).await.map_err(EstimateError::Upstream)?;
            let r: TextReply = parse_reply(&reply)?;
            Ok(NutritionRecord {
                food: desc.to_string(),
                calories: r.calories,
                protein_g: r.protein_g,
                carbs_g: r.carbs_g,
                fat_g: r.fat_g,
            })
        }
        (context, Some(img)) => {
            let request = CompletionRequest {
                content: vec![
                    ContentBlock::Image {
                        media_type: img.media_type,
                        data: img.data,
                    },
                    ContentBlock::Text(image_prompt(context)),
                ],
            };
            let reply = client.complete(&request).await.map_err(EstimateError::Upstream)?;
            let r: ImageReply = parse_reply(&reply)?;
            Ok(NutritionRecord {
                food: r.food,
                calories: r.calories,
                protein_g: r.protein_g,
                carbs_g: r.carbs_g,
                fat_g: r.fat_g,
            })
        }
    }
}

fn parse_reply<T: serde::de::DeserializeOwned>(reply: &str) -> Result<T, EstimateError> {
    serde_json::from_str(reply).map_err(|e| {
        error!(error = %e, "completion reply is not the expected JSON");
        EstimateError::Malformed(format!("Failed to parse nutrition estimate: {e}"))
    })
}

// ---- Anthropic Messages API ----

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<WireBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireBlock<'a> {
    Text { text: &'a str },
    Image { source: ImageSource<'a> },
}

#[derive(Debug, Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ReplyBlock>,
}

#[derive(Debug, Deserialize)]
struct ReplyBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(http: reqwest::Client, cfg: &AnthropicConfig) -> Self {
        Self {
            http,
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest) -> MessagesRequest<'a> {
        let content = request
            .content
            .iter()
            .map(|block| match block {
                ContentBlock::Text(text) => WireBlock::Text { text },
                ContentBlock::Image { media_type, data } => WireBlock::Image {
                    source: ImageSource {
                        kind: "base64",
                        media_type,
                        data,
                    },
                },
            })
            .collect();
        MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            messages: vec![Message {
                role: "user",
                content,
            }],
        }
    }
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String> {
        let res = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.body(request))
            .send()
            .await
            .context("completion request")?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            error!(%status, "completion api error");
            anyhow::bail!("completion api returned {status}: {body}");
        }
        let parsed: MessagesResponse = res.json().await.context("decode completion response")?;
        let text: String = parsed
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect();
        debug!(chars = text.len(), "completion received");
        Ok(text)
    }
}
