use reqwest::blocking::Client as HttpClient;
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};
use snapfit_contracts::capture::CapturedImage;
use snapfit_contracts::result::{BrandReply, IdentificationReply, IdentificationResult};
use snapfit_contracts::schema::FromJson;

use crate::config::EngineConfig;
use crate::error::IdentifyError;
use crate::extract::extract_json_object;
use crate::http::{http_client, send_json};
use crate::prompts::PromptContract;
use crate::{timestamp_millis, Identifier};

const SERVICE: &str = "OpenAI";

/// Brand-only inference, the language-model half of the dual-service design.
pub trait BrandInferrer: Send + Sync {
    fn infer_brand(&self, image: &CapturedImage) -> Result<BrandReply, IdentifyError>;
}

/// Chat-completions client that sends the capture inline as a data URL and
/// validates the JSON object embedded in the model's reply.
pub struct BrandInferenceClient {
    api_base: String,
    api_key: Option<String>,
    model: String,
    max_output_tokens: u64,
    identify_prompt: PromptContract,
    brand_prompt: PromptContract,
    http: HttpClient,
}

impl BrandInferenceClient {
    pub fn new(config: &EngineConfig) -> Result<Self, IdentifyError> {
        Ok(Self {
            api_base: config.openai_api_base.trim_end_matches('/').to_string(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            max_output_tokens: config.max_output_tokens,
            identify_prompt: config.identify_prompt.clone(),
            brand_prompt: config.brand_prompt.clone(),
            http: http_client(SERVICE, config.request_timeout)?,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn identify_unified(&self, image: &CapturedImage) -> Result<IdentificationResult, IdentifyError> {
        let reply: IdentificationReply = self.complete_validated(&self.identify_prompt, image)?;
        Ok(IdentificationResult::from_reply(reply, timestamp_millis()))
    }

    fn complete_validated<T: FromJson>(
        &self,
        prompt: &PromptContract,
        image: &CapturedImage,
    ) -> Result<T, IdentifyError> {
        let text = self.complete(prompt, image)?;
        let object = extract_json_object(&text).map_err(|err| {
            log::warn!(
                "{SERVICE} reply for prompt {} held no usable JSON: {err}",
                prompt.version
            );
            IdentifyError::Parse {
                service: SERVICE,
                message: err.to_string(),
            }
        })?;
        T::from_json(&Value::Object(object)).map_err(|source| {
            log::error!(
                "{SERVICE} reply broke prompt contract {}: {source}",
                prompt.version
            );
            IdentifyError::Schema {
                service: SERVICE,
                source,
            }
        })
    }

    fn complete(&self, prompt: &PromptContract, image: &CapturedImage) -> Result<String, IdentifyError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(IdentifyError::missing_credential("OPENAI_API_KEY"));
        };
        let endpoint = format!("{}/chat/completions", self.api_base);
        log::debug!(
            "{SERVICE} request model={} prompt={} image_bytes~{}",
            self.model,
            prompt.version,
            image.base64().len() / 4 * 3
        );
        let payload = self.request_payload(prompt, image);
        let response = send_json(
            SERVICE,
            self.http
                .post(&endpoint)
                .bearer_auth(api_key)
                .header(CONTENT_TYPE, "application/json")
                .json(&payload),
        )?;
        let text = extract_message_text(&response);
        if text.trim().is_empty() {
            return Err(IdentifyError::EmptyResponse { service: SERVICE });
        }
        Ok(text)
    }

    fn request_payload(&self, prompt: &PromptContract, image: &CapturedImage) -> Value {
        json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": prompt.text},
                    {
                        "type": "image_url",
                        "image_url": {
                            "url": image.data_url(),
                            "detail": "high",
                        }
                    }
                ],
            }],
            "max_tokens": self.max_output_tokens,
        })
    }
}

/// The single-call identifier is the inference client driven by the unified
/// prompt.
pub type UnifiedIdentifier = BrandInferenceClient;

impl BrandInferrer for BrandInferenceClient {
    fn infer_brand(&self, image: &CapturedImage) -> Result<BrandReply, IdentifyError> {
        self.complete_validated(&self.brand_prompt, image)
    }
}

impl Identifier for BrandInferenceClient {
    type Output = IdentificationResult;

    fn name(&self) -> &str {
        "unified"
    }

    fn identify(&self, image: &CapturedImage) -> Result<IdentificationResult, IdentifyError> {
        self.identify_unified(image)
    }
}

/// Text of the first choice; content may be a plain string or a list of
/// typed parts.
fn extract_message_text(response: &Value) -> String {
    let Some(content) = response
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
    else {
        return String::new();
    };
    match content {
        Value::String(text) => text.trim().to_string(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| {
                let kind = part.get("type").and_then(Value::as_str)?;
                if !matches!(kind, "text" | "output_text") {
                    return None;
                }
                part.get("text").and_then(Value::as_str)
            })
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .collect::<Vec<&str>>()
            .join("\n"),
        _ => String::new(),
    }
}
