use reqwest::blocking::Client as HttpClient;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::json;
use snapfit_contracts::capture::CapturedImage;
use snapfit_contracts::result::Tag;
use snapfit_contracts::schema::FromJson;
use snapfit_contracts::tags::{TagGroups, VisionTag, VisionTagResponse};

use crate::config::EngineConfig;
use crate::error::IdentifyError;
use crate::http::{http_client, send_json};

const SERVICE: &str = "Ximilar";

/// Flat view of one tagging response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VisionTags {
    pub category: Option<String>,
    pub color: Option<String>,
    pub pattern: Option<String>,
    pub material: Option<String>,
    pub style: Option<String>,
    pub tags: Vec<Tag>,
}

pub trait VisionTagger: Send + Sync {
    fn tag(&self, image: &CapturedImage) -> Result<VisionTags, IdentifyError>;
}

pub struct VisionTagClient {
    endpoint: String,
    api_key: Option<String>,
    http: HttpClient,
}

impl VisionTagClient {
    pub fn new(config: &EngineConfig) -> Result<Self, IdentifyError> {
        Ok(Self {
            endpoint: config.ximilar_endpoint.clone(),
            api_key: config.ximilar_api_key.clone(),
            http: http_client(SERVICE, config.request_timeout)?,
        })
    }
}

impl VisionTagger for VisionTagClient {
    fn tag(&self, image: &CapturedImage) -> Result<VisionTags, IdentifyError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(IdentifyError::missing_credential("XIMILAR_API_KEY"));
        };
        log::debug!("{SERVICE} request endpoint={}", self.endpoint);
        let payload = json!({"records": [{"base64": image.base64()}]});
        let response = send_json(
            SERVICE,
            self.http
                .post(&self.endpoint)
                .header(AUTHORIZATION, format!("Token {api_key}"))
                .header(CONTENT_TYPE, "application/json")
                .json(&payload),
        )?;
        let parsed = VisionTagResponse::from_json(&response).map_err(|source| {
            log::error!("{SERVICE} response shape changed: {source}");
            IdentifyError::Schema {
                service: SERVICE,
                source,
            }
        })?;
        Ok(flatten_response(&parsed))
    }
}

/// Labels matched against tag names, one per flattened dimension.
pub const CATEGORY_LABEL: &str = "Category";
pub const COLOR_LABEL: &str = "Color";
pub const PATTERN_LABEL: &str = "Pattern";
pub const MATERIAL_LABEL: &str = "Material";
pub const STYLE_LABEL: &str = "Style";

/// First tag whose name contains `label`, ignoring case.
///
/// This is a loose substring heuristic. Precedence is the service's own
/// ordering: groups in response order, then tags in listed order, so when
/// several groups share the substring the earliest group wins.
pub fn find_tag<'a>(label: &str, groups: &'a TagGroups) -> Option<&'a VisionTag> {
    let needle = label.to_lowercase();
    groups
        .values()
        .flatten()
        .find(|tag| tag.name.to_lowercase().contains(&needle))
}

/// Only the first record is used; a response without records flattens to
/// an empty result.
pub fn flatten_response(response: &VisionTagResponse) -> VisionTags {
    let Some(record) = response.records.first() else {
        return VisionTags::default();
    };
    let groups = &record.tags;
    let pick = |label: &str| find_tag(label, groups).map(|tag| tag.name.clone());
    VisionTags {
        category: pick(CATEGORY_LABEL),
        color: pick(COLOR_LABEL),
        pattern: pick(PATTERN_LABEL),
        material: pick(MATERIAL_LABEL),
        style: pick(STYLE_LABEL),
        tags: groups
            .values()
            .flatten()
            .map(|tag| Tag {
                name: tag.name.clone(),
                confidence: tag.prob,
            })
            .collect(),
    }
}
