use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{FromJson, ObjectReader, SchemaError};

/// Sentinel held by descriptive fields when no garment was identified.
pub const UNKNOWN: &str = "Unknown";

/// Capture time in epoch milliseconds carried by every identification.
pub trait Timestamped {
    fn timestamp(&self) -> i64;
}

/// Ordinal evidence strength attached to a guessed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    High,
    Medium,
    Low,
    None,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::High, Level::Medium, Level::Low, Level::None];
    /// The levels a brand-only reply may use; it has no "none" grade.
    pub const GRADED: [Level; 3] = [Level::High, Level::Medium, Level::Low];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::None => "none",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confidence {
    pub brand: Level,
    pub material: Level,
}

/// The model's unified reply before it is stamped with a capture time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentificationReply {
    pub identified: bool,
    pub category: String,
    pub subcategory: String,
    pub color: String,
    pub pattern: String,
    pub material: Option<String>,
    pub style: String,
    pub brand: String,
    pub product_name: Option<String>,
    pub confidence: Confidence,
    pub reasoning: String,
}

impl FromJson for Confidence {
    fn from_json_at(value: &Value, path: &str) -> Result<Self, SchemaError> {
        let reader = ObjectReader::new(value, path)?;
        Ok(Self {
            brand: reader.level("brand", &Level::ALL)?,
            material: reader.level("material", &Level::ALL)?,
        })
    }
}

impl FromJson for IdentificationReply {
    fn from_json_at(value: &Value, path: &str) -> Result<Self, SchemaError> {
        let reader = ObjectReader::new(value, path)?;
        Ok(Self {
            identified: reader.boolean("identified")?,
            category: reader.string("category")?,
            subcategory: reader.string("subcategory")?,
            color: reader.string("color")?,
            pattern: reader.string("pattern")?,
            material: reader.nullable_string("material")?,
            style: reader.string("style")?,
            brand: reader.non_empty_string("brand")?,
            product_name: reader.nullable_string("productName")?,
            confidence: reader.parse("confidence")?,
            reasoning: reader.string("reasoning")?,
        })
    }
}

/// Unified single-call identification of one garment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentificationResult {
    pub identified: bool,
    pub category: String,
    pub subcategory: String,
    pub color: String,
    pub pattern: String,
    pub material: Option<String>,
    pub style: String,
    pub brand: String,
    pub product_name: Option<String>,
    pub confidence: Confidence,
    pub reasoning: String,
    pub timestamp: i64,
}

impl IdentificationResult {
    /// Stamps a validated reply. An unidentified reply is normalized so its
    /// descriptive fields hold [`UNKNOWN`] and the brand confidence is `none`.
    pub fn from_reply(reply: IdentificationReply, timestamp: i64) -> Self {
        let mut result = Self {
            identified: reply.identified,
            category: reply.category,
            subcategory: reply.subcategory,
            color: reply.color,
            pattern: reply.pattern,
            material: reply.material,
            style: reply.style,
            brand: reply.brand,
            product_name: reply.product_name,
            confidence: reply.confidence,
            reasoning: reply.reasoning,
            timestamp,
        };
        if !result.identified {
            for field in [
                &mut result.category,
                &mut result.subcategory,
                &mut result.color,
                &mut result.pattern,
                &mut result.style,
            ] {
                *field = UNKNOWN.to_string();
            }
            result.confidence.brand = Level::None;
        }
        result
    }
}

impl Timestamped for IdentificationResult {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// Narrow brand-only reply used by the dual-service design.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandReply {
    pub brand: Option<String>,
    pub product_name: Option<String>,
    pub confidence: Level,
    pub reasoning: String,
}

impl FromJson for BrandReply {
    fn from_json_at(value: &Value, path: &str) -> Result<Self, SchemaError> {
        let reader = ObjectReader::new(value, path)?;
        Ok(Self {
            brand: reader.nullable_string("brand")?,
            product_name: reader.nullable_string("productName")?,
            confidence: reader.level("confidence", &Level::GRADED)?,
            reasoning: reader.string("reasoning")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Source {
    VisionTag,
    BrandInference,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VisionTag => "visionTag",
            Self::BrandInference => "brandInference",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceError {
    pub source: Source,
    pub message: String,
}

/// Dual-service identification: each provider fills only its own fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedIdentification {
    pub category: Option<String>,
    pub color: Option<String>,
    pub pattern: Option<String>,
    pub material: Option<String>,
    pub style: Option<String>,
    pub tags: Vec<Tag>,
    pub brand: Option<String>,
    pub product_name: Option<String>,
    pub brand_confidence: Option<Level>,
    pub brand_reasoning: Option<String>,
    pub timestamp: i64,
    pub errors: Vec<SourceError>,
}

impl MergedIdentification {
    pub fn has_findings(&self) -> bool {
        !self.tags.is_empty()
            || [
                &self.category,
                &self.color,
                &self.pattern,
                &self.material,
                &self.style,
                &self.brand,
                &self.product_name,
            ]
            .iter()
            .any(|field| field.is_some())
    }

    pub fn failed(&self, source: Source) -> bool {
        self.errors.iter().any(|error| error.source == source)
    }
}

impl Timestamped for MergedIdentification {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}
