use std::thread;

use snapfit_contracts::capture::CapturedImage;
use snapfit_contracts::result::{BrandReply, MergedIdentification, Source, SourceError};

use crate::error::IdentifyError;
use crate::openai::BrandInferrer;
use crate::vision::{VisionTagger, VisionTags};
use crate::{timestamp_millis, Identifier};

const WORKER_PANICKED: &str = "worker panicked";

/// Runs the tagging service and brand inference side by side and merges
/// whatever each of them produced.
pub struct ResultMerger<V, B> {
    vision: V,
    brand: B,
}

impl<V: VisionTagger, B: BrandInferrer> ResultMerger<V, B> {
    pub fn new(vision: V, brand: B) -> Self {
        Self { vision, brand }
    }

    pub fn vision(&self) -> &V {
        &self.vision
    }

    pub fn brand(&self) -> &B {
        &self.brand
    }

    /// Waits for both calls; a failure on one side never cancels the other.
    pub fn merge(&self, image: &CapturedImage) -> MergedIdentification {
        let (vision, brand) = thread::scope(|scope| {
            let vision = scope.spawn(|| self.vision.tag(image));
            let brand = scope.spawn(|| self.brand.infer_brand(image));
            (settle(vision.join()), settle(brand.join()))
        });
        let merged = merge_outcomes(vision, brand, timestamp_millis());
        for error in &merged.errors {
            log::warn!("{} failed during merge: {}", error.source, error.message);
        }
        merged
    }
}

fn settle<T>(joined: thread::Result<Result<T, IdentifyError>>) -> Result<T, String> {
    match joined {
        Ok(outcome) => outcome.map_err(|err| err.to_string()),
        Err(_) => Err(WORKER_PANICKED.to_string()),
    }
}

/// Folds both outcomes into one record stamped with `timestamp`.
pub fn merge_outcomes(
    vision: Result<VisionTags, String>,
    brand: Result<BrandReply, String>,
    timestamp: i64,
) -> MergedIdentification {
    let mut merged = MergedIdentification {
        timestamp,
        ..MergedIdentification::default()
    };

    match vision {
        Ok(tags) => {
            merged.category = tags.category;
            merged.color = tags.color;
            merged.pattern = tags.pattern;
            merged.material = tags.material;
            merged.style = tags.style;
            merged.tags = tags.tags;
        }
        Err(err) => merged.errors.push(SourceError {
            source: Source::VisionTag,
            message: err,
        }),
    }

    match brand {
        Ok(reply) => {
            merged.brand = reply.brand;
            merged.product_name = reply.product_name;
            merged.brand_confidence = Some(reply.confidence);
            merged.brand_reasoning = Some(reply.reasoning);
        }
        Err(err) => merged.errors.push(SourceError {
            source: Source::BrandInference,
            message: err,
        }),
    }

    merged
}

impl<V: VisionTagger, B: BrandInferrer> Identifier for ResultMerger<V, B> {
    type Output = MergedIdentification;

    fn name(&self) -> &str {
        "dual"
    }

    fn identify(&self, image: &CapturedImage) -> Result<MergedIdentification, IdentifyError> {
        Ok(self.merge(image))
    }
}
