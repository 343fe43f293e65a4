use snapfit_contracts::capture::CapturedImage;
use snapfit_contracts::result::{Confidence, IdentificationReply, IdentificationResult, Level};

use crate::error::IdentifyError;
use crate::{timestamp_millis, Identifier};

/// Offline identifier that answers every capture with a canned reply.
#[derive(Debug, Clone)]
pub struct DryrunIdentifier {
    reply: IdentificationReply,
}

impl Default for DryrunIdentifier {
    fn default() -> Self {
        Self {
            reply: IdentificationReply {
                identified: true,
                category: "Tops".to_string(),
                subcategory: "Crewneck Sweater".to_string(),
                color: "Navy".to_string(),
                pattern: "Solid".to_string(),
                material: Some("Merino wool".to_string()),
                style: "Classic".to_string(),
                brand: "Uniqlo".to_string(),
                product_name: Some("Extra Fine Merino Crew Neck Sweater".to_string()),
                confidence: Confidence {
                    brand: Level::Low,
                    material: Level::Medium,
                },
                reasoning: "Dry run: no service was called.".to_string(),
            },
        }
    }
}

impl DryrunIdentifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(reply: IdentificationReply) -> Self {
        Self { reply }
    }
}

impl Identifier for DryrunIdentifier {
    type Output = IdentificationResult;

    fn name(&self) -> &str {
        "dryrun"
    }

    fn identify(&self, image: &CapturedImage) -> Result<IdentificationResult, IdentifyError> {
        log::debug!("dryrun identify uri={}", image.uri());
        Ok(IdentificationResult::from_reply(
            self.reply.clone(),
            timestamp_millis(),
        ))
    }
}
