pub mod config;
pub mod dryrun;
pub mod error;
pub mod extract;
mod http;
pub mod merge;
pub mod openai;
pub mod prompts;
pub mod session;
pub mod vision;

use serde::Serialize;
use snapfit_contracts::capture::CapturedImage;
use snapfit_contracts::result::Timestamped;

pub use config::EngineConfig;
pub use dryrun::DryrunIdentifier;
pub use error::{IdentifyError, TransportKind};
pub use merge::ResultMerger;
pub use openai::{BrandInferenceClient, BrandInferrer, UnifiedIdentifier};
pub use session::{IdentificationSession, IdentificationState};
pub use vision::{VisionTagClient, VisionTagger, VisionTags};

/// One way of turning a capture into an identification.
pub trait Identifier: Send + Sync {
    type Output: Clone + Serialize + Timestamped + Send;

    fn name(&self) -> &str;
    fn identify(&self, image: &CapturedImage) -> Result<Self::Output, IdentifyError>;
}

impl<T: Identifier + ?Sized> Identifier for &T {
    type Output = T::Output;

    fn name(&self) -> &str {
        (**self).name()
    }

    fn identify(&self, image: &CapturedImage) -> Result<Self::Output, IdentifyError> {
        (**self).identify(image)
    }
}

pub(crate) fn timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
