//! Pipeline step identifiers and the created-resource ledger entry.
//!
//! The five publishing steps always run in [`Step::ORDER`]. Every remote
//! resource created along the way is recorded as a [`CreatedResource`] so
//! a failed attempt can report what it left behind.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::ResourceId;

/// One step of the ad publishing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Upload,
    Campaign,
    AdSet,
    Creative,
    Ad,
}

impl Step {
    /// Fixed creation order. No step is skipped or reordered.
    pub const ORDER: [Step; 5] = [
        Step::Upload,
        Step::Campaign,
        Step::AdSet,
        Step::Creative,
        Step::Ad,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Step::Upload => "upload",
            Step::Campaign => "campaign",
            Step::AdSet => "ad_set",
            Step::Creative => "creative",
            Step::Ad => "ad",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remote resource created by a successful step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedResource {
    pub step: Step,
    pub id: ResourceId,
}

/// Return `id` if it is non-empty, otherwise a
/// [`CoreError::DependencyMissing`] naming the consuming step.
pub fn require_id<'a>(
    id: &'a str,
    step: Step,
    dependency: &'static str,
) -> Result<&'a str, CoreError> {
    if id.trim().is_empty() {
        Err(CoreError::DependencyMissing { step, dependency })
    } else {
        Ok(id)
    }
}
