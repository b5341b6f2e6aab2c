use std::time::Duration;

use adgen_adplatform::{FailureKind, PlatformError, UploadError};
use adgen_core::error::CoreError;
use adgen_core::steps::{CreatedResource, Step};

/// Why one pipeline attempt stopped.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid ad request: {0}")]
    Validation(String),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("{step} step failed: {source}")]
    Platform {
        step: Step,
        #[source]
        source: PlatformError,
    },

    #[error("Missing dependency for {step} step: {dependency} is empty")]
    DependencyMissing {
        step: Step,
        dependency: &'static str,
    },

    #[error("{step} step timed out after {}s", after.as_secs())]
    Timeout { step: Step, after: Duration },

    #[error("Cancelled before {step} step")]
    Cancelled { step: Step },
}

impl PipelineError {
    /// Transient platform errors, including a transient rejection of the
    /// image upload, and per-call timeouts are retryable. Local image
    /// problems and everything else need caller action.
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::Platform { source, .. }
            | PipelineError::Upload(UploadError::Rejected(source)) => source.is_transient(),
            PipelineError::Timeout { .. } => true,
            _ => false,
        }
    }

    /// Classification of the remote failure, if there was one.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            PipelineError::Platform { source, .. } => Some(source.kind()),
            PipelineError::Upload(UploadError::Rejected(source)) => Some(source.kind()),
            PipelineError::Timeout { .. } => Some(FailureKind::Transient),
            _ => None,
        }
    }

    /// Step the attempt stopped at, when known.
    pub fn step(&self) -> Option<Step> {
        match self {
            PipelineError::Upload(_) => Some(Step::Upload),
            PipelineError::Platform { step, .. }
            | PipelineError::DependencyMissing { step, .. }
            | PipelineError::Timeout { step, .. }
            | PipelineError::Cancelled { step } => Some(*step),
            PipelineError::Validation(_) => None,
        }
    }

    pub(crate) fn at(step: Step) -> impl FnOnce(PlatformError) -> PipelineError {
        move |source| PipelineError::Platform { step, source }
    }
}

impl From<CoreError> for PipelineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DependencyMissing { step, dependency } => {
                PipelineError::DependencyMissing { step, dependency }
            }
            CoreError::Validation(msg) | CoreError::Config(msg) => PipelineError::Validation(msg),
        }
    }
}

/// A failed attempt together with the resources it left behind.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct PipelineFailure {
    #[source]
    pub error: PipelineError,
    /// Resources created before the failure, in creation order. They stay
    /// on the platform as paused orphans.
    pub created: Vec<CreatedResource>,
}

impl PipelineFailure {
    pub fn is_transient(&self) -> bool {
        self.error.is_transient()
    }
}

#[cfg(test)]
mod tests {
    use adgen_adplatform::GraphErrorDetail;

    use super::*;

    #[test]
    fn timeout_is_transient() {
        let err = PipelineError::Timeout {
            step: Step::AdSet,
            after: Duration::from_secs(60),
        };
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "ad_set step timed out after 60s");
    }

    #[test]
    fn platform_error_keeps_message_and_step() {
        let source = PlatformError::Api {
            status: 400,
            detail: GraphErrorDetail::new("Invalid parameter", 100),
        };
        let err = PipelineError::at(Step::Campaign)(source);
        assert!(!err.is_transient());
        assert_eq!(err.step(), Some(Step::Campaign));
        assert_eq!(err.failure_kind(), Some(FailureKind::InvalidParameter));
        assert!(err.to_string().contains("Invalid parameter (code 100)"));
    }

    #[test]
    fn transient_upload_rejection_is_retryable() {
        let source = PlatformError::from_response(503, "unavailable");
        let err = PipelineError::Upload(UploadError::Rejected(source));
        assert!(err.is_transient());
        assert_eq!(err.failure_kind(), Some(FailureKind::Transient));
        assert_eq!(err.step(), Some(Step::Upload));
    }

    #[test]
    fn local_image_errors_are_permanent() {
        let err = PipelineError::Upload(UploadError::Missing {
            path: "gone.png".into(),
        });
        assert!(!err.is_transient());
        assert_eq!(err.failure_kind(), None);

        let source = PlatformError::Api {
            status: 400,
            detail: GraphErrorDetail::new("Invalid image", 100),
        };
        let err = PipelineError::Upload(UploadError::Rejected(source));
        assert!(!err.is_transient());
    }

    #[test]
    fn core_dependency_error_maps_through() {
        let err: PipelineError = CoreError::DependencyMissing {
            step: Step::Ad,
            dependency: "creative_id",
        }
        .into();
        assert!(matches!(
            err,
            PipelineError::DependencyMissing {
                step: Step::Ad,
                dependency: "creative_id"
            }
        ));
    }
}
