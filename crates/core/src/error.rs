use crate::steps::Step;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Missing dependency for {step} step: {dependency} is empty")]
    DependencyMissing {
        step: Step,
        dependency: &'static str,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(errors: validator::ValidationErrors) -> Self {
        CoreError::Validation(errors.to_string())
    }
}
