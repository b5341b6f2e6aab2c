//! Ad publishing orchestration.
//!
//! [`AdPublisher`] runs the five dependent creation steps for one ad and
//! wraps the whole sequence in the linear-backoff retry loop.
//! [`AdAutomation`] puts image generation in front of it and writes a
//! JSON record of every run.

pub mod automation;
pub mod error;
pub mod ledger;
pub mod publisher;
pub mod retry;

pub use automation::{AdAutomation, AutomationJob, AutomationRecord, AutomationSettings};
pub use error::{PipelineError, PipelineFailure};
pub use ledger::StepLedger;
pub use publisher::{AdPublisher, PublishOptions};
pub use retry::{with_retry, RecordingSleeper, RetryError, Retried, Sleeper, TokioSleeper};
