#![allow(missing_docs)]

#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "cli")]
pub mod cmd;
pub mod config;
pub mod drafts;
pub mod session;
pub mod submission;

pub use config::{ConfigError, ConfigSource, EngineConfig, SubmitCleanup};
pub use drafts::{DraftError, DraftStore, FileDraftStore, MemoryDraftStore};
pub use session::{FormSession, PendingSubmission, SessionError, SubmissionOutcome, SubmitStatus};
#[cfg(feature = "http")]
pub use submission::HttpSubmissionClient;
pub use submission::{SubmissionClient, Submitter};

pub use rfq_form_spec;
