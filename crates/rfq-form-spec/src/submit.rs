use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::answers::{AnswerMap, ComponentAnswers, FieldRef};
use crate::spec::blueprint::Blueprint;
use crate::spec::policy::{CompletionPolicy, RequiredPolicy};
use crate::validate::overall_completeness;

/// Flattened answers handed to the listing creation API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub form_id: String,
    /// One entry per answerable component, keyed by component id.
    #[serde(flatten)]
    pub components: BTreeMap<String, ComponentAnswers>,
}

impl SubmissionPayload {
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Identifier the collaborator assigned to the created listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub String);

impl SubmissionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubmissionId {
    fn from(value: &str) -> Self {
        SubmissionId(value.to_string())
    }
}

/// Errors surfaced to the form host for a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("form is {percent}% complete; {} required field(s) missing", .missing.len())]
    ValidationFailed { percent: u8, missing: Vec<FieldRef> },
    #[error("submission service unavailable: {0}")]
    CollaboratorUnavailable(String),
    #[error("submission failed: {0}")]
    Unknown(String),
}

impl SubmissionError {
    /// Whether retrying the same answers can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmissionError::CollaboratorUnavailable(_))
    }
}

/// Failures reported by a submission collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("service unreachable: {0}")]
    Unavailable(String),
    #[error("no response after {after_ms}ms")]
    Timeout { after_ms: u64 },
    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("{0}")]
    Other(String),
}

/// Turns answers into a payload and collaborator results into host errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmissionAdapter {
    completion: CompletionPolicy,
    required: RequiredPolicy,
}

impl SubmissionAdapter {
    pub fn new(completion: CompletionPolicy, required: RequiredPolicy) -> Self {
        Self {
            completion,
            required,
        }
    }

    /// Builds the payload without any completeness check. Components with no
    /// answers appear as empty objects.
    pub fn flatten(blueprint: &Blueprint, answers: &AnswerMap) -> SubmissionPayload {
        let components = blueprint
            .sections()
            .iter()
            .flat_map(|section| section.components.iter())
            .filter_map(|component| component.id())
            .map(|id| (id.to_string(), answers.get(id).cloned().unwrap_or_default()))
            .collect();
        SubmissionPayload {
            form_id: blueprint.form_id().to_string(),
            components,
        }
    }

    pub fn prepare(
        &self,
        blueprint: &Blueprint,
        answers: &AnswerMap,
    ) -> Result<SubmissionPayload, SubmissionError> {
        if self.completion.require_complete {
            let report = overall_completeness(blueprint, answers, &self.required);
            if !report.is_complete() {
                return Err(SubmissionError::ValidationFailed {
                    percent: report.percent,
                    missing: report.missing_field_ids(),
                });
            }
        }
        Ok(Self::flatten(blueprint, answers))
    }

    pub fn map_result(
        result: Result<SubmissionId, CollaboratorError>,
    ) -> Result<SubmissionId, SubmissionError> {
        match result {
            Ok(id) if id.as_str().trim().is_empty() => Err(SubmissionError::Unknown(
                "service returned an empty listing id".to_string(),
            )),
            Ok(id) => Ok(id),
            Err(
                err @ (CollaboratorError::Unavailable(_)
                | CollaboratorError::Timeout { .. }
                | CollaboratorError::Rejected {
                    status: 502..=504,
                    ..
                }),
            ) => Err(SubmissionError::CollaboratorUnavailable(err.to_string())),
            Err(err) => Err(SubmissionError::Unknown(err.to_string())),
        }
    }
}
