use serde::Serialize;

use crate::answers::{Answer, AnswerMap, FieldRef};
use crate::spec::blueprint::{Blueprint, LookupError};
use crate::spec::component::{FieldDef, InputType, Section};
use crate::spec::policy::RequiredPolicy;

/// Validity of a single field's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldStatus {
    Missing,
    Invalid { code: &'static str, message: String },
    Valid,
}

impl FieldStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, FieldStatus::Valid)
    }
}

/// An answered field whose value breaks its input rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldIssue {
    pub field: FieldRef,
    pub code: &'static str,
    pub message: String,
}

/// Completeness of one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionReport {
    pub section_id: String,
    pub section_index: usize,
    pub percent: u8,
    pub completed: usize,
    pub total: usize,
    /// Required fields that are unanswered or hold an invalid answer.
    pub missing_field_ids: Vec<FieldRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<FieldIssue>,
}

impl SectionReport {
    pub fn is_complete(&self) -> bool {
        self.missing_field_ids.is_empty()
    }
}

/// Completeness of the whole form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletenessReport {
    pub form_id: String,
    pub percent: u8,
    pub completed: usize,
    pub total: usize,
    pub per_section: Vec<SectionReport>,
}

impl CompletenessReport {
    pub fn is_complete(&self) -> bool {
        self.per_section.iter().all(SectionReport::is_complete)
    }

    pub fn missing_field_ids(&self) -> Vec<FieldRef> {
        self.per_section
            .iter()
            .flat_map(|section| section.missing_field_ids.iter().cloned())
            .collect()
    }

    pub fn issues(&self) -> impl Iterator<Item = &FieldIssue> {
        self.per_section
            .iter()
            .flat_map(|section| section.issues.iter())
    }
}

/// `round(100 * completed / total)`, where an empty set of required fields
/// counts as fully complete.
pub fn completion_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let completed = completed.min(total);
    ((completed * 200 + total) / (total * 2)) as u8
}

/// Checks one answer against its field's input rules. Required-ness is not
/// considered here.
pub fn field_status(field: &FieldDef<'_>, answer: Option<&Answer>) -> FieldStatus {
    let Some(answer) = answer else {
        return FieldStatus::Missing;
    };

    match (field.input_type, answer) {
        (InputType::Text | InputType::Textarea, Answer::Text(text)) => {
            if text.trim().is_empty() {
                FieldStatus::Missing
            } else {
                FieldStatus::Valid
            }
        }
        (InputType::RadioGroup, Answer::Text(choice)) => {
            if choice.trim().is_empty() {
                FieldStatus::Missing
            } else if field.has_option(choice) {
                FieldStatus::Valid
            } else {
                unknown_option(choice)
            }
        }
        (InputType::CheckboxGroup, Answer::Selections(selected)) => {
            if selected.is_empty() {
                return FieldStatus::Missing;
            }
            match selected.iter().find(|label| !field.has_option(label)) {
                Some(label) => unknown_option(label),
                None => FieldStatus::Valid,
            }
        }
        (InputType::CheckboxGroupWithNumber, Answer::Detailed(options)) => {
            if let Some(label) = options.keys().find(|label| !field.has_option(label)) {
                return unknown_option(label);
            }
            let mut checked = options.iter().filter(|(_, option)| option.checked).peekable();
            if checked.peek().is_none() {
                return FieldStatus::Missing;
            }
            for (label, option) in checked {
                match option.detail {
                    None => {
                        return FieldStatus::Invalid {
                            code: "missing_detail",
                            message: format!("option '{label}' is checked but has no number"),
                        };
                    }
                    Some(detail) if !detail.is_finite() || detail < 0.0 => {
                        return FieldStatus::Invalid {
                            code: "invalid_detail",
                            message: format!("option '{label}' needs a number >= 0"),
                        };
                    }
                    Some(_) => {}
                }
            }
            FieldStatus::Valid
        }
        (input_type, other) => FieldStatus::Invalid {
            code: "type_mismatch",
            message: format!(
                "{input_type} field cannot hold a {} answer",
                other.kind_label()
            ),
        },
    }
}

fn unknown_option(label: &str) -> FieldStatus {
    FieldStatus::Invalid {
        code: "unknown_option",
        message: format!("'{label}' is not one of the declared options"),
    }
}

fn lookup_answer<'a>(answers: &'a AnswerMap, field: &FieldDef<'_>) -> Option<&'a Answer> {
    answers.get(field.component_id)?.get(field.field_id)
}

pub(crate) fn evaluate_section(
    section_index: usize,
    section: &Section,
    answers: &AnswerMap,
    policy: &RequiredPolicy,
) -> SectionReport {
    let mut completed = 0;
    let mut total = 0;
    let mut missing_field_ids = Vec::new();
    let mut issues = Vec::new();

    for field in section.fields() {
        let required = field.is_required(policy);
        let status = field_status(&field, lookup_answer(answers, &field));

        if let FieldStatus::Invalid { code, message } = &status {
            issues.push(FieldIssue {
                field: field.field_ref(),
                code: *code,
                message: message.clone(),
            });
        }

        if !required {
            continue;
        }
        total += 1;
        if status.is_valid() {
            completed += 1;
        } else {
            missing_field_ids.push(field.field_ref());
        }
    }

    SectionReport {
        section_id: section.section_id.clone(),
        section_index,
        percent: completion_percent(completed, total),
        completed,
        total,
        missing_field_ids,
        issues,
    }
}

/// Completeness of one section. Pure: reads only its arguments.
pub fn section_completeness(
    blueprint: &Blueprint,
    answers: &AnswerMap,
    section_id: &str,
    policy: &RequiredPolicy,
) -> Result<SectionReport, LookupError> {
    let index = blueprint
        .section_index(section_id)
        .ok_or_else(|| LookupError::SectionNotFound(section_id.to_string()))?;
    let section = blueprint.section(index)?;
    Ok(evaluate_section(index, section, answers, policy))
}

/// Field-weighted completeness across all sections.
pub fn overall_completeness(
    blueprint: &Blueprint,
    answers: &AnswerMap,
    policy: &RequiredPolicy,
) -> CompletenessReport {
    let per_section: Vec<SectionReport> = blueprint
        .sections()
        .iter()
        .enumerate()
        .map(|(index, section)| evaluate_section(index, section, answers, policy))
        .collect();
    let completed = per_section.iter().map(|section| section.completed).sum();
    let total = per_section.iter().map(|section| section.total).sum();

    CompletenessReport {
        form_id: blueprint.form_id().to_string(),
        percent: completion_percent(completed, total),
        completed,
        total,
        per_section,
    }
}
