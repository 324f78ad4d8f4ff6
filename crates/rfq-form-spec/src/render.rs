use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::answers::{Answer, AnswerMap};
use crate::spec::blueprint::{Blueprint, LookupError};
use crate::spec::component::{Component, ComponentKind, FieldDef, InputType};
use crate::spec::policy::RequiredPolicy;
use crate::validate::{FieldStatus, evaluate_section, field_status};

/// Describes one answerable field for a rendering host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderField {
    pub field_id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    pub input_type: InputType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<Answer>,
    pub status: FieldStatus,
    pub valid: bool,
}

/// Describes one component of the current section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderComponent {
    pub kind: ComponentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<RenderField>,
}

/// Everything a host needs to paint the current wizard step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSection {
    pub form_id: String,
    pub form_title: String,
    pub section_id: String,
    pub section_title: String,
    pub section_index: usize,
    pub section_count: usize,
    pub percent: u8,
    pub is_last: bool,
    pub components: Vec<RenderComponent>,
}

impl RenderSection {
    pub fn fields(&self) -> impl Iterator<Item = &RenderField> {
        self.components
            .iter()
            .flat_map(|component| component.fields.iter())
    }
}

/// Build the render descriptors for the section at `index`.
pub fn render_section(
    blueprint: &Blueprint,
    index: usize,
    answers: &AnswerMap,
    policy: &RequiredPolicy,
) -> Result<RenderSection, LookupError> {
    let section = blueprint.section(index)?;
    let report = evaluate_section(index, section, answers, policy);

    let components = section
        .components
        .iter()
        .map(|component| match component {
            Component::InstructionalText { content } => RenderComponent {
                kind: ComponentKind::InstructionalText,
                component_id: None,
                content: Some(content.clone()),
                fields: Vec::new(),
            },
            Component::KeyValueTable { id, .. } | Component::QuestionList { id, .. } => {
                RenderComponent {
                    kind: component.kind(),
                    component_id: Some(id.clone()),
                    content: None,
                    fields: component
                        .fields()
                        .into_iter()
                        .map(|field| render_field(&field, answers, policy))
                        .collect(),
                }
            }
        })
        .collect();

    Ok(RenderSection {
        form_id: blueprint.form_id().to_string(),
        form_title: blueprint.form_title().to_string(),
        section_id: section.section_id.clone(),
        section_title: section.section_title.clone(),
        section_index: index,
        section_count: blueprint.section_count(),
        percent: report.percent,
        is_last: index + 1 == blueprint.section_count(),
        components,
    })
}

fn render_field(field: &FieldDef<'_>, answers: &AnswerMap, policy: &RequiredPolicy) -> RenderField {
    let current = answers
        .get(field.component_id)
        .and_then(|component| component.get(field.field_id))
        .cloned();
    let status = field_status(field, current.as_ref());
    RenderField {
        field_id: field.field_id.to_string(),
        label: field.label.to_string(),
        help_text: field.help_text.map(str::to_string),
        input_type: field.input_type,
        options: field.option_labels(),
        required: field.is_required(policy),
        valid: status.is_valid(),
        current,
        status,
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(section: &RenderSection) -> Value {
    let components = section
        .components
        .iter()
        .map(|component| {
            let mut map = Map::new();
            map.insert(
                "kind".into(),
                serde_json::to_value(component.kind).unwrap_or(Value::Null),
            );
            if let Some(id) = &component.component_id {
                map.insert("id".into(), Value::String(id.clone()));
            }
            if let Some(content) = &component.content {
                map.insert("content".into(), Value::String(content.clone()));
            }
            if !component.fields.is_empty() {
                let fields = component
                    .fields
                    .iter()
                    .map(|field| {
                        let mut entry = Map::new();
                        entry.insert("id".into(), Value::String(field.field_id.clone()));
                        entry.insert("label".into(), Value::String(field.label.clone()));
                        if let Some(help) = &field.help_text {
                            entry.insert("help".into(), Value::String(help.clone()));
                        }
                        entry.insert(
                            "input_type".into(),
                            Value::String(field.input_type.as_str().to_string()),
                        );
                        if !field.options.is_empty() {
                            entry.insert(
                                "options".into(),
                                Value::Array(
                                    field.options.iter().cloned().map(Value::String).collect(),
                                ),
                            );
                        }
                        entry.insert("required".into(), Value::Bool(field.required));
                        entry.insert("valid".into(), Value::Bool(field.valid));
                        if let Some(current) = &field.current
                            && let Ok(value) = serde_json::to_value(current)
                        {
                            entry.insert("current_value".into(), value);
                        }
                        if let FieldStatus::Invalid { code, message } = &field.status {
                            entry.insert(
                                "error".into(),
                                json!({ "code": code, "message": message }),
                            );
                        }
                        Value::Object(entry)
                    })
                    .collect();
                map.insert("fields".into(), Value::Array(fields));
            }
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "form_id": section.form_id,
        "form_title": section.form_title,
        "section": {
            "id": section.section_id,
            "title": section.section_title,
            "index": section.section_index,
            "count": section.section_count,
            "is_last": section.is_last,
        },
        "progress": { "percent": section.percent },
        "components": components,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(section: &RenderSection) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Form: {} ({})", section.form_title, section.form_id));
    lines.push(format!(
        "Section {}/{}: {} [{}%]",
        section.section_index + 1,
        section.section_count,
        section.section_title,
        section.percent
    ));

    for component in &section.components {
        if let Some(content) = &component.content {
            lines.push(String::new());
            lines.push(content.clone());
            continue;
        }
        for field in &component.fields {
            let marker = if field.required { "*" } else { " " };
            let state = match &field.status {
                FieldStatus::Valid => "ok",
                FieldStatus::Missing => "missing",
                FieldStatus::Invalid { .. } => "invalid",
            };
            lines.push(format!(
                "{marker} {} ({}) -> {}: {}",
                field.label,
                field.input_type,
                state,
                describe_answer(field.current.as_ref())
            ));
            if !field.options.is_empty() {
                lines.push(format!("    options: {}", field.options.join(", ")));
            }
            if let Some(help) = &field.help_text {
                lines.push(format!("    {help}"));
            }
            if let FieldStatus::Invalid { message, .. } = &field.status {
                lines.push(format!("    ! {message}"));
            }
        }
    }

    lines.join("\n")
}

fn describe_answer(answer: Option<&Answer>) -> String {
    match answer {
        None => "-".to_string(),
        Some(Answer::Text(text)) => text.clone(),
        Some(Answer::Selections(selected)) => selected.join(", "),
        Some(Answer::Detailed(options)) => options
            .iter()
            .filter(|(_, option)| option.checked)
            .map(|(label, option)| match option.detail {
                Some(detail) => format!("{label}={detail}"),
                None => format!("{label}=?"),
            })
            .collect::<Vec<_>>()
            .join(", "),
    }
}
