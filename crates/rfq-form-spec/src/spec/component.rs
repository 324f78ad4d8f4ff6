use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::answers::FieldRef;
use crate::spec::policy::RequiredPolicy;

/// Widget types a question or key-value row can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum InputType {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "textarea")]
    Textarea,
    #[serde(rename = "radiogroup")]
    RadioGroup,
    #[serde(rename = "checkboxgroup")]
    CheckboxGroup,
    #[serde(rename = "checkboxgroup_with_number")]
    CheckboxGroupWithNumber,
}

impl InputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Text => "text",
            InputType::Textarea => "textarea",
            InputType::RadioGroup => "radiogroup",
            InputType::CheckboxGroup => "checkboxgroup",
            InputType::CheckboxGroupWithNumber => "checkboxgroup_with_number",
        }
    }

    /// Choice types must declare their options.
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            InputType::RadioGroup | InputType::CheckboxGroup | InputType::CheckboxGroupWithNumber
        )
    }

    /// Free-text types, the only ones a key-value row accepts.
    pub fn is_free_text(&self) -> bool {
        matches!(self, InputType::Text | InputType::Textarea)
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One selectable option. Plain choice questions list bare strings, the
/// checkbox-with-number variant lists `{ "label": ... }` objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ChoiceOption {
    Label(String),
    Detailed { label: String },
}

impl ChoiceOption {
    pub fn label(&self) -> &str {
        match self {
            ChoiceOption::Label(label) => label,
            ChoiceOption::Detailed { label } => label,
        }
    }
}

impl From<&str> for ChoiceOption {
    fn from(label: &str) -> Self {
        ChoiceOption::Label(label.to_string())
    }
}

/// A question inside a question list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub question_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    pub input_type: InputType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ChoiceOption>>,
    /// Overrides [`RequiredPolicy::default_required`] when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

/// A labeled single-value row of a key-value table. Answers are keyed by label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub label: String,
    pub input_type: InputType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

/// Discriminant of [`Component`], used by renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    InstructionalText,
    KeyValueTable,
    QuestionList,
}

/// One renderable unit within a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Component {
    InstructionalText {
        content: String,
    },
    KeyValueTable {
        id: String,
        rows: Vec<TableRow>,
    },
    QuestionList {
        id: String,
        questions: Vec<Question>,
    },
}

impl Component {
    /// Answer-store key of the component. Instructional text has none.
    pub fn id(&self) -> Option<&str> {
        match self {
            Component::InstructionalText { .. } => None,
            Component::KeyValueTable { id, .. } | Component::QuestionList { id, .. } => Some(id),
        }
    }

    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::InstructionalText { .. } => ComponentKind::InstructionalText,
            Component::KeyValueTable { .. } => ComponentKind::KeyValueTable,
            Component::QuestionList { .. } => ComponentKind::QuestionList,
        }
    }

    /// Answerable fields in declaration order.
    pub fn fields(&self) -> Vec<FieldDef<'_>> {
        match self {
            Component::InstructionalText { .. } => Vec::new(),
            Component::KeyValueTable { id, rows } => rows
                .iter()
                .map(|row| FieldDef {
                    component_id: id,
                    field_id: &row.label,
                    label: &row.label,
                    help_text: None,
                    input_type: row.input_type,
                    options: &[],
                    required: row.required,
                })
                .collect(),
            Component::QuestionList { id, questions } => questions
                .iter()
                .map(|question| FieldDef {
                    component_id: id,
                    field_id: &question.id,
                    label: &question.question_text,
                    help_text: question.help_text.as_deref(),
                    input_type: question.input_type,
                    options: question.options.as_deref().unwrap_or(&[]),
                    required: question.required,
                })
                .collect(),
        }
    }

    pub fn field(&self, field_id: &str) -> Option<FieldDef<'_>> {
        self.fields()
            .into_iter()
            .find(|field| field.field_id == field_id)
    }
}

/// Read-only view over a question or a key-value row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDef<'a> {
    pub component_id: &'a str,
    pub field_id: &'a str,
    pub label: &'a str,
    pub help_text: Option<&'a str>,
    pub input_type: InputType,
    pub options: &'a [ChoiceOption],
    pub required: Option<bool>,
}

impl FieldDef<'_> {
    pub fn is_required(&self, policy: &RequiredPolicy) -> bool {
        self.required.unwrap_or(policy.default_required)
    }

    pub fn has_option(&self, label: &str) -> bool {
        self.options.iter().any(|option| option.label() == label)
    }

    pub fn option_labels(&self) -> Vec<String> {
        self.options
            .iter()
            .map(|option| option.label().to_string())
            .collect()
    }

    pub fn field_ref(&self) -> FieldRef {
        FieldRef::new(self.component_id, self.field_id)
    }
}

/// An ordered group of components; one wizard step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub section_id: String,
    pub section_title: String,
    #[serde(default)]
    pub components: Vec<Component>,
}

impl Section {
    pub fn fields(&self) -> impl Iterator<Item = FieldDef<'_>> {
        self.components
            .iter()
            .flat_map(|component| component.fields())
    }

    pub fn component(&self, component_id: &str) -> Option<&Component> {
        self.components
            .iter()
            .find(|component| component.id() == Some(component_id))
    }
}
