use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Checked state and numeric detail of one checkbox-with-number option.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct OptionDetail {
    pub checked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<f64>,
}

impl OptionDetail {
    pub fn checked_with(detail: f64) -> Self {
        Self {
            checked: true,
            detail: Some(detail),
        }
    }
}

/// A single stored answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Answer {
    /// text, textarea and radio group answers.
    Text(String),
    /// checkbox group selections.
    Selections(Vec<String>),
    /// checkbox-with-number answers keyed by option label.
    Detailed(BTreeMap<String, OptionDetail>),
}

impl Answer {
    pub fn text(value: impl Into<String>) -> Self {
        Answer::Text(value.into())
    }

    pub fn selections<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Answer::Selections(values.into_iter().map(Into::into).collect())
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Answer::Text(_) => "text",
            Answer::Selections(_) => "selection list",
            Answer::Detailed(_) => "option map",
        }
    }

    /// Unchecked options never keep a detail.
    pub(crate) fn normalize(&mut self) {
        if let Answer::Detailed(options) = self {
            for option in options.values_mut() {
                if !option.checked {
                    option.detail = None;
                }
            }
        }
    }
}

impl From<&str> for Answer {
    fn from(value: &str) -> Self {
        Answer::Text(value.to_string())
    }
}

impl From<String> for Answer {
    fn from(value: String) -> Self {
        Answer::Text(value)
    }
}

/// Answers of one component keyed by question id or row label.
pub type ComponentAnswers = BTreeMap<String, Answer>;

/// Answers of a whole form keyed by component id.
pub type AnswerMap = BTreeMap<String, ComponentAnswers>;

/// Fully qualified field address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldRef {
    pub component_id: String,
    pub field_id: String,
}

impl FieldRef {
    pub fn new(component_id: impl Into<String>, field_id: impl Into<String>) -> Self {
        Self {
            component_id: component_id.into(),
            field_id: field_id.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component_id, self.field_id)
    }
}

/// Optional metadata paired with an [`AnswerSet`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
}

/// Snapshot of in-progress answers for a given form, used for drafts and export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSet {
    pub form_id: String,
    #[serde(default)]
    pub answers: AnswerMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl AnswerSet {
    /// Creates a fresh empty answer set for a form.
    pub fn new(form_id: impl Into<String>) -> Self {
        Self {
            form_id: form_id.into(),
            answers: AnswerMap::new(),
            meta: None,
        }
    }

    pub fn with_saved_at(mut self, saved_at: impl Into<String>) -> Self {
        self.meta = Some(Meta {
            saved_at: Some(saved_at.into()),
        });
        self
    }

    pub fn field_count(&self) -> usize {
        self.answers.values().map(BTreeMap::len).sum()
    }

    /// Serializes the answer set as indented JSON for debugging.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
