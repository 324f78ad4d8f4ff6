use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use schemars::{JsonSchema, Schema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::answers::FieldRef;
use crate::spec::component::{Component, FieldDef, InputType, Section};
use crate::spec::policy::RequiredPolicy;

/// Component ids share the submission payload object with its form id key.
const RESERVED_COMPONENT_IDS: &[&str] = &["formId"];

/// Raw form definition as authored in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintDocument {
    pub form_id: String,
    pub form_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_description: Option<String>,
    /// RFQ category key, used to pick a prefill template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub sections: Vec<Section>,
}

/// Configuration errors raised while loading a blueprint.
#[derive(Debug, Error)]
pub enum BlueprintError {
    #[error("blueprint is not valid: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("form '{form_id}' declares no sections")]
    NoSections { form_id: String },
    #[error("{context} has an empty id")]
    EmptyId { context: String },
    #[error("component id '{component_id}' in section '{section_id}' is reserved")]
    ReservedComponentId {
        section_id: String,
        component_id: String,
    },
    #[error("section id '{0}' is declared more than once")]
    DuplicateSectionId(String),
    #[error("component id '{component_id}' in section '{section_id}' is already used")]
    DuplicateComponentId {
        section_id: String,
        component_id: String,
    },
    #[error("component '{component_id}' declares field '{field_id}' more than once")]
    DuplicateFieldId {
        component_id: String,
        field_id: String,
    },
    #[error("component '{component_id}': question '{field_id}' ({input_type}) needs options")]
    MissingOptions {
        component_id: String,
        field_id: String,
        input_type: InputType,
    },
    #[error("component '{component_id}': question '{field_id}' lists option '{label}' twice")]
    DuplicateOption {
        component_id: String,
        field_id: String,
        label: String,
    },
    #[error("component '{component_id}': row '{label}' uses {input_type}, rows take text or textarea")]
    UnsupportedRowInput {
        component_id: String,
        label: String,
        input_type: InputType,
    },
}

/// Failed lookups against a loaded blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("section index {index} is out of range (form has {count} sections)")]
    SectionOutOfRange { index: usize, count: usize },
    #[error("section '{0}' not found")]
    SectionNotFound(String),
    #[error("component '{component_id}' not found in section '{section_id}'")]
    ComponentNotFound {
        section_id: String,
        component_id: String,
    },
}

#[derive(Debug)]
struct BlueprintInner {
    document: BlueprintDocument,
    // component id -> owning section index
    component_sections: BTreeMap<String, usize>,
}

/// A validated, immutable blueprint. Cloning shares the underlying document.
#[derive(Debug, Clone)]
pub struct Blueprint {
    inner: Arc<BlueprintInner>,
}

impl PartialEq for Blueprint {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.document == other.inner.document
    }
}

impl Blueprint {
    /// Validates `document` and freezes it.
    pub fn load(document: BlueprintDocument) -> Result<Self, BlueprintError> {
        let component_sections = check_document(&document)?;
        Ok(Self {
            inner: Arc::new(BlueprintInner {
                document,
                component_sections,
            }),
        })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, BlueprintError> {
        let document: BlueprintDocument = serde_json::from_str(raw)?;
        Self::load(document)
    }

    pub fn from_value(value: Value) -> Result<Self, BlueprintError> {
        let document: BlueprintDocument = serde_json::from_value(value)?;
        Self::load(document)
    }

    pub fn document(&self) -> &BlueprintDocument {
        &self.inner.document
    }

    pub fn form_id(&self) -> &str {
        &self.inner.document.form_id
    }

    pub fn form_title(&self) -> &str {
        &self.inner.document.form_title
    }

    pub fn sections(&self) -> &[Section] {
        &self.inner.document.sections
    }

    pub fn section_count(&self) -> usize {
        self.inner.document.sections.len()
    }

    pub fn section(&self, index: usize) -> Result<&Section, LookupError> {
        self.sections()
            .get(index)
            .ok_or(LookupError::SectionOutOfRange {
                index,
                count: self.section_count(),
            })
    }

    pub fn section_index(&self, section_id: &str) -> Option<usize> {
        self.sections()
            .iter()
            .position(|section| section.section_id == section_id)
    }

    pub fn section_by_id(&self, section_id: &str) -> Result<&Section, LookupError> {
        self.sections()
            .iter()
            .find(|section| section.section_id == section_id)
            .ok_or_else(|| LookupError::SectionNotFound(section_id.to_string()))
    }

    pub fn component(
        &self,
        section_id: &str,
        component_id: &str,
    ) -> Result<&Component, LookupError> {
        self.section_by_id(section_id)?
            .component(component_id)
            .ok_or_else(|| LookupError::ComponentNotFound {
                section_id: section_id.to_string(),
                component_id: component_id.to_string(),
            })
    }

    /// Finds a component anywhere in the form, with its section index.
    pub fn find_component(&self, component_id: &str) -> Option<(usize, &Component)> {
        let index = *self.inner.component_sections.get(component_id)?;
        let component = self.sections().get(index)?.component(component_id)?;
        Some((index, component))
    }

    pub fn contains_component(&self, component_id: &str) -> bool {
        self.inner.component_sections.contains_key(component_id)
    }

    pub fn field(&self, component_id: &str, field_id: &str) -> Option<FieldDef<'_>> {
        self.find_component(component_id)?.1.field(field_id)
    }

    /// Every answerable field of the form in display order.
    pub fn fields(&self) -> impl Iterator<Item = FieldDef<'_>> {
        self.sections().iter().flat_map(|section| section.fields())
    }

    pub fn required_field_ids(
        &self,
        section_id: &str,
        policy: &RequiredPolicy,
    ) -> Result<BTreeSet<FieldRef>, LookupError> {
        Ok(self
            .section_by_id(section_id)?
            .fields()
            .filter(|field| field.is_required(policy))
            .map(|field| field.field_ref())
            .collect())
    }
}

/// JSON Schema of [`BlueprintDocument`] for authoring tools.
pub fn blueprint_schema() -> Schema {
    schema_for!(BlueprintDocument)
}

fn check_document(document: &BlueprintDocument) -> Result<BTreeMap<String, usize>, BlueprintError> {
    if document.sections.is_empty() {
        return Err(BlueprintError::NoSections {
            form_id: document.form_id.clone(),
        });
    }

    let mut section_ids = BTreeSet::new();
    let mut component_sections = BTreeMap::new();

    for (section_index, section) in document.sections.iter().enumerate() {
        if section.section_id.trim().is_empty() {
            return Err(BlueprintError::EmptyId {
                context: format!("section #{section_index}"),
            });
        }
        if !section_ids.insert(section.section_id.as_str()) {
            return Err(BlueprintError::DuplicateSectionId(
                section.section_id.clone(),
            ));
        }

        for (component_index, component) in section.components.iter().enumerate() {
            let Some(component_id) = component.id() else {
                continue;
            };
            if component_id.trim().is_empty() {
                return Err(BlueprintError::EmptyId {
                    context: format!(
                        "component #{component_index} of section '{}'",
                        section.section_id
                    ),
                });
            }
            if RESERVED_COMPONENT_IDS.contains(&component_id) {
                return Err(BlueprintError::ReservedComponentId {
                    section_id: section.section_id.clone(),
                    component_id: component_id.to_string(),
                });
            }
            if component_sections
                .insert(component_id.to_string(), section_index)
                .is_some()
            {
                return Err(BlueprintError::DuplicateComponentId {
                    section_id: section.section_id.clone(),
                    component_id: component_id.to_string(),
                });
            }
            check_component(component_id, component)?;
        }
    }

    Ok(component_sections)
}

fn check_component(component_id: &str, component: &Component) -> Result<(), BlueprintError> {
    if let Component::KeyValueTable { rows, .. } = component
        && let Some(row) = rows.iter().find(|row| !row.input_type.is_free_text())
    {
        return Err(BlueprintError::UnsupportedRowInput {
            component_id: component_id.to_string(),
            label: row.label.clone(),
            input_type: row.input_type,
        });
    }

    let mut field_ids = BTreeSet::new();
    for field in component.fields() {
        if field.field_id.trim().is_empty() {
            return Err(BlueprintError::EmptyId {
                context: format!("a field of component '{component_id}'"),
            });
        }
        if !field_ids.insert(field.field_id) {
            return Err(BlueprintError::DuplicateFieldId {
                component_id: component_id.to_string(),
                field_id: field.field_id.to_string(),
            });
        }
        if field.input_type.is_choice() {
            check_options(&field)?;
        }
    }
    Ok(())
}

fn check_options(field: &FieldDef<'_>) -> Result<(), BlueprintError> {
    if field.options.is_empty() {
        return Err(BlueprintError::MissingOptions {
            component_id: field.component_id.to_string(),
            field_id: field.field_id.to_string(),
            input_type: field.input_type,
        });
    }
    let mut labels = BTreeSet::new();
    for option in field.options {
        if !labels.insert(option.label()) {
            return Err(BlueprintError::DuplicateOption {
                component_id: field.component_id.to_string(),
                field_id: field.field_id.to_string(),
                label: option.label().to_string(),
            });
        }
    }
    Ok(())
}
