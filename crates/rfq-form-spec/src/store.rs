use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

use crate::answers::{Answer, AnswerMap, AnswerSet, ComponentAnswers, FieldRef, OptionDetail};
use crate::spec::blueprint::Blueprint;
use crate::spec::component::{FieldDef, InputType};

/// Errors raised by answer store writes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnswerError {
    #[error("component '{0}' does not exist in this form")]
    UnknownComponent(String),
    #[error("field '{field_id}' does not exist in component '{component_id}'")]
    UnknownField {
        component_id: String,
        field_id: String,
    },
    #[error("field '{0}' is not a checkbox-with-number question")]
    NotDetailed(FieldRef),
    #[error("option '{label}' is not declared for field '{field}'")]
    UnknownOption { field: FieldRef, label: String },
    #[error("option '{label}' of field '{field}' must be checked before it takes a detail")]
    OptionNotChecked { field: FieldRef, label: String },
}

/// A stale draft entry dropped while hydrating or merging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftHydrationMismatch {
    #[error("component '{component_id}' is not part of the current blueprint")]
    UnknownComponent { component_id: String },
    #[error("field '{field_id}' is not part of component '{component_id}'")]
    UnknownField {
        component_id: String,
        field_id: String,
    },
}

/// Outcome of [`AnswerStore::hydrate`] and [`AnswerStore::merge`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HydrationReport {
    pub applied: Vec<FieldRef>,
    pub dropped: Vec<DraftHydrationMismatch>,
}

impl HydrationReport {
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty()
    }
}

/// Change notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerEvent {
    Set(FieldRef),
    Cleared(FieldRef),
    Hydrated { applied: usize, dropped: usize },
    Merged { applied: usize, dropped: usize },
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&AnswerEvent, &AnswerMap) + Send>;

/// Mutable answers of one form instance. Keys always belong to the blueprint
/// the store was created for.
pub struct AnswerStore {
    blueprint: Blueprint,
    answers: AnswerMap,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl fmt::Debug for AnswerStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnswerStore")
            .field("form_id", &self.blueprint.form_id())
            .field("answers", &self.answers)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl AnswerStore {
    pub fn new(blueprint: Blueprint) -> Self {
        Self {
            blueprint,
            answers: AnswerMap::new(),
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Number of answered fields.
    pub fn len(&self) -> usize {
        self.answers.values().map(ComponentAnswers::len).sum()
    }

    pub fn get(&self, component_id: &str, field_id: &str) -> Option<&Answer> {
        self.answers.get(component_id)?.get(field_id)
    }

    /// Overwrites one field. Unchecked options of a detailed answer lose
    /// their detail.
    pub fn set(
        &mut self,
        component_id: &str,
        field_id: &str,
        value: Answer,
    ) -> Result<(), AnswerError> {
        let field = self.lookup(component_id, field_id)?.field_ref();
        let mut value = value;
        value.normalize();
        self.answers
            .entry(field.component_id.clone())
            .or_default()
            .insert(field.field_id.clone(), value);
        self.notify(AnswerEvent::Set(field));
        Ok(())
    }

    /// Toggles one checkbox-with-number option. Unchecking clears its detail.
    pub fn set_option_checked(
        &mut self,
        component_id: &str,
        field_id: &str,
        label: &str,
        checked: bool,
    ) -> Result<(), AnswerError> {
        let field = self.detailed_option(component_id, field_id, label)?;
        let mut options = self.take_detailed(&field);
        let entry = options.entry(label.to_string()).or_default();
        entry.checked = checked;
        if !checked {
            entry.detail = None;
        }
        self.put_detailed(&field, options);
        self.notify(AnswerEvent::Set(field));
        Ok(())
    }

    /// Writes the numeric detail of an already checked option.
    pub fn set_option_detail(
        &mut self,
        component_id: &str,
        field_id: &str,
        label: &str,
        detail: f64,
    ) -> Result<(), AnswerError> {
        let field = self.detailed_option(component_id, field_id, label)?;
        let checked = matches!(
            self.get(component_id, field_id),
            Some(Answer::Detailed(options))
                if options.get(label).is_some_and(|option| option.checked)
        );
        if !checked {
            return Err(AnswerError::OptionNotChecked {
                field,
                label: label.to_string(),
            });
        }
        let mut options = self.take_detailed(&field);
        options.insert(label.to_string(), OptionDetail::checked_with(detail));
        self.put_detailed(&field, options);
        self.notify(AnswerEvent::Set(field));
        Ok(())
    }

    /// Removes a field's answer. Returns the previous value.
    pub fn clear_field(
        &mut self,
        component_id: &str,
        field_id: &str,
    ) -> Result<Option<Answer>, AnswerError> {
        let field = self.lookup(component_id, field_id)?.field_ref();
        let previous = match self.answers.get_mut(component_id) {
            Some(component) => {
                let previous = component.remove(field_id);
                if component.is_empty() {
                    self.answers.remove(component_id);
                }
                previous
            }
            None => None,
        };
        if previous.is_some() {
            self.notify(AnswerEvent::Cleared(field));
        }
        Ok(previous)
    }

    /// Deep copy of the current answers for autosave or export.
    pub fn snapshot(&self) -> AnswerSet {
        AnswerSet {
            form_id: self.blueprint.form_id().to_string(),
            answers: self.answers.clone(),
            meta: None,
        }
    }

    /// Replaces the current answers with `snapshot`. Keys the blueprint no
    /// longer declares are dropped and logged.
    pub fn hydrate(&mut self, snapshot: AnswerSet) -> HydrationReport {
        if snapshot.form_id != self.blueprint.form_id() {
            warn!(
                draft_form = %snapshot.form_id,
                form = %self.blueprint.form_id(),
                "hydrating answers saved for a different form id"
            );
        }
        let (answers, report) = self.retain_known(snapshot.answers);
        self.answers = answers;
        self.notify(AnswerEvent::Hydrated {
            applied: report.applied.len(),
            dropped: report.dropped.len(),
        });
        report
    }

    /// Overwrites only the fields present in `partial`.
    pub fn merge(&mut self, partial: AnswerMap) -> HydrationReport {
        let (known, report) = self.retain_known(partial);
        for (component_id, fields) in known {
            self.answers.entry(component_id).or_default().extend(fields);
        }
        self.notify(AnswerEvent::Merged {
            applied: report.applied.len(),
            dropped: report.dropped.len(),
        });
        report
    }

    pub fn clear(&mut self) {
        self.answers.clear();
        self.notify(AnswerEvent::Reset);
    }

    /// Registers a callback invoked after every mutation.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&AnswerEvent, &AnswerMap) + Send + 'static,
    {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        before != self.subscribers.len()
    }

    fn notify(&mut self, event: AnswerEvent) {
        debug!(form = %self.blueprint.form_id(), ?event, "answer store changed");
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(&event, &self.answers);
        }
    }

    fn lookup(&self, component_id: &str, field_id: &str) -> Result<FieldDef<'_>, AnswerError> {
        let (_, component) = self
            .blueprint
            .find_component(component_id)
            .ok_or_else(|| AnswerError::UnknownComponent(component_id.to_string()))?;
        component
            .field(field_id)
            .ok_or_else(|| AnswerError::UnknownField {
                component_id: component_id.to_string(),
                field_id: field_id.to_string(),
            })
    }

    fn detailed_option(
        &self,
        component_id: &str,
        field_id: &str,
        label: &str,
    ) -> Result<FieldRef, AnswerError> {
        let field = self.lookup(component_id, field_id)?;
        if field.input_type != InputType::CheckboxGroupWithNumber {
            return Err(AnswerError::NotDetailed(field.field_ref()));
        }
        if !field.has_option(label) {
            return Err(AnswerError::UnknownOption {
                field: field.field_ref(),
                label: label.to_string(),
            });
        }
        Ok(field.field_ref())
    }

    // Answers of another shape are discarded.
    fn take_detailed(&mut self, field: &FieldRef) -> BTreeMap<String, OptionDetail> {
        match self
            .answers
            .get_mut(&field.component_id)
            .and_then(|component| component.remove(&field.field_id))
        {
            Some(Answer::Detailed(options)) => options,
            _ => BTreeMap::new(),
        }
    }

    fn put_detailed(&mut self, field: &FieldRef, options: BTreeMap<String, OptionDetail>) {
        self.answers
            .entry(field.component_id.clone())
            .or_default()
            .insert(field.field_id.clone(), Answer::Detailed(options));
    }

    fn retain_known(&self, incoming: AnswerMap) -> (AnswerMap, HydrationReport) {
        let form_id = self.blueprint.form_id();
        let mut kept = AnswerMap::new();
        let mut report = HydrationReport::default();

        for (component_id, fields) in incoming {
            let Some((_, component)) = self.blueprint.find_component(&component_id) else {
                warn!(form = %form_id, component = %component_id, "dropping stale draft component");
                report
                    .dropped
                    .push(DraftHydrationMismatch::UnknownComponent { component_id });
                continue;
            };
            for (field_id, mut answer) in fields {
                if component.field(&field_id).is_none() {
                    warn!(
                        form = %form_id,
                        component = %component_id,
                        field = %field_id,
                        "dropping stale draft field"
                    );
                    report.dropped.push(DraftHydrationMismatch::UnknownField {
                        component_id: component_id.clone(),
                        field_id,
                    });
                    continue;
                }
                answer.normalize();
                report
                    .applied
                    .push(FieldRef::new(component_id.clone(), field_id.clone()));
                kept.entry(component_id.clone())
                    .or_default()
                    .insert(field_id, answer);
            }
        }

        (kept, report)
    }
}
