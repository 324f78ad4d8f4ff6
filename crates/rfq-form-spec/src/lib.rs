#![allow(missing_docs)]

pub mod answers;
pub mod navigation;
pub mod render;
pub mod spec;
pub mod store;
pub mod submit;
pub mod templates;
pub mod validate;

pub use answers::{Answer, AnswerMap, AnswerSet, ComponentAnswers, FieldRef, Meta, OptionDetail};
pub use navigation::{NavState, Navigation, NavigationError, Navigator, ValidationBlocked};
pub use render::{
    RenderComponent, RenderField, RenderSection, render_json_ui, render_section, render_text,
};
pub use spec::{
    Blueprint, BlueprintDocument, BlueprintError, ChoiceOption, CompletionPolicy, Component,
    ComponentKind, FieldDef, FormPolicy, InputType, LookupError, NavigationPolicy, Question,
    RequiredPolicy, Section, TableRow, blueprint_schema,
};
pub use store::{
    AnswerError, AnswerEvent, AnswerStore, DraftHydrationMismatch, HydrationReport, SubscriptionId,
};
pub use submit::{
    CollaboratorError, SubmissionAdapter, SubmissionError, SubmissionId, SubmissionPayload,
};
pub use templates::{FALLBACK_CATEGORY, RFQ_INTAKE_BLUEPRINT, RfqTemplate, TemplateRegistry};
pub use validate::{
    CompletenessReport, FieldIssue, FieldStatus, SectionReport, completion_percent, field_status,
    overall_completeness, section_completeness,
};
