pub mod blueprint;
pub mod component;
pub mod policy;

pub use blueprint::{Blueprint, BlueprintDocument, BlueprintError, LookupError, blueprint_schema};
pub use component::{
    ChoiceOption, Component, ComponentKind, FieldDef, InputType, Question, Section, TableRow,
};
pub use policy::{CompletionPolicy, FormPolicy, NavigationPolicy, RequiredPolicy};
