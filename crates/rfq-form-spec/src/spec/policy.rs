use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Decides required-ness for questions and rows that carry no explicit flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RequiredPolicy {
    #[serde(default = "default_true")]
    pub default_required: bool,
}

impl Default for RequiredPolicy {
    fn default() -> Self {
        Self {
            default_required: true,
        }
    }
}

/// Gate applied by forward navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NavigationPolicy {
    /// `next()` refuses to leave a section with missing required fields.
    #[default]
    Strict,
    /// Sections may be left incomplete; completeness is still reported.
    AllowSkip,
}

/// Gate applied before handing answers to the submission collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CompletionPolicy {
    #[serde(default = "default_true")]
    pub require_complete: bool,
}

impl Default for CompletionPolicy {
    fn default() -> Self {
        Self {
            require_complete: true,
        }
    }
}

/// The full set of policies a form instance runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct FormPolicy {
    #[serde(default)]
    pub required: RequiredPolicy,
    #[serde(default)]
    pub navigation: NavigationPolicy,
    #[serde(default)]
    pub completion: CompletionPolicy,
}

fn default_true() -> bool {
    true
}
