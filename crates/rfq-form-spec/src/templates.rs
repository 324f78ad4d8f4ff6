use std::collections::BTreeMap;

use serde::Serialize;

use crate::answers::{Answer, AnswerMap, ComponentAnswers};

/// The bundled RFQ intake blueprint.
pub const RFQ_INTAKE_BLUEPRINT: &str = include_str!("../blueprints/rfq_intake.json");

/// Key of the template returned for unknown categories.
pub const FALLBACK_CATEGORY: &str = "general";

/// Draft content suggested for one RFQ category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RfqTemplate {
    pub category: String,
    pub title: String,
    pub summary: String,
    pub requirements: Vec<String>,
    /// Answers for the bundled intake blueprint, merged into a store on apply.
    pub prefill: AnswerMap,
}

impl RfqTemplate {
    pub fn new(
        category: &str,
        option: &str,
        title: &str,
        summary: &str,
        requirements: &[&str],
    ) -> Self {
        let requirements: Vec<String> = requirements.iter().map(|line| line.to_string()).collect();

        let mut scope = ComponentAnswers::new();
        scope.insert("listing_title".into(), Answer::text(title));
        scope.insert("category".into(), Answer::text(option));
        scope.insert("summary".into(), Answer::text(summary));
        scope.insert("requirements".into(), Answer::Text(requirements.join("\n")));

        let mut prefill = AnswerMap::new();
        prefill.insert("project_scope".into(), scope);

        Self {
            category: category.to_string(),
            title: title.to_string(),
            summary: summary.to_string(),
            requirements,
            prefill,
        }
    }
}

/// Static lookup from category key to template.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, RfqTemplate>,
}

impl TemplateRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Templates for the categories offered by the intake blueprint.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(RfqTemplate::new(
            "crm",
            "CRM",
            "CRM for a growing sales team",
            "We need one place to track leads, deals and customer conversations.",
            &[
                "Pipeline and deal stage tracking",
                "Email and calendar sync",
                "Role-based access for managers",
            ],
        ));
        registry.register(RfqTemplate::new(
            "erp",
            "ERP",
            "ERP to replace spreadsheets in finance and operations",
            "Order, inventory and accounting data live in separate tools today.",
            &[
                "General ledger and invoicing",
                "Inventory and purchase orders",
                "Multi-currency support",
            ],
        ));
        registry.register(RfqTemplate::new(
            "analytics",
            "Analytics",
            "Self-serve analytics for business teams",
            "Teams wait on engineering for every report they need.",
            &[
                "Connectors for our data warehouse",
                "Shareable dashboards",
                "Row-level permissions",
            ],
        ));
        registry.register(RfqTemplate::new(
            "security",
            "Security",
            "Endpoint and identity security platform",
            "We want to centralise device protection and access policies.",
            &[
                "SSO and MFA enforcement",
                "Endpoint detection and response",
                "Audit log export",
            ],
        ));
        registry.register(RfqTemplate::new(
            "hr",
            "HR",
            "HR platform for onboarding and time off",
            "People operations run on email threads and shared documents.",
            &[
                "Employee records and onboarding checklists",
                "Leave requests and approvals",
                "Payroll export",
            ],
        ));
        registry.register(RfqTemplate::new(
            FALLBACK_CATEGORY,
            "Other",
            "Software to streamline our workflow",
            "Describe the process you want to improve and who uses it today.",
            &["Works with our existing tools", "Onboarding support"],
        ));
        registry
    }

    /// Adds or replaces the template for its category.
    pub fn register(&mut self, template: RfqTemplate) {
        self.templates
            .insert(normalize_category(&template.category), template);
    }

    /// Template for `category`, falling back to the general one.
    pub fn get(&self, category: &str) -> Option<&RfqTemplate> {
        self.templates
            .get(&normalize_category(category))
            .or_else(|| self.templates.get(FALLBACK_CATEGORY))
    }

    pub fn contains(&self, category: &str) -> bool {
        self.templates.contains_key(&normalize_category(category))
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }
}

fn normalize_category(category: &str) -> String {
    category.trim().to_ascii_lowercase()
}
