use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use rfq_form_spec::{AnswerSet, AnswerStore, Blueprint, RFQ_INTAKE_BLUEPRINT, TemplateRegistry};
use serde::Serialize;

use super::{CommandContext, load_blueprint, print_json};

#[derive(Args, Debug, Clone)]
pub struct TemplateArgs {
    /// Category key, e.g. crm or security; unknown keys use the general template
    #[arg(value_name = "CATEGORY")]
    pub category: Option<String>,
    /// Filter the prefill against this blueprint instead of the bundled one
    #[arg(long = "blueprint", value_name = "BLUEPRINT")]
    pub blueprint: Option<PathBuf>,
    /// List the registered categories
    #[arg(long = "list", default_value_t = false, conflicts_with = "category")]
    pub list: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TemplateOutput<'a> {
    category: &'a str,
    title: &'a str,
    summary: &'a str,
    requirements: &'a [String],
    draft: AnswerSet,
}

pub fn run(args: TemplateArgs, _ctx: &CommandContext) -> Result<()> {
    let registry = TemplateRegistry::builtin();
    if args.list {
        for category in registry.categories() {
            println!("{category}");
        }
        return Ok(());
    }
    let Some(category) = args.category.as_deref() else {
        bail!("a category is required unless --list is given");
    };
    let Some(template) = registry.get(category) else {
        bail!("no template for category '{category}'");
    };

    let blueprint = match &args.blueprint {
        Some(path) => load_blueprint(path)?,
        None => Blueprint::from_json_str(RFQ_INTAKE_BLUEPRINT)
            .context("bundled intake blueprint is invalid")?,
    };
    let mut store = AnswerStore::new(blueprint);
    store.merge(template.prefill.clone());

    print_json(&TemplateOutput {
        category: &template.category,
        title: &template.title,
        summary: &template.summary,
        requirements: &template.requirements,
        draft: store.snapshot(),
    })
}
