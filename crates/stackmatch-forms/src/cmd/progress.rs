use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use rfq_form_spec::overall_completeness;

use super::{CommandContext, load_answers, load_blueprint, print_json};

#[derive(Args, Debug, Clone)]
pub struct ProgressArgs {
    #[arg(value_name = "BLUEPRINT")]
    pub blueprint: PathBuf,
    /// Draft or answer map to evaluate
    #[arg(long = "answers", value_name = "answers.json")]
    pub answers: Option<PathBuf>,
    #[arg(long = "json", default_value_t = false)]
    pub json: bool,
}

pub fn run(args: ProgressArgs, ctx: &CommandContext) -> Result<()> {
    let blueprint = load_blueprint(&args.blueprint)?;
    let store = load_answers(args.answers.as_deref(), &blueprint)?;
    let report = overall_completeness(
        &blueprint,
        store.answers(),
        &ctx.config.form_policy().required,
    );

    if args.json {
        return print_json(&report);
    }

    println!(
        "{}: {}% complete ({}/{} required fields)",
        report.form_id, report.percent, report.completed, report.total
    );
    for section in &report.per_section {
        println!(
            "  {}: {}% ({}/{})",
            section.section_id, section.percent, section.completed, section.total
        );
        for field in &section.missing_field_ids {
            println!("    missing {field}");
        }
        for issue in &section.issues {
            println!("    {} [{}]: {}", issue.field, issue.code, issue.message);
        }
    }
    Ok(())
}
