use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::{CommandContext, load_blueprint, print_json};

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Blueprint JSON file
    #[arg(value_name = "BLUEPRINT")]
    pub blueprint: PathBuf,
    #[arg(long = "json", default_value_t = false)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct SectionSummary {
    id: String,
    title: String,
    fields: usize,
    required: usize,
}

#[derive(Debug, Serialize)]
struct CheckSummary {
    form_id: String,
    form_title: String,
    sections: Vec<SectionSummary>,
    fields: usize,
    required: usize,
}

pub fn run(args: CheckArgs, ctx: &CommandContext) -> Result<()> {
    let blueprint = load_blueprint(&args.blueprint)?;
    let policy = ctx.config.form_policy().required;

    let sections: Vec<SectionSummary> = blueprint
        .sections()
        .iter()
        .map(|section| SectionSummary {
            id: section.section_id.clone(),
            title: section.section_title.clone(),
            fields: section.fields().count(),
            required: section
                .fields()
                .filter(|field| field.is_required(&policy))
                .count(),
        })
        .collect();
    let summary = CheckSummary {
        form_id: blueprint.form_id().to_string(),
        form_title: blueprint.form_title().to_string(),
        fields: sections.iter().map(|section| section.fields).sum(),
        required: sections.iter().map(|section| section.required).sum(),
        sections,
    };

    if args.json {
        return print_json(&summary);
    }

    println!(
        "ok: {} ({}) - {} sections, {} fields, {} required",
        summary.form_title,
        summary.form_id,
        summary.sections.len(),
        summary.fields,
        summary.required
    );
    for (index, section) in summary.sections.iter().enumerate() {
        println!(
            "  {}. {} [{}]: {} fields, {} required",
            index + 1,
            section.title,
            section.id,
            section.fields,
            section.required
        );
    }
    Ok(())
}
