use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rfq_form_spec::{Navigator, render_json_ui, render_section, render_text};

use super::{CommandContext, load_answers, load_blueprint};

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    #[arg(value_name = "BLUEPRINT")]
    pub blueprint: PathBuf,
    #[arg(long = "answers", value_name = "answers.json")]
    pub answers: Option<PathBuf>,
    /// Zero-based section index; defaults to the first incomplete section
    #[arg(long = "section", value_name = "N")]
    pub section: Option<usize>,
    #[arg(long = "json", default_value_t = false)]
    pub json: bool,
}

pub fn run(args: RenderArgs, ctx: &CommandContext) -> Result<()> {
    let blueprint = load_blueprint(&args.blueprint)?;
    let store = load_answers(args.answers.as_deref(), &blueprint)?;
    let policy = ctx.config.form_policy();

    let index = match args.section {
        Some(index) => index,
        None => Navigator::new(blueprint.clone(), policy.navigation, policy.required)
            .resume(store.answers())?,
    };
    let section = render_section(&blueprint, index, store.answers(), &policy.required)
        .with_context(|| format!("cannot render section {index}"))?;

    if args.json {
        let json = serde_json::to_string_pretty(&render_json_ui(&section))?;
        println!("{json}");
    } else {
        println!("{}", render_text(&section));
    }
    Ok(())
}
