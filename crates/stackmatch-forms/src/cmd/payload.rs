use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rfq_form_spec::{CompletionPolicy, SubmissionAdapter};

use super::{CommandContext, load_answers, load_blueprint, print_json};

#[derive(Args, Debug, Clone)]
pub struct PayloadArgs {
    #[arg(value_name = "BLUEPRINT")]
    pub blueprint: PathBuf,
    #[arg(long = "answers", value_name = "answers.json")]
    pub answers: PathBuf,
    /// Emit the payload even when required fields are missing
    #[arg(long = "allow-incomplete", default_value_t = false)]
    pub allow_incomplete: bool,
}

pub fn run(args: PayloadArgs, ctx: &CommandContext) -> Result<()> {
    let blueprint = load_blueprint(&args.blueprint)?;
    let store = load_answers(Some(&args.answers), &blueprint)?;

    let policy = ctx.config.form_policy();
    let completion = if args.allow_incomplete {
        CompletionPolicy {
            require_complete: false,
        }
    } else {
        policy.completion
    };
    let payload = SubmissionAdapter::new(completion, policy.required)
        .prepare(&blueprint, store.answers())
        .context("answers are not ready for submission")?;
    print_json(&payload)
}
