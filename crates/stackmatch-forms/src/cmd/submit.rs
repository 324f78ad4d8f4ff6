use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Args;
use rfq_form_spec::SubmissionAdapter;

use super::{CommandContext, load_answers, load_blueprint};
use crate::submission::{HttpSubmissionClient, Submitter};

#[derive(Args, Debug, Clone)]
pub struct SubmitArgs {
    #[arg(value_name = "BLUEPRINT")]
    pub blueprint: PathBuf,
    #[arg(long = "answers", value_name = "answers.json")]
    pub answers: PathBuf,
    /// Listing API base url; overrides `submission_base_url`
    #[arg(long = "url", value_name = "URL")]
    pub url: Option<String>,
}

pub fn run(args: SubmitArgs, ctx: &CommandContext) -> Result<()> {
    let blueprint = load_blueprint(&args.blueprint)?;
    let store = load_answers(Some(&args.answers), &blueprint)?;
    let base_url = args
        .url
        .clone()
        .or_else(|| ctx.config.submission_base_url.clone())
        .ok_or_else(|| anyhow!("no listing API url; pass --url or set submission_base_url"))?;

    let client = HttpSubmissionClient::new(&base_url)
        .with_context(|| format!("invalid listing API url {base_url}"))?;
    let policy = ctx.config.form_policy();
    let submitter = Submitter::new(
        Arc::new(client),
        SubmissionAdapter::new(policy.completion, policy.required),
        ctx.config.submission_timeout(),
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let id = runtime
        .block_on(submitter.submit(&blueprint, store.answers()))
        .context("submission failed")?;
    println!("{id}");
    Ok(())
}
