use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "http")]
use crate::cmd::submit::SubmitArgs;
use crate::cmd::{
    self, CommandContext, check::CheckArgs, payload::PayloadArgs, progress::ProgressArgs,
    render::RenderArgs, template::TemplateArgs,
};
use crate::config::EngineConfig;

pub const LOG_ENV: &str = "STACKMATCH_LOG";
const DEFAULT_LOG_FILTER: &str = "stackmatch_forms=info,rfq_form_spec=warn";

#[derive(Parser, Debug)]
#[command(
    name = "stackmatch-forms",
    about = "Validate, inspect and submit StackMatch RFQ form blueprints",
    version,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Engine config file (TOML)
    #[arg(long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load and validate a blueprint
    Check(CheckArgs),
    /// Report completeness of an answers file
    Progress(ProgressArgs),
    /// Render one section of a blueprint
    Render(RenderArgs),
    /// Print the submission payload for an answers file
    Payload(PayloadArgs),
    /// Show the prefill draft of an RFQ category
    Template(TemplateArgs),
    /// Print the JSON schema of blueprint documents
    Schema,
    /// Send an answers file to the listing API
    #[cfg(feature = "http")]
    Submit(SubmitArgs),
}

pub fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let (config, source) = EngineConfig::resolve(cli.config.as_deref())
        .context("failed to load engine config")?;
    tracing::debug!(%source, "using engine config");
    let ctx = CommandContext { config };

    match cli.command {
        Commands::Check(args) => cmd::check::run(args, &ctx),
        Commands::Progress(args) => cmd::progress::run(args, &ctx),
        Commands::Render(args) => cmd::render::run(args, &ctx),
        Commands::Payload(args) => cmd::payload::run(args, &ctx),
        Commands::Template(args) => cmd::template::run(args, &ctx),
        Commands::Schema => cmd::schema::run(),
        #[cfg(feature = "http")]
        Commands::Submit(args) => cmd::submit::run(args, &ctx),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    // A second init (tests driving `main` twice) is not an error worth surfacing.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}
