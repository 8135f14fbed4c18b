//! Command-line entry points for running evaluation suites and
//! interactive sessions.

#[macro_use]
extern crate tracing;

mod cases;
mod chat;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use skillbench_core::RunConfig;
use skillbench_core::suite::{Suite, SuiteConfig};
use skillbench_openai_model::{OpenAIConfigBuilder, OpenAIProvider};

#[derive(Parser)]
#[command(
    name = "skillbench",
    version,
    about = "Drives a tool-using model through sandboxed workspaces and \
             checks the results"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the declared cases and print a JSON report.
    Eval {
        /// Path to the JSON Lines case file.
        #[arg(long, default_value = "evals/cases.jsonl")]
        cases: PathBuf,

        /// Keep each case's workspace on disk for inspection.
        #[arg(long)]
        keep_workspaces: bool,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Chat interactively over one provisioned workspace.
    Chat {
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Source tree copied into each workspace.
    #[arg(long, default_value = ".")]
    workdir: PathBuf,

    /// Workspace-relative directory scanned for SKILL.md documents.
    #[arg(long, default_value = "skills/")]
    skills_dir: String,

    /// Workspace-relative file injected as extra system context.
    /// May be repeated.
    #[arg(long = "context-file")]
    context_files: Vec<String>,

    /// Maximum model round trips per run.
    #[arg(long, default_value_t = 20)]
    max_steps: u32,

    /// Timeout for each shell command, in seconds.
    #[arg(long, default_value_t = 60)]
    shell_timeout: u64,

    /// Total character budget for each assembled context string.
    #[arg(long, default_value_t = 200_000)]
    char_budget: usize,
}

impl RunArgs {
    fn run_config(&self) -> RunConfig {
        RunConfig {
            max_steps: self.max_steps,
            shell_timeout: Duration::from_secs(self.shell_timeout),
        }
    }
}

fn provider_from_env() -> Result<OpenAIProvider> {
    let api_key = env::var("OPENAI_API_KEY")
        .context("OPENAI_API_KEY environment variable is not set")?;

    let mut builder = OpenAIConfigBuilder::with_api_key(api_key);
    if let Ok(base_url) = env::var("OPENAI_BASE_URL") {
        builder = builder.with_base_url(base_url);
    }
    if let Ok(model) = env::var("OPENAI_MODEL") {
        builder = builder.with_model(model);
    }
    Ok(OpenAIProvider::new(builder.build()))
}

async fn eval(
    cases_path: PathBuf,
    keep_workspaces: bool,
    run: RunArgs,
) -> Result<ExitCode> {
    let cases = cases::load(&cases_path)?;
    info!("loaded {} case(s) from {}", cases.len(), cases_path.display());

    let provider = provider_from_env()?;
    let suite = Suite::new(
        provider,
        SuiteConfig {
            source_root: run.workdir.clone(),
            skills_dir: Some(run.skills_dir.clone()),
            context_files: run.context_files.clone(),
            char_budget: run.char_budget,
            run_config: run.run_config(),
            keep_workspaces,
        },
    );

    let report = suite.run(&cases).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Eval {
            cases,
            keep_workspaces,
            run,
        } => eval(cases, keep_workspaces, run).await,
        Command::Chat { run } => {
            chat::run(provider_from_env()?, run).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
