//! Interactive chat over one provisioned workspace.

use std::io::Write as _;

use anyhow::{Context as _, Result};
use owo_colors::OwoColorize;
use skillbench_core::conversation::Conversation;
use skillbench_core::workspace::Workspace;
use skillbench_core::{Driver, ToolExchange, context};
use skillbench_openai_model::OpenAIProvider;
use tokio::io::{self, AsyncBufReadExt};

use crate::RunArgs;

const BAR_CHAR: &str = "▎";

pub async fn run(provider: OpenAIProvider, args: RunArgs) -> Result<()> {
    let workspace = Workspace::provision(&args.workdir, "chat")
        .context("provision chat workspace")?;

    let skills = context::build_skills_context(
        &workspace,
        &args.skills_dir,
        args.char_budget,
    );
    for skill in &skills.skills {
        println!(
            "loaded skill {} ({})",
            skill.name.as_deref().unwrap_or("(unnamed)").bold(),
            skill.path
        );
    }
    let files = context::build_files_context(
        &workspace,
        &args.context_files,
        args.char_budget,
    );

    let docs = vec![skills.text, files.text];
    let driver = Driver::new(provider, workspace, args.run_config());
    println!("workspace: {}", driver.workspace().root().display());
    println!("type \"exit\" to leave, \"clear\" to reset the conversation");

    let mut conversation = Conversation::with_system_context(docs.clone());
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "exit" | "quit" => break,
            "clear" => {
                conversation = Conversation::with_system_context(docs.clone());
                println!("conversation cleared");
                continue;
            }
            _ => {}
        }

        conversation.push_user(line);
        match driver.run_turn(&mut conversation, echo_exchange).await {
            Ok(text) => {
                println!(
                    "{}🤖 {}",
                    BAR_CHAR.bright_cyan(),
                    text.bright_white()
                );
            }
            Err(err) => {
                error!("model turn failed: {err}");
                eprintln!("model turn failed: {err}");
            }
        }
    }

    Ok(())
}

fn echo_exchange(exchange: &ToolExchange) {
    let bar = if exchange.result.success() {
        BAR_CHAR.bright_yellow().to_string()
    } else {
        BAR_CHAR.bright_red().to_string()
    };
    let name = exchange.call.kind().name();
    let detail = exchange
        .call
        .path()
        .or_else(|| exchange.call.command())
        .unwrap_or_default();
    println!("{bar}🔧 {} {}", name.bold(), detail);
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
