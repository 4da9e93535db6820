//! # Interactive Command
//!
//! A read-answer loop over stdin. Each line selects and retrieves on its
//! own, while the model also sees the last few questions and answers.
//! `exit`, `quit`, `q` or end of input stop the loop.
//!
//! ## Usage
//!
//! ```bash
//! askgraph interactive --top-k 100
//! ```

use std::io::Write;

use anyhow::{Context, Result};
use askgraph_rag::llm::ChatTurn;
use askgraph_rag::{DebugCapture, RagContext};
use colored::Colorize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::backend;
use crate::commands::ask::print_answer;
use crate::config::Config;
use crate::errors::{display_config_error, display_info, display_warning};
use crate::exit_codes::*;

/// Arguments for the interactive command
#[derive(Debug, Clone)]
pub struct InteractiveArgs {
    pub top_k: Option<usize>,
    /// Print the debug capture after each answer
    pub debug: bool,
}

/// Turns kept for the model, oldest dropped first (three exchanges).
const MAX_HISTORY_TURNS: usize = 6;

/// Execute the interactive command
pub async fn execute(args: InteractiveArgs) -> Result<i32> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            display_config_error(&format!("{e:#}"));
            return Ok(EXIT_CONFIG_ERROR);
        }
    };

    let ctx = match backend::connect(&config).await {
        Ok(ctx) => ctx,
        Err(e) => return Ok(backend::report_setup_error(&e)),
    };

    if ctx.availability().is_empty() {
        display_warning("No embedded nodes found. Run `askgraph embed` to embed the graph.");
    }
    display_info("Knowledge graph RAG system ready. Type 'exit' to quit.");

    let stdin = BufReader::new(tokio::io::stdin());
    let result = run_loop(&ctx, stdin, &args).await;
    ctx.shutdown().await;
    result.map(|_| EXIT_SUCCESS)
}

/// Answer lines from `input` until an exit command or end of input.
///
/// Returns the number of questions answered.
pub async fn run_loop<R>(ctx: &RagContext, input: R, args: &InteractiveArgs) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut history: Vec<ChatTurn> = Vec::new();
    let mut answered = 0;

    loop {
        print!("{} ", ">".green().bold());
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            println!();
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if is_exit_command(query) {
            break;
        }

        let mut capture = DebugCapture::default();
        let debug = args.debug.then_some(&mut capture);
        let answer = ctx
            .answer_with_history(query, args.top_k, &history, debug)
            .await;
        print_answer(&answer);
        if args.debug {
            eprintln!("{}", serde_json::to_string_pretty(&capture)?);
        }
        remember(&mut history, query, &answer.answer);
        answered += 1;
    }

    Ok(answered)
}

fn remember(history: &mut Vec<ChatTurn>, query: &str, answer: &str) {
    history.push(ChatTurn::user(query));
    history.push(ChatTurn::model(answer));
    let excess = history.len().saturating_sub(MAX_HISTORY_TURNS);
    history.drain(..excess);
}

fn is_exit_command(line: &str) -> bool {
    ["exit", "quit", "q"]
        .iter()
        .any(|cmd| line.eq_ignore_ascii_case(cmd))
}
