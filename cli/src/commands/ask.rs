//! # Ask Command
//!
//! Answers a single question from the knowledge graph.
//!
//! ## Usage
//!
//! ```bash
//! askgraph ask "Who wrote the OAuth integration?"
//! askgraph ask --top-k 50 --json who reported the login bug
//! askgraph ask --debug "what was discussed about the release?"
//! ```

use anyhow::Result;
use askgraph_rag::{DebugCapture, NodeType, RagAnswer, RagContext};
use colored::Colorize;
use serde::Serialize;
use termimad::MadSkin;

use crate::backend;
use crate::config::Config;
use crate::errors::display_config_error;
use crate::exit_codes::*;

/// Arguments for the ask command
#[derive(Debug)]
pub struct AskArgs {
    /// Natural language question
    pub query: String,
    /// Nodes to retrieve (configured default when unset)
    pub top_k: Option<usize>,
    /// Output as JSON
    pub json: bool,
    /// Print the debug capture to stderr
    pub debug: bool,
}

/// JSON shape of an answer
#[derive(Debug, Serialize)]
struct AskOutput<'a> {
    query: &'a str,
    answer: &'a str,
    node_type: NodeType,
    reason: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    debug: Option<&'a DebugCapture>,
}

/// Execute the ask command
///
/// # Returns
///
/// * `Ok(EXIT_SUCCESS)` - Question answered (the answer may describe a failure)
/// * `Ok(EXIT_CONFIG_ERROR)` - Invalid configuration or missing API key
pub async fn execute(args: AskArgs) -> Result<i32> {
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

    let result = answer_once(&ctx, &args).await;
    ctx.shutdown().await;
    result
}

async fn answer_once(ctx: &RagContext, args: &AskArgs) -> Result<i32> {
    let mut capture = DebugCapture::default();
    let answer = ctx
        .answer(&args.query, args.top_k, args.debug.then_some(&mut capture))
        .await;

    if args.debug {
        eprintln!("{}", serde_json::to_string_pretty(&capture)?);
    }

    if args.json {
        let debug = args.debug.then_some(&capture);
        println!(
            "{}",
            serde_json::to_string_pretty(&json_output(&args.query, &answer, debug))?
        );
    } else {
        print_answer(&answer);
    }

    Ok(EXIT_SUCCESS)
}

fn json_output(query: &str, answer: &RagAnswer, debug: Option<&DebugCapture>) -> serde_json::Value {
    let output = AskOutput {
        query,
        answer: &answer.answer,
        node_type: answer.node_type,
        reason: &answer.reason,
        debug,
    };
    serde_json::to_value(output).unwrap_or_default()
}

/// Header lines naming the node type an answer was drawn from and why
pub(crate) fn answer_header(answer: &RagAnswer) -> String {
    format!(
        "{} {} {}\n  {} {}",
        "Using".dimmed(),
        answer.node_type.to_string().cyan().bold(),
        "nodes".dimmed(),
        "Reason:".dimmed(),
        answer.reason
    )
}

/// Print an answer under its node type and selection reason
pub(crate) fn print_answer(answer: &RagAnswer) {
    println!();
    println!("{}", answer_header(answer));
    println!();
    render_markdown(&answer.answer);
    println!();
}

/// Maximum width for markdown rendering
const MARKDOWN_MAX_WIDTH: usize = 80;

/// Create a styled skin for terminal markdown rendering
fn create_markdown_skin() -> MadSkin {
    let mut skin = MadSkin::default();
    skin.set_headers_fg(termimad::crossterm::style::Color::Cyan);
    skin.bold.set_fg(termimad::crossterm::style::Color::White);
    skin.italic
        .set_fg(termimad::crossterm::style::Color::Yellow);
    skin.code_block.set_fgbg(
        termimad::crossterm::style::Color::Green,
        termimad::crossterm::style::Color::Reset,
    );
    skin
}

fn render_markdown(text: &str) {
    let skin = create_markdown_skin();
    let fmt_text = termimad::FmtText::from(&skin, text, Some(MARKDOWN_MAX_WIDTH));
    print!("{}", fmt_text);
}
