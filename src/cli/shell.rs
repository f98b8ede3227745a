//! Interactive session over a live watchlist.
//!
//! Each command is dispatched as its own task, the way clicks arrive in a
//! UI, so a command issued while another workflow runs is dropped.

use crate::core::engine::{WatchlistEngine, WorkflowOutcome};
use crate::core::rates::DisplayBase;
use crate::core::render::UserIntent;
use anyhow::{Result, anyhow};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use super::ui::{StyleType, style_text};

const HELP: &str = "\
Commands:
  add <CODE>     track a currency
  rm <CODE>      stop tracking a currency
  refresh        fetch current rates
  base <USD|BRL> change the display base
  reload         reload the watchlist from the backend
  help           show this help
  quit           leave the shell";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Intent(UserIntent),
    Reload,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Option<ShellCommand>> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(None);
    };
    let arg = parts.next();

    let command = match (verb.to_lowercase().as_str(), arg) {
        ("add", Some(code)) => {
            ShellCommand::Intent(UserIntent::SelectCurrency(code.to_uppercase()))
        }
        ("rm" | "remove", Some(code)) => {
            ShellCommand::Intent(UserIntent::RemoveCurrency(code.to_uppercase()))
        }
        ("refresh", None) => ShellCommand::Intent(UserIntent::RefreshRequested),
        ("base", Some(base)) => {
            ShellCommand::Intent(UserIntent::BaseChanged(base.parse::<DisplayBase>()?))
        }
        ("reload", None) => ShellCommand::Reload,
        ("help" | "?", None) => ShellCommand::Help,
        ("quit" | "exit" | "q", None) => ShellCommand::Quit,
        _ => return Err(anyhow!("Unrecognised command: {}", line.trim())),
    };
    Ok(Some(command))
}

fn dispatch(engine: &Arc<WatchlistEngine>, command: ShellCommand) {
    let engine = Arc::clone(engine);
    tokio::spawn(async move {
        let outcome = match command {
            ShellCommand::Intent(intent) => engine.handle(intent).await,
            ShellCommand::Reload => engine.load().await,
            ShellCommand::Help | ShellCommand::Quit => return,
        };
        match outcome {
            WorkflowOutcome::Busy => println!(
                "{}",
                style_text("Another operation is in progress, ignored", StyleType::Subtle)
            ),
            WorkflowOutcome::Offline => println!(
                "{}",
                style_text("Remote service unavailable, kept local state", StyleType::Subtle)
            ),
            WorkflowOutcome::Completed | WorkflowOutcome::Rejected(_) => {}
        }
    });
}

/// Runs the shell until `quit` or end of input. With `every`, a refresh is
/// requested on that period, subject to the same latch as typed commands.
pub async fn run(engine: Arc<WatchlistEngine>, every: Option<Duration>) -> Result<()> {
    println!("{}", style_text("fxwatch shell, type 'help' for commands", StyleType::Title));
    engine.redraw().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = every.map(tokio::time::interval);
    if let Some(ticker) = ticker.as_mut() {
        // The first tick fires immediately
        ticker.tick().await;
    }

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = async {
                match ticker.as_mut() {
                    Some(t) => { t.tick().await; }
                    None => std::future::pending::<()>().await,
                }
            } => {
                debug!("Timed refresh");
                dispatch(&engine, ShellCommand::Intent(UserIntent::RefreshRequested));
                continue;
            }
        };

        let Some(line) = line else {
            info!("End of input, leaving shell");
            break;
        };

        match parse_command(&line) {
            Ok(Some(ShellCommand::Quit)) => break,
            Ok(Some(ShellCommand::Help)) => println!("{HELP}"),
            Ok(Some(command)) => dispatch(&engine, command),
            Ok(None) => {}
            Err(e) => eprintln!("{}", style_text(&e.to_string(), StyleType::Error)),
        }
    }
    Ok(())
}
