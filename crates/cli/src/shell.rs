//! Interactive session: one volatile session store, background sync, and a
//! line-oriented command loop.

use crate::app::App;
use crate::render;
use anyhow::Result;
use quotebook_core::sync::MANUAL_SYNC_NOTIFICATION;
use quotebook_core::CategoryFilter;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Random,
    List,
    Categories,
    Filter(CategoryFilter),
    Add { text: String, category: String },
    Sync,
    Reload,
    Help,
    Quit,
}

pub const HELP: &str = "commands: random | list | categories | filter <category|all> | \
add <text> | <category> | sync | reload | help | quit";

pub fn parse_command(line: &str) -> Result<ShellCommand, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    match word.to_lowercase().as_str() {
        "random" | "next" | "new" => Ok(ShellCommand::Random),
        "list" | "ls" => Ok(ShellCommand::List),
        "categories" => Ok(ShellCommand::Categories),
        "filter" => Ok(ShellCommand::Filter(CategoryFilter::parse(rest))),
        "add" => {
            let (text, category) = rest
                .split_once('|')
                .ok_or_else(|| "usage: add <text> | <category>".to_string())?;
            Ok(ShellCommand::Add {
                text: text.trim().to_string(),
                category: category.trim().to_string(),
            })
        }
        "sync" => Ok(ShellCommand::Sync),
        "reload" => Ok(ShellCommand::Reload),
        "help" | "?" => Ok(ShellCommand::Help),
        "quit" | "exit" => Ok(ShellCommand::Quit),
        "" => Err(String::new()),
        other => Err(format!("unknown command '{other}'; try 'help'")),
    }
}

async fn say<W: AsyncWrite + Unpin>(out: &mut W, text: &str) -> Result<()> {
    out.write_all(text.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await?;
    Ok(())
}

/// Runs until `quit` or end of input. With `interval`, the periodic sync runs
/// in the background and its notifications are interleaved with output.
pub async fn run<R, W>(
    app: &App,
    input: R,
    out: &mut W,
    interval: Option<Duration>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let sync = app.sync_service(None);
    let (tx, mut notes) = mpsc::unbounded_channel::<String>();
    let handle = interval.map(|every| {
        let tx = tx.clone();
        sync.spawn_periodic(every, move |outcome| {
            if let Some(message) = outcome.notification() {
                let _ = tx.send(message.to_string());
            }
        })
    });
    drop(tx);

    if let Some(last) = app.book.last_viewed().await {
        say(out, &render::quote(&last)).await?;
    } else {
        let filter = app.book.last_filter().await;
        say(out, &render::quote_list(&app.book.filtered(&filter).await)).await?;
    }

    let mut lines = input.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let command = match parse_command(&line) {
                    Ok(command) => command,
                    Err(message) => {
                        if !message.is_empty() {
                            say(out, &message).await?;
                        }
                        continue;
                    }
                };
                if command == ShellCommand::Quit {
                    break;
                }
                let reply = execute(app, &sync, command).await;
                say(out, &reply).await?;
            }
            Some(note) = notes.recv() => {
                say(out, &note).await?;
            }
        }
    }

    if let Some(handle) = handle {
        handle.stop().await;
    }
    Ok(())
}

async fn execute(
    app: &App,
    sync: &quotebook_core::sync::SyncService,
    command: ShellCommand,
) -> String {
    let book = &app.book;
    match command {
        ShellCommand::Random => match book.random().await {
            Ok(Some(record)) => render::quote(&record),
            Ok(None) => render::NO_QUOTES.to_string(),
            Err(e) => e.to_string(),
        },
        ShellCommand::List => {
            let filter = book.last_filter().await;
            render::quote_list(&book.filtered(&filter).await)
        }
        ShellCommand::Categories => {
            let selected = book.last_filter().await;
            render::categories(&book.categories().await, &selected)
        }
        ShellCommand::Filter(filter) => {
            if let Err(e) = book.set_filter(&filter).await {
                tracing::warn!(error = %e, "could not remember filter");
            }
            render::quote_list(&book.filtered(&filter).await)
        }
        ShellCommand::Add { text, category } => match book.add(&text, &category).await {
            Ok(record) => {
                let _ = sync.notify_remote(std::slice::from_ref(&record)).await;
                format!("Added {}", render::quote(&record))
            }
            Err(e) => e.to_string(),
        },
        ShellCommand::Sync => {
            let outcome = sync.sync_once().await;
            format!("{}\n{}", render::sync_outcome(&outcome), MANUAL_SYNC_NOTIFICATION)
        }
        ShellCommand::Reload => {
            let set = book.reload().await;
            format!("Reloaded {} quotes.", set.len())
        }
        ShellCommand::Help => HELP.to_string(),
        ShellCommand::Quit => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_add_with_separator() {
        assert_eq!(
            parse_command("add  Be kind. | Virtue "),
            Ok(ShellCommand::Add {
                text: "Be kind.".into(),
                category: "Virtue".into()
            })
        );
        assert!(parse_command("add missing separator").is_err());
    }

    #[test]
    fn parses_filters_and_aliases() {
        assert_eq!(
            parse_command("filter all"),
            Ok(ShellCommand::Filter(CategoryFilter::All))
        );
        assert_eq!(
            parse_command("FILTER Wisdom"),
            Ok(ShellCommand::Filter(CategoryFilter::Category("Wisdom".into())))
        );
        assert_eq!(parse_command("next"), Ok(ShellCommand::Random));
        assert_eq!(parse_command("exit"), Ok(ShellCommand::Quit));
        assert_eq!(parse_command("   "), Err(String::new()));
        assert!(parse_command("dance").is_err());
    }
}
