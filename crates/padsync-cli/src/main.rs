//! padsync CLI
//!
//! Line-oriented editing shell around a `DocumentHandler`, mainly for
//! poking at the synchronization and formatting layers without a GUI.
//! Runs over the in-process bus; real deployments plug a session-bus
//! transport into the same `MessageBus` seam.
//!
//! ## Usage
//!
//! ```bash
//! # Join the default shared channel
//! padsync
//!
//! # Join an explicit channel
//! padsync --channel team1
//!
//! # Edit locally with no bus participation
//! padsync --detached
//!
//! # Load a file on startup
//! padsync --channel team1 --file notes.txt
//! ```
//!
//! Shell commands: `show`, `set <text>`, `cursor <n>`, `select <a> <b>`,
//! `bold|italic|underline on|off`, `size <pt>`, `family <name>`,
//! `align <left|center|right|justify>`, `open <path>`, `save <path>`,
//! `undo`, `redo`, `status`, `quit`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::io::AsyncBufReadExt;
use tracing::debug;

use padsync_core::testing::FormattedBuffer;
use padsync_core::{Alignment, ChannelName, DocEvent, DocumentHandler, LocalBus};

/// padsync - shared-text editing shell
#[derive(Parser)]
#[command(name = "padsync")]
#[command(version = "0.1.0")]
#[command(about = "Shared-text editing over a local message bus")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Edit locally without joining any channel
    #[arg(long, conflicts_with = "channel")]
    detached: bool,

    /// Channel to join (default: the shared channel)
    #[arg(long)]
    channel: Option<String>,

    /// File to load on startup
    #[arg(long)]
    file: Option<PathBuf>,
}

impl Cli {
    fn channel_name(&self) -> ChannelName {
        if self.detached {
            ChannelName::Detached
        } else if let Some(name) = &self.channel {
            ChannelName::named(name)
        } else {
            ChannelName::default_shared()
        }
    }
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let channel = cli.channel_name();
    println!("padsync on channel '{}'", channel);

    let handler = Arc::new(DocumentHandler::new(channel, LocalBus::shared()));
    handler.attach_document(Box::new(FormattedBuffer::new()));
    handler.join().await?;

    if let Some(path) = &cli.file {
        handler.load(path).await;
        println!("loaded {}", handler.file_name());
    }

    spawn_event_printer(&handler);
    shell(&handler).await
}

/// Print inbound changes so a second shell on the same channel is visible
fn spawn_event_printer(handler: &Arc<DocumentHandler>) {
    let mut events = handler.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                DocEvent::ContentChanged { text } => {
                    println!("[content] {}", text);
                }
                DocEvent::FileChanged { name } => println!("[file] {}", name),
                DocEvent::Error { message } => eprintln!("[error] {}", message),
                DocEvent::FormatsInvalidated => debug!("formats invalidated"),
            }
        }
    });
}

async fn shell(handler: &Arc<DocumentHandler>) -> Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "quit" | "exit" => break,
            "show" => println!("{}", handler.text()),
            "set" => handler.set_text(rest).await,
            "undo" => handler.undo().await,
            "redo" => handler.redo().await,
            "cursor" => match rest.parse() {
                Ok(pos) => handler.set_cursor_position(pos),
                Err(_) => eprintln!("usage: cursor <n>"),
            },
            "select" => {
                let parts: Vec<_> = rest.split_whitespace().collect();
                match (
                    parts.first().and_then(|p| p.parse().ok()),
                    parts.get(1).and_then(|p| p.parse().ok()),
                ) {
                    (Some(start), Some(end)) => {
                        handler.set_selection_start(start);
                        handler.set_selection_end(end);
                    }
                    _ => eprintln!("usage: select <start> <end>"),
                }
            }
            "bold" => handler.set_bold(rest == "on"),
            "italic" => handler.set_italic(rest == "on"),
            "underline" => handler.set_underline(rest == "on"),
            "size" => match rest.parse() {
                Ok(size) => handler.set_font_size(size),
                Err(_) => eprintln!("usage: size <pt>"),
            },
            "family" => handler.set_font_family(rest),
            "align" => match rest {
                "left" => handler.set_alignment(Alignment::Left),
                "center" => handler.set_alignment(Alignment::Center),
                "right" => handler.set_alignment(Alignment::Right),
                "justify" => handler.set_alignment(Alignment::Justify),
                _ => eprintln!("usage: align <left|center|right|justify>"),
            },
            "open" => handler.load(&PathBuf::from(rest)).await,
            "save" => {
                if let Err(e) = handler.save_as(&PathBuf::from(rest)) {
                    eprintln!("{}", e);
                }
            }
            "status" => {
                println!(
                    "channel={} file={} modified={} bold={} italic={} underline={} size={} align={:?}",
                    handler.channel(),
                    handler.file_name(),
                    handler.is_modified(),
                    handler.bold(),
                    handler.italic(),
                    handler.underline(),
                    handler.font_size(),
                    handler.alignment(),
                );
            }
            other => eprintln!("unknown command: {}", other),
        }
    }
    Ok(())
}
