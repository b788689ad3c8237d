//! Relay Assistant - Entry Point
//!
//! Interactive CLI: reads free-form business questions from stdin,
//! classifies them, asks for confirmation, executes against the relay,
//! and prints the result. With `--ws` the assistant path runs over the
//! persistent connection and replies stream in as they arrive.

use clap::Parser;
use relay_assistant::core::config::AssistantConfig;
use relay_assistant::core::error::Result;
use relay_assistant::core::types::{ChatHistory, Role};
use relay_assistant::exec::gate::{AutoApproveGate, ConfirmGate, SerialGate, StdinGate, TracingNotifier};
use relay_assistant::exec::CommandExecutor;
use relay_assistant::intent::classify;
use relay_assistant::relay::client::RelayClient;
use relay_assistant::relay::protocol::{RelayEvent, StreamFrame};
use relay_assistant::relay::socket::RelaySocket;
use relay_assistant::session::StreamReassembler;
use relay_assistant::summary::SummaryClient;
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Parser, Debug)]
#[command(name = "relay-assistant", about = "Ask business questions against a relay backend")]
struct Args {
    /// Relay base URL (overrides RELAY_HOST)
    #[arg(long)]
    host: Option<String>,

    /// API key for the relay (overrides RELAY_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Relay database name
    #[arg(long)]
    database: Option<String>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Open the persistent connection for streaming assistant replies
    #[arg(long)]
    ws: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y')]
    yes: bool,
}

/// Gate chosen by the CLI flags
enum CliGate {
    Auto(AutoApproveGate),
    Prompt(SerialGate<StdinGate>),
}

impl ConfirmGate for CliGate {
    async fn confirm(&self, payload: &Value) -> bool {
        match self {
            CliGate::Auto(gate) => gate.confirm(payload).await,
            CliGate::Prompt(gate) => gate.confirm(payload).await,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_assistant=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    if let Err(reason) = config.validate() {
        tracing::error!("invalid configuration: {}", reason);
        return Ok(());
    }

    let summary = SummaryClient::from_config(&config);
    if summary.is_none() {
        tracing::warn!("SUMMARY_API_KEY not set - running without the summarization service");
    }

    let gate = if args.yes {
        CliGate::Auto(AutoApproveGate)
    } else {
        CliGate::Prompt(SerialGate::new(StdinGate))
    };
    let executor =
        CommandExecutor::new(RelayClient::new(&config), gate, TracingNotifier).with_summary(summary);

    let mut history = ChatHistory::new();
    let mut reassembler = StreamReassembler::new();
    let mut socket = RelaySocket::new();
    let mut events: Option<UnboundedReceiver<RelayEvent>> = None;

    if args.ws {
        match socket.connect(&config.socket_url()).await {
            Ok(rx) => events = Some(rx),
            Err(e) => tracing::warn!("persistent connection unavailable: {}", e),
        }
    }

    println!("=== RELAY ASSISTANT ===");
    println!("Type a business question, or 'quit' to exit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_prompt();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let input = line.trim();
                if input.is_empty() {
                    print_prompt();
                    continue;
                }
                if input == "quit" || input == "q" {
                    break;
                }

                history.push(Role::User, input);
                let intent = classify(input);
                tracing::debug!(intent = intent.label(), "classified");

                let reply = executor
                    .execute(intent, &mut history, Some(&socket))
                    .await;
                if !reply.is_empty() {
                    println!("{}", reply);
                }
                print_prompt();
            }

            event = recv_event(&mut events) => {
                let Some(event) = event else {
                    // Channel gone: stop polling it
                    events = None;
                    socket.mark_closed(false);
                    continue;
                };
                match &event {
                    RelayEvent::Closed => socket.mark_closed(false),
                    RelayEvent::Error(_) => socket.mark_closed(true),
                    RelayEvent::Frame(raw) => print_chunk(raw),
                    RelayEvent::Opened => tracing::info!("persistent connection open"),
                }
                reassembler.handle_event(&mut history, &event);
            }
        }
    }

    socket.disconnect();
    Ok(())
}

fn load_config(args: &Args) -> Result<AssistantConfig> {
    let mut config = if let Some(ref path) = args.config {
        AssistantConfig::from_file(path)?
    } else if let Some(ref host) = args.host {
        AssistantConfig::new(host.clone())
    } else {
        AssistantConfig::from_env()?
    };

    if let Some(ref host) = args.host {
        config.host = host.clone();
    }
    if args.api_key.is_some() {
        config.api_key = args.api_key.clone();
    }
    if args.database.is_some() {
        config.database = args.database.clone();
    }
    Ok(config)
}

/// Await the next connection event, pending forever when not connected
async fn recv_event(events: &mut Option<UnboundedReceiver<RelayEvent>>) -> Option<RelayEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Echo streamed content as it arrives
fn print_chunk(raw: &str) {
    match serde_json::from_str::<StreamFrame>(raw) {
        Ok(frame) => {
            if !frame.content.is_empty() {
                print!("{}", frame.content);
                let _ = std::io::stdout().flush();
            }
            if frame.done || !frame.stream {
                println!();
            }
        }
        Err(_) => println!("{}", raw),
    }
}

fn print_prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}
