//! Subcommands for the Flowchat CLI.
//!
//! Defines the [`Commands`] enum parsed by `clap` and the [`handle_command`]
//! dispatcher for sending messages, interactive chat, transcript replay and
//! offline segmentation.

use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Subcommand;

use flowchat_core::{
    ChatSession, Config, ExchangeOutcome, HistoryStore, HttpTransport, MemoryHistory, Role,
    Segmenter, run_exchange,
};

use crate::render::write_segments;

/// Conversation key used in local history before the backend assigns an id.
const LOCAL_CONVERSATION: &str = "local";

/// Top-level subcommands for the `flowchat` binary.
#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Send one message and print the answer
    Send {
        /// Message to send (reads from stdin if not provided)
        message: Option<String>,

        /// Continue an existing conversation by ID
        #[arg(short, long)]
        conversation: Option<String>,

        /// Override the chat endpoint from config
        #[arg(short, long)]
        endpoint: Option<String>,
    },
    /// Chat interactively, one message per line
    Chat {
        /// Continue an existing conversation by ID
        #[arg(short, long)]
        conversation: Option<String>,

        /// Override the chat endpoint from config
        #[arg(short, long)]
        endpoint: Option<String>,
    },
    /// Render a captured SSE transcript
    Replay {
        /// File holding the raw response body
        file: PathBuf,
    },
    /// Segment a raw answer text
    Segment {
        /// File holding the answer text
        file: PathBuf,
    },
}

/// Execute a subcommand.
pub(crate) async fn handle_command(
    command: Commands,
    mut config: Config,
    show_thinking: bool,
) -> Result<()> {
    match command {
        Commands::Send {
            message,
            conversation,
            endpoint,
        } => {
            if let Some(endpoint) = endpoint {
                config.endpoint = endpoint;
            }
            let Some(message) = read_message(message)? else {
                bail!("No message provided");
            };
            send(&config, &message, conversation, show_thinking).await
        }
        Commands::Chat {
            conversation,
            endpoint,
        } => {
            if let Some(endpoint) = endpoint {
                config.endpoint = endpoint;
            }
            chat(&config, conversation, show_thinking).await
        }
        Commands::Replay { file } => {
            let body = read_file(&file)?;
            let segmenter = Segmenter::from_config(&config.render);
            replay(&body, segmenter, &mut io::stdout(), show_thinking)
        }
        Commands::Segment { file } => {
            let text = String::from_utf8_lossy(&read_file(&file)?).into_owned();
            let segments = Segmenter::from_config(&config.render).segment(&text);
            write_segments(&mut io::stdout(), &segments, show_thinking)
                .context("Failed to write output")
        }
    }
}

fn new_session(config: &Config, conversation: Option<String>) -> ChatSession {
    let session = ChatSession::new().with_segmenter(Segmenter::from_config(&config.render));
    match conversation {
        Some(id) => session.with_conversation_id(id),
        None => session,
    }
}

async fn send(
    config: &Config,
    message: &str,
    conversation: Option<String>,
    show_thinking: bool,
) -> Result<()> {
    let transport = HttpTransport::from_config(config);
    let mut session = new_session(config, conversation);

    let outcome = tokio::select! {
        outcome = run_exchange(&mut session, &transport, message, config.read_timeout(), progress) => {
            outcome.context("Failed to start exchange")?
        }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\n[Interrupted]");
            return Ok(());
        }
    };

    print_outcome(&session, outcome, show_thinking)?;
    if let Some(id) = session.conversation_id() {
        eprintln!("conversation: {}", id);
    }
    Ok(())
}

async fn chat(config: &Config, conversation: Option<String>, show_thinking: bool) -> Result<()> {
    let transport = HttpTransport::from_config(config);
    let history = MemoryHistory::new();
    let mut session = new_session(config, conversation);
    let mut stored = 0;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read input")?;
        let input = line.trim();

        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/history" => {
                print_history(&history).await?;
                continue;
            }
            _ => {}
        }

        let outcome = tokio::select! {
            outcome = run_exchange(&mut session, &transport, input, config.read_timeout(), progress) => {
                Some(outcome.context("Failed to start exchange")?)
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\n[Interrupted]");
                None
            }
        };
        if let Some(outcome) = outcome {
            print_outcome(&session, outcome, show_thinking)?;
        }
        if session.is_streaming() {
            session.abandon();
        }

        let key = session
            .conversation_id()
            .unwrap_or(LOCAL_CONVERSATION)
            .to_string();
        for message in &session.history()[stored..] {
            history
                .append(&key, message)
                .await
                .context("Failed to store message")?;
        }
        stored = session.history().len();
    }

    Ok(())
}

/// Feed a captured response body through a session and print the result.
pub(crate) fn replay(
    body: &[u8],
    segmenter: Segmenter,
    out: &mut impl Write,
    show_thinking: bool,
) -> Result<()> {
    let mut session = ChatSession::new().with_segmenter(segmenter);
    session
        .begin("(replay)")
        .context("Failed to start replay")?;

    let mut outcome = session.receive_bytes(body)?;
    if outcome.finished.is_none() {
        outcome = session.end_of_stream()?;
    }

    match outcome.finished {
        Some(message) => {
            write_segments(out, &session.render_message(&message), show_thinking)?;
        }
        None => {
            write_segments(out, &session.render(), show_thinking)?;
            writeln!(out, "[incomplete: no finish frame]")?;
        }
    }
    if let Some(id) = session.conversation_id() {
        writeln!(out, "conversation: {}", id)?;
    }
    Ok(())
}

fn print_outcome(
    session: &ChatSession,
    outcome: ExchangeOutcome,
    show_thinking: bool,
) -> Result<()> {
    clear_progress();
    let mut stdout = io::stdout();
    match outcome {
        ExchangeOutcome::Finished(message) => {
            write_segments(&mut stdout, &session.render_message(&message), show_thinking)
                .context("Failed to write output")?;
        }
        ExchangeOutcome::Incomplete => {
            write_segments(&mut stdout, &session.render(), show_thinking)
                .context("Failed to write output")?;
            eprintln!("[incomplete: the response ended early]");
        }
        ExchangeOutcome::Failed(e) => {
            tracing::debug!(error = %e, "cli: exchange failed");
            let fallback = session
                .history()
                .last()
                .filter(|m| m.role == Role::Assistant)
                .map(|m| m.content.as_str())
                .unwrap_or_default();
            println!("{}", fallback);
            eprintln!("Error: {}", e);
        }
    }
    Ok(())
}

async fn print_history(history: &MemoryHistory) -> Result<()> {
    let conversations = history
        .conversations()
        .await
        .context("Failed to list conversations")?;

    if conversations.is_empty() {
        println!("No conversations yet.");
        return Ok(());
    }

    println!("{:<36}  {:<8}  PREVIEW", "ID", "MESSAGES");
    println!("{:-<80}", "");
    for summary in conversations {
        println!(
            "{:<36}  {:<8}  {}",
            summary.id,
            summary.message_count,
            summary.preview.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

/// Show a one-line progress indicator while the answer streams.
fn progress(view: &[flowchat_core::ContentSegment]) {
    let mut stderr = io::stderr();
    if stderr.is_terminal() {
        let _ = write!(stderr, "\r[receiving: {} blocks]", view.len());
        let _ = stderr.flush();
    }
}

fn clear_progress() {
    let mut stderr = io::stderr();
    if stderr.is_terminal() {
        let _ = write!(stderr, "\r\x1b[2K");
        let _ = stderr.flush();
    }
}

/// Retrieves the message from the argument or stdin.
///
/// Priority: argument > piped stdin > none (if TTY)
fn read_message(message: Option<String>) -> Result<Option<String>> {
    if let Some(msg) = message {
        return Ok(Some(msg));
    }
    if io::stdin().is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read stdin")?;
    let trimmed = buffer.trim_end();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}
