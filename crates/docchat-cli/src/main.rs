mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chat_core::Config;
use anyhow::Context;
use chat_loop::{ChatError, ChatSession, SendOutcome};
use clap::{Parser, Subcommand};
use colored::Colorize;
use docchat_client::DocumentChatClient;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use render::AnswerPrinter;

#[derive(Parser)]
#[command(name = "docchat")]
#[command(about = "Ask questions about a document served by a docchat server")]
#[command(version)]
struct Cli {
    /// Server base URL (overrides config and DOCCHAT_SERVER_URL)
    #[arg(long)]
    server_url: Option<String>,

    /// Number of chunks to retrieve per question
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=10))]
    top_k: Option<u8>,

    /// Wait for the whole answer instead of streaming it
    #[arg(long)]
    no_stream: bool,

    /// Enable debug logging
    #[arg(long, short)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show server and document status
    Health,
    /// Upload a document, replacing the current one
    Upload {
        path: PathBuf,
    },
    /// Ask a single question
    Ask {
        /// Upload this document first
        #[arg(long)]
        file: Option<PathBuf>,
        question: String,
    },
    /// Start an interactive chat
    Chat {
        /// Upload this document first
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

fn build_config(cli: &Cli) -> Config {
    let mut config = Config::new();
    if let Some(url) = &cli.server_url {
        config.server_url = url.clone();
    }
    if cli.top_k.is_some() {
        config.top_k = cli.top_k;
    }
    if cli.no_stream {
        config.streaming = false;
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.debug);

    let config = build_config(&cli);
    log::debug!("[cli] config: {:?}", config);
    let client = Arc::new(
        DocumentChatClient::from_config(&config).context("building the HTTP client")?,
    );

    match cli.command {
        Commands::Health => {
            let health = client
                .health()
                .await
                .with_context(|| format!("querying {}", client.base_url()))?;
            render::print_health(&health);
        }
        Commands::Upload { path } => {
            let upload = client
                .upload_document(&path)
                .await
                .with_context(|| format!("uploading {}", path.display()))?;
            render::print_upload(&upload);
        }
        Commands::Ask { file, question } => {
            let session = open_session(&client, file.as_deref()).await?;
            match ask(&session, &question).await? {
                Ok(SendOutcome::Answered(_)) => {}
                Ok(SendOutcome::Failed(error)) => anyhow::bail!(error),
                Ok(SendOutcome::Cancelled) => println!("{}", "Cancelled".yellow()),
                Err(e) => anyhow::bail!(e),
            }
        }
        Commands::Chat { file } => {
            let session = open_session(&client, file.as_deref()).await?;
            run_interactive_chat(&client, &session).await?;
        }
    }

    Ok(())
}

/// Create a session, uploading `file` first or resuming the document the
/// server already holds.
async fn open_session(
    client: &Arc<DocumentChatClient>,
    file: Option<&Path>,
) -> anyhow::Result<ChatSession> {
    let session = ChatSession::new(client.clone());

    match file {
        Some(path) => upload(client, &session, path).await?,
        None => match client.health().await {
            Ok(health) => {
                if let Some(filename) = health.loaded_document() {
                    session.load_document(filename)?;
                    println!("{}", format!("Using {}", filename).dimmed());
                } else {
                    println!("{}", "No document loaded; use --file or /upload".yellow());
                }
            }
            Err(e) => log::warn!("[cli] health check failed: {}", e),
        },
    }

    Ok(session)
}

async fn upload(client: &DocumentChatClient, session: &ChatSession, path: &Path) -> anyhow::Result<()> {
    let upload = client
        .upload_document(path)
        .await
        .with_context(|| format!("uploading {}", path.display()))?;
    session.load_document(upload.filename.clone())?;
    render::print_upload(&upload);
    Ok(())
}

/// Ask one question, printing the answer as it streams.
///
/// Ctrl-C cancels the answer; the transcript is rolled back.
async fn ask(
    session: &ChatSession,
    question: &str,
) -> anyhow::Result<Result<SendOutcome, ChatError>> {
    let cancel = CancellationToken::new();
    let mut snapshots = session.subscribe();
    let mut printer = AnswerPrinter::default();

    let send = session.send_message(question, &cancel);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(send, interrupt);
    let mut listening = true;

    let outcome = loop {
        tokio::select! {
            outcome = &mut send => break outcome,
            Ok(()) = snapshots.changed() => {
                let state = snapshots.borrow_and_update().clone();
                printer.on_snapshot(&state)?;
            }
            result = &mut interrupt, if listening => {
                listening = false;
                match result {
                    Ok(()) => {
                        log::debug!("[cli] interrupt, cancelling answer");
                        cancel.cancel();
                    }
                    Err(e) => log::warn!("[cli] failed to listen for Ctrl-C: {}", e),
                }
            }
        }
    };

    match &outcome {
        Ok(SendOutcome::Answered(answer)) => {
            printer.finish(answer)?;
            if let Some(sources) = &answer.sources {
                render::print_sources(sources);
            }
        }
        Ok(SendOutcome::Failed(_)) | Ok(SendOutcome::Cancelled) => printer.abandon(),
        Err(_) => {}
    }

    Ok(outcome)
}

async fn run_interactive_chat(client: &DocumentChatClient, session: &ChatSession) -> anyhow::Result<()> {
    println!("{}", "Document chat".cyan().bold());
    println!("{}", "Commands: /upload <path>, /clear, /quit".dimmed());
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{} ", "You:".cyan().bold());
        std::io::Write::flush(&mut std::io::stdout())?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };
        let input = line.trim();

        if input.is_empty() {
            continue;
        }
        if input == "/quit" || input == "/exit" {
            break;
        }
        if input == "/clear" {
            session.clear_chat()?;
            println!("{}", "Conversation cleared".dimmed());
            continue;
        }
        if let Some(path) = input.strip_prefix("/upload") {
            let path = path.trim();
            if path.is_empty() {
                render::print_error("usage: /upload <path>");
            } else if let Err(e) = upload(client, session, Path::new(path)).await {
                render::print_error(&format!("{:#}", e));
            }
            continue;
        }

        if !session.snapshot().document_loaded {
            println!("{}", "Upload a document first (/upload <path>)".yellow());
            continue;
        }

        println!("{}", "Assistant:".green().bold());
        match ask(session, input).await? {
            Ok(SendOutcome::Answered(_)) => {}
            Ok(SendOutcome::Failed(error)) => render::print_error(&error),
            Ok(SendOutcome::Cancelled) => println!("{}", "Cancelled".yellow()),
            Err(e) => render::print_error(&e.to_string()),
        }
        println!();
    }

    println!("{}", "Goodbye!".cyan());
    Ok(())
}
