use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use legalbot_client::{BackendClient, DEFAULT_BASE_URL};
use legalbot_session::{
    ControllerConfig, EditPolicy, InFlightPolicy, SessionController, SessionError,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

mod command;
mod display;

use command::{Command, HELP};

type Controller = SessionController<BackendClient>;

#[derive(Parser)]
#[command(name = "legalbot")]
#[command(about = "Draft legal documents through a conversation", long_about = None)]
struct Cli {
    /// Base URL of the LegalBot backend.
    #[arg(long, env = "LEGALBOT_BACKEND_URL", default_value = DEFAULT_BASE_URL)]
    backend_url: String,

    /// Per-request timeout in seconds.
    #[arg(long, env = "LEGALBOT_TIMEOUT_SECS", default_value_t = 60)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the backend and its AI service are up
    Health,
    /// List drafting sessions
    Sessions,
    /// Chat with the assistant to draft a document
    Chat {
        /// Resume an existing session instead of starting a new one
        #[arg(long)]
        session: Option<String>,
        /// Wait for an outstanding request instead of rejecting new input
        #[arg(long)]
        queue: bool,
        /// Keep verification when a detail value is edited
        #[arg(long)]
        keep_verified_on_edit: bool,
        /// Do not extract details when a draft is produced
        #[arg(long)]
        no_extract: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("legalbot v{}", env!("CARGO_PKG_VERSION"));

    let client = BackendClient::with_timeout(
        cli.backend_url.clone(),
        Duration::from_secs(cli.timeout_secs),
    )
    .context("failed to build HTTP client")?;

    match cli.command {
        Commands::Health => {
            let controller = Controller::new(client, ControllerConfig::default());
            let health = controller
                .health()
                .await
                .with_context(|| format!("backend at {} is unreachable", cli.backend_url))?;
            display::print_health(&health);
        }
        Commands::Sessions => {
            let controller = Controller::new(client, ControllerConfig::default());
            controller.load_sessions().await?;
            display::print_sessions(&controller.sessions().await);
        }
        Commands::Chat {
            session,
            queue,
            keep_verified_on_edit,
            no_extract,
        } => {
            let config = ControllerConfig {
                in_flight: if queue {
                    InFlightPolicy::Queue
                } else {
                    InFlightPolicy::Reject
                },
                edit_policy: if keep_verified_on_edit {
                    EditPolicy::KeepOnEdit
                } else {
                    EditPolicy::ResetOnEdit
                },
                extract_on_draft: !no_extract,
            };
            chat(Controller::new(client, config), session).await?;
        }
    }

    Ok(())
}

async fn chat(controller: Controller, session: Option<String>) -> Result<()> {
    let session_id = match session {
        Some(id) => {
            controller.load_sessions().await?;
            let Some(existing) = controller.session(&id).await else {
                bail!("no session with id {id}");
            };
            display::print_transcript(&existing);
            id
        }
        None => controller.create_session().await?,
    };
    println!("Session {session_id}. Describe the document you need, or /help.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if let Err(e) = run(&controller, &session_id, command).await {
            warn!(session = %session_id, error = %e, "command failed");
            eprintln!("error: {e}");
        }
    }
    Ok(())
}

async fn run(controller: &Controller, session_id: &str, command: Command) -> Result<()> {
    match command {
        Command::Message(text) => {
            let outcome = match controller.send_message(session_id, &text).await {
                Ok(outcome) => outcome,
                Err(SessionError::Backend(e)) => {
                    if let Some(session) = controller.session(session_id).await
                        && let Some(reply) = session.last_message()
                    {
                        display::print_message(reply);
                    }
                    return Err(e.into());
                }
                Err(e) => return Err(e.into()),
            };
            let session = current(controller, session_id).await?;
            display::print_outcome(&outcome, &session);
        }
        Command::Details => {
            let session = current(controller, session_id).await?;
            match &session.details {
                Some(details) => display::print_details_card(details),
                None => println!("No details yet."),
            }
        }
        Command::Set { key, value } => {
            if controller.update_detail(session_id, &key, &value).await? {
                println!("Updated {key}.");
            } else {
                println!("{key} unchanged.");
            }
            let session = current(controller, session_id).await?;
            if let Some(details) = &session.details {
                display::print_details_card(details);
            }
        }
        Command::Verify(verified) => {
            controller.set_verified(session_id, verified).await?;
            if verified {
                println!("Details verified.");
            } else {
                println!("Verification withdrawn.");
            }
        }
        Command::Download { format, name, dir } => {
            let dir = dir.unwrap_or_else(|| PathBuf::from("."));
            let path = controller
                .download(session_id, format, &name, &dir)
                .await?;
            println!("Saved {}", path.display());
        }
        Command::Format => {
            controller.format_document(session_id).await?;
            display::print_document(&current(controller, session_id).await?);
        }
        Command::Complete => {
            controller.complete_session(session_id).await?;
            println!("Session completed. The document can still be downloaded.");
        }
        Command::RetryDetails => {
            let fields = controller.retry_extraction(session_id).await?;
            println!("Extracted {fields} fields.");
            let session = current(controller, session_id).await?;
            if let Some(details) = &session.details {
                display::print_details_card(details);
            }
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}

async fn current(controller: &Controller, session_id: &str) -> Result<legalbot_core::Session> {
    controller
        .session(session_id)
        .await
        .with_context(|| format!("session {session_id} disappeared"))
}
