//! webtarot - command-line client for the webtarot backend
//!
//! Draws readings, waits for their interpretations and manages the local list
//! of saved readings and the user identity.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use webtarot_client::{ClientState, ReadingView, ViewEvent, ViewState};
use webtarot_common::config::{ClientConfig, ConfigOverrides, LoggingConfig, Strategy};
use webtarot_common::model::{
    Card, CreateInterpretationRequest, CreateReadingRequest, CreateUserRequest, Interpretation,
    LogInRequest, User,
};
use webtarot_common::InterpretationResult;

/// Command-line arguments for webtarot
#[derive(Parser, Debug)]
#[command(name = "webtarot")]
#[command(about = "Tarot readings with asynchronously generated interpretations")]
#[command(version)]
struct Args {
    /// Backend origin, e.g. https://tarot.example.com
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// How to learn that an interpretation is ready (poll, push, hybrid)
    #[arg(long, global = true)]
    strategy: Option<Strategy>,

    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for saved readings and identity
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Draw a new reading and wait for its interpretation
    Ask {
        question: String,
        /// Number of cards to draw
        #[arg(short, long, default_value_t = 3)]
        cards: u8,
        /// Extra context for the interpreter
        #[arg(long, default_value = "")]
        context: String,
        /// Print the spread and return without waiting
        #[arg(long)]
        no_wait: bool,
    },
    /// Interpret cards you drew yourself (e.g. fool, ace-of-cups, tower:r)
    Interpret {
        question: String,
        #[arg(required = true)]
        cards: Vec<Card>,
        #[arg(long, default_value = "")]
        context: String,
        #[arg(long)]
        no_wait: bool,
    },
    /// Fetch the current state of a reading once
    Show { id: String },
    /// Wait until a reading's interpretation is ready
    Watch { id: String },
    /// List past readings, newest first
    History {
        /// Only readings created before this RFC 3339 timestamp
        #[arg(long)]
        before: Option<DateTime<Utc>>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Card draw statistics
    Stats {
        /// Number of most drawn cards to list
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Delete a reading
    Delete { id: String },
    /// List saved readings
    Saved,
    /// Create an account for the current user
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "")]
        about: String,
    },
    /// Log in to an existing account
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the account and continue anonymously
    Logout,
    /// Show the current user
    Whoami,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let overrides = ConfigOverrides {
        base_url: args.base_url.clone(),
        strategy: args.strategy,
        data_dir: args.data_dir.clone(),
        config_path: args.config.clone(),
    };
    let config = ClientConfig::resolve(&overrides).context("Failed to resolve configuration")?;

    init_tracing(&config.logging)?;
    debug!(
        "webtarot v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    debug!(
        base_url = %config.base_url,
        strategy = %config.strategy,
        data_dir = %config.data_dir.display(),
        "Configuration resolved"
    );

    let state = ClientState::new(config).context("Failed to open local store")?;
    run(state, args.command).await
}

/// Tracing to stderr, or to the configured log file
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("Invalid log level")?;

    match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

async fn run(state: ClientState, command: Command) -> Result<()> {
    match command {
        Command::Ask {
            question,
            cards,
            context,
            no_wait,
        } => {
            let request = CreateReadingRequest {
                question,
                cards,
                context,
            };
            let created = state.api.create_reading(&request).await?;
            println!("Shuffled {} times", created.shuffled_times);
            print_cards(&created.cards);
            println!("Reading: {}", created.interpretation_id);
            if no_wait {
                state.saved.add(&created.interpretation_id)?;
                return Ok(());
            }
            watch(&state, &created.interpretation_id).await
        }

        Command::Interpret {
            question,
            cards,
            context,
            no_wait,
        } => {
            let request = CreateInterpretationRequest {
                question,
                cards,
                context,
            };
            let created = state.api.create_interpretation(&request).await?;
            let id = created.interpretation_id.to_string();
            println!("Reading: {}", id);
            if no_wait {
                state.saved.add(&id)?;
                return Ok(());
            }
            watch(&state, &id).await
        }

        Command::Show { id } => {
            let result = state.api.get_interpretation(&id).await?;
            if result.is_not_found() {
                bail!("Reading not found: {}", id);
            }
            print_result(&result);
            Ok(())
        }

        Command::Watch { id } => watch(&state, &id).await,

        Command::History { before, limit } => {
            let entries = state.api.history(before, limit).await?;
            if entries.is_empty() {
                println!("No readings yet");
            }
            for entry in &entries {
                print_history_entry(entry);
            }
            Ok(())
        }

        Command::Stats { top } => {
            let stats = state.api.stats().await?;
            println!(
                "{} readings, {} cards drawn",
                stats.total_readings, stats.total_cards_drawn
            );
            for card in stats.top_drawn(top) {
                println!(
                    "  {:<28} {:>5} draws  {:>5.1}% reversed",
                    card.arcana.to_string(),
                    card.drawn_count,
                    card.percent_flipped
                );
            }
            if !stats.never_drawn.is_empty() {
                println!("Never drawn: {}", stats.never_drawn.len());
            }
            Ok(())
        }

        Command::Delete { id } => {
            state.api.delete_interpretation(&id).await?;
            let next = state.saved.remove(&id)?;
            println!("Deleted {}", id);
            if let Some(next) = next {
                println!("Next saved reading: {}", next);
            }
            Ok(())
        }

        Command::Saved => {
            let ids = state.saved.list()?;
            if ids.is_empty() {
                println!("No saved readings");
            }
            for id in ids {
                println!("{}", id);
            }
            Ok(())
        }

        Command::Signup {
            email,
            name,
            password,
            about,
        } => {
            let request = CreateUserRequest {
                email,
                name,
                password,
                self_description: about,
            };
            let response = state.api.sign_up(&request).await?;
            let name = response.user.name().unwrap_or_default().to_string();
            state.users.set_authenticated(response.user, response.access_token)?;
            state.reload_identity()?;
            println!("Signed up as {}", name);
            Ok(())
        }

        Command::Login { email, password } => {
            let response = state.api.log_in(&LogInRequest { email, password }).await?;
            let name = response.user.name().unwrap_or_default().to_string();
            state.users.set_authenticated(response.user, response.access_token)?;
            state.reload_identity()?;
            println!("Logged in as {}", name);
            Ok(())
        }

        Command::Logout => {
            let stored = state.users.log_out()?;
            println!("Logged out, continuing as {}", stored.user.id());
            Ok(())
        }

        Command::Whoami => {
            let user = match state.api.current_user().await {
                Ok(user) => user,
                Err(e) => {
                    warn!("Could not reach backend, showing stored identity: {}", e);
                    state.users.stored_user()?.user
                }
            };
            print_user(&user);
            Ok(())
        }
    }
}

/// Run the readiness policy for `id` until final, Ctrl+C, or removal
async fn watch(state: &ClientState, id: &str) -> Result<()> {
    let reconciler = state.reconciler()?;
    let view = reconciler.open(id);
    let mut events = reconciler.subscribe_events();

    let printer = spawn_state_printer(&view);
    let outcome = {
        let run = reconciler.run(&view);
        tokio::pin!(run);
        tokio::select! {
            outcome = &mut run => outcome,
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, closing reading view");
                view.close();
                run.await
            }
        }
    };
    // The printer ends once the view's sender is gone, after draining the last state
    drop(view);
    if let Err(e) = printer.await {
        debug!("State printer ended abnormally: {}", e);
    }

    match outcome {
        Ok(result) if result.done => {
            print_result(&result);
            Ok(())
        }
        Ok(result) => {
            print_result(&result);
            println!("Still pending; run `webtarot watch {}` again to refresh", id);
            Ok(())
        }
        Err(e) if e.is_cancelled() => Ok(()),
        Err(e) if e.is_not_found() => {
            if let Ok(ViewEvent::Removed { next: Some(next), .. }) = events.try_recv() {
                println!("Next saved reading: {}", next);
            }
            bail!("Reading not found: {}", id)
        }
        Err(e) => Err(e.into()),
    }
}

fn spawn_state_printer(view: &ReadingView) -> tokio::task::JoinHandle<()> {
    let mut states = view.subscribe();
    tokio::spawn(async move {
        let mut announced = false;
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            let (result, pending) = match &state {
                ViewState::Pending(result) => (result, true),
                ViewState::Ready(result) => (result, false),
                _ => continue,
            };
            if announced {
                continue;
            }
            if let Some(reading) = &result.reading {
                println!("Question: {}", reading.question);
                print_cards(&reading.cards);
            }
            if pending {
                println!("Interpreting...");
            }
            announced = true;
        }
    })
}

fn print_cards(cards: &[Card]) {
    for (position, card) in cards.iter().enumerate() {
        println!("  {}. {}", position + 1, card);
    }
}

fn print_result(result: &InterpretationResult) {
    if let Some(text) = result.text() {
        println!();
        println!("{}", text);
    } else if result.is_failed() {
        println!("Interpretation failed: {}", result.error);
    } else {
        println!("Interpretation pending");
    }
}

fn print_history_entry(entry: &Interpretation) {
    let reading = entry.reading();
    let status = match entry {
        Interpretation::Pending(_) => "pending",
        Interpretation::Done(..) => "done",
        Interpretation::Failed(..) => "failed",
    };
    println!(
        "{}  {}  [{}]  {}",
        reading.created_at.format("%Y-%m-%d %H:%M"),
        reading.id,
        status,
        reading.question
    );
}

fn print_user(user: &User) {
    match user {
        User::Anonymous { id } => println!("Anonymous user {}", id),
        User::Authenticated { id, email, name, .. } => {
            println!("{} <{}> ({})", name, email, id)
        }
    }
}
