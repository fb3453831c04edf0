use clap::{Parser, Subcommand};
use colored::*;
use anyhow::Result;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod app;
mod auth;
mod config;
mod gateway;
mod handler;
mod tui;
mod ui;

use app::App;
use auth::SessionStore;
use config::Config;
use gateway::{PokeApiClient, QueryResult, FAILURE_MESSAGE};

#[derive(Parser)]
#[command(name = "pokechat")]
#[command(about = "Terminal chat client for a Pokémon information API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chat screen (default)
    Chat,
    /// Ask a single question and print the answer
    Ask {
        /// Your question, e.g. a Pokémon name
        question: String,
    },
    /// Store a local session for the given email
    Login {
        /// Email shown in the chat header
        email: String,
    },
    /// Clear the local session
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; the chat screen owns stdout
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|_| Config::new());
    let gateway = PokeApiClient::new(&config.api_url());
    let sessions = SessionStore::open()?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_chat(gateway, &sessions).await,
        Commands::Ask { question } => ask_once(&gateway, &question).await,
        Commands::Login { email } => {
            let identity = sessions.sign_in(&email)?;
            println!("Signed in as {}", identity.email.green());
            Ok(())
        }
        Commands::Logout => {
            sessions.sign_out()?;
            println!("Signed out");
            Ok(())
        }
    }
}

async fn ask_once(gateway: &PokeApiClient, question: &str) -> Result<()> {
    if question.trim().is_empty() {
        return Ok(());
    }

    println!("🔍 Asking about: {}\n", question.bold().cyan());

    let result = gateway.query(question, None).await;
    println!("{}", result.answer);

    Ok(())
}

async fn run_chat(gateway: PokeApiClient, sessions: &SessionStore) -> Result<()> {
    let Some(user) = sessions.current_user() else {
        println!(
            "{} Run: {}",
            "Not signed in.".yellow(),
            "pokechat login <email>".bold()
        );
        return Ok(());
    };

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();
    let mut app = App::new(user);

    let result = event_loop(&mut terminal, &mut events, &mut app, &gateway).await;
    tui::restore()?;
    result?;

    if app.sign_out {
        sessions.sign_out()?;
        println!("Signed out");
    }

    Ok(())
}

async fn event_loop(
    terminal: &mut tui::Tui,
    events: &mut tui::EventHandler,
    app: &mut App,
    gateway: &PokeApiClient,
) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        // Fold a finished exchange back in before handling the next event
        if let Some((seq, task)) = app.exchange_task.take() {
            if task.is_finished() {
                let result = match task.await {
                    Ok(result) => result,
                    Err(err) => {
                        // The gateway absorbs its own failures, so this only
                        // fires if the task itself died
                        error!("exchange task failed: {}", err);
                        QueryResult {
                            answer: FAILURE_MESSAGE.to_string(),
                            conversation_id: app.conversation_id.clone().unwrap_or_default(),
                        }
                    }
                };
                app.complete_exchange(seq, result);
            } else {
                app.exchange_task = Some((seq, task));
            }
        }

        if let Some(event) = events.next().await {
            match event {
                tui::AppEvent::Key(key) => handler::handle_key_event(app, gateway, key)?,
                tui::AppEvent::Tick => app.tick_animation(),
                tui::AppEvent::Resize(_, _) => {}
            }
        }
    }

    Ok(())
}
