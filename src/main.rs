use clap::{Parser, Subcommand};
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod app;
mod client;
mod config;
mod handler;
mod page;
mod state;
mod tui;
mod ui;

use app::ChatWidget;
use client::AskClient;
use config::{Config, DEFAULT_MAX_LENGTH};
use page::PageBindings;
use state::{format_response, Message, ERROR_TEXT};
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "legalbot")]
#[command(about = "Chat with the legal assistant from your terminal")]
struct Cli {
    /// Base URL of the assistant (landing page at /, questions at /ask/)
    #[arg(short, long, env = "LEGALBOT_URL")]
    url: Option<String>,
    /// CSRF token to send instead of the one on the landing page
    #[arg(long, env = "LEGALBOT_CSRF_TOKEN")]
    csrf_token: Option<String>,
    /// Write logs here instead of the cache directory
    #[arg(long)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        question: String,
    },
    /// Have the server grade three answers to a legal question
    Score {
        /// The question the answers respond to
        query: String,
        /// First answer
        response_1: String,
        /// Second answer
        response_2: String,
        /// Third answer
        response_3: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Load config, command line wins
    let mut config = Config::load().unwrap_or_else(|_| Config::new());
    if cli.url.is_some() {
        config.base_url = cli.url;
    }
    if cli.csrf_token.is_some() {
        config.csrf_token = cli.csrf_token;
    }
    if cli.log_file.is_some() {
        config.log_file = cli.log_file;
    }

    init_logging(&config.log_path()?)?;

    // Scoring does not go through the landing page
    if let Some(Commands::Score {
        query,
        response_1,
        response_2,
        response_3,
    }) = &cli.command
    {
        let client = AskClient::new(config.base_url())?;
        let responses = [response_1.as_str(), response_2.as_str(), response_3.as_str()];
        let scored = score_once(&client, query, responses).await;
        return Ok(exit_code(scored));
    }

    let (client, bindings) = match bind_page(&config).await {
        Ok(bound) => bound,
        Err(e) => {
            // Nothing is interactive without the page hooks
            error!(error = %e, "chat setup failed");
            return Err(e);
        }
    };

    let max_length = bindings
        .max_length
        .or(config.max_length)
        .unwrap_or(DEFAULT_MAX_LENGTH);

    match cli.command {
        Some(Commands::Ask { question }) => Ok(exit_code(ask_once(&client, &question).await)),
        _ => {
            run_tui(client, &bindings, max_length).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_code(succeeded: bool) -> ExitCode {
    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Could not open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();

    Ok(())
}

/// Fetch the landing page and pick up the hooks the widget needs
async fn bind_page(config: &Config) -> Result<(AskClient, PageBindings)> {
    let client = AskClient::new(config.base_url())?;

    let html = client
        .fetch_page()
        .await
        .with_context(|| format!("Could not load {}", client.base_url()))?;
    let bindings = PageBindings::from_html(&html)?;

    let token = config.csrf_token.clone().or_else(|| bindings.csrf_token.clone());
    let client = client.with_csrf_token(token);

    info!(
        url = client.base_url(),
        prompts = bindings.prompt_cards.len(),
        csrf = client.csrf_token().is_some(),
        "page bound"
    );

    Ok((client, bindings))
}

/// Print the answer to one question. Returns false when it failed, after
/// telling the user the same way the chat does.
async fn ask_once(client: &AskClient, question: &str) -> bool {
    let question = question.trim();
    if question.is_empty() {
        return true;
    }

    match client.ask(question).await {
        Ok(answer) => {
            println!("{}", Message::bot(format_response(&answer)).text());
            true
        }
        Err(e) => {
            error!(error = %e, "question failed");
            eprintln!("{}", ERROR_TEXT);
            false
        }
    }
}

async fn score_once(client: &AskClient, query: &str, responses: [&str; 3]) -> bool {
    match client.score(query, responses).await {
        Ok(scoring) => {
            println!("{}", scoring);
            true
        }
        Err(e) => {
            error!(error = %e, "scoring failed");
            eprintln!("Scoring failed: {}", e);
            false
        }
    }
}

async fn run_tui(client: AskClient, bindings: &PageBindings, max_length: usize) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut app = ChatWidget::new(bindings, max_length, client.base_url());
    let mut events = EventHandler::new();

    let result = run_loop(&mut terminal, &mut app, &client, &mut events).await;

    tui::restore()?;
    result
}

async fn run_loop(
    terminal: &mut Tui,
    app: &mut ChatWidget,
    client: &AskClient,
    events: &mut EventHandler,
) -> Result<()> {
    let tx = events.sender();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, client, &tx, event),
            None => break,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_ask_once_reports_failure_without_exiting() {
        let router = Router::new().route(
            "/ask/",
            post(|| async {
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "boom" })),
                )
            }),
        );
        let client = AskClient::new(&spawn_stub(router).await).unwrap();

        assert!(!ask_once(&client, "Can I break my lease?").await);
    }

    #[tokio::test]
    async fn test_ask_once_success_and_blank() {
        let router = Router::new().route(
            "/ask/",
            post(|| async { Json(json!({ "response": "Yes.\n\nSee a lawyer." })) }),
        );
        let client = AskClient::new(&spawn_stub(router).await).unwrap();

        assert!(ask_once(&client, "Can I sublet?").await);
        assert!(ask_once(&client, "   ").await);
    }

    #[tokio::test]
    async fn test_score_once_without_server_fails() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = AskClient::new(&format!("http://{}", addr)).unwrap();
        assert!(!score_once(&client, "q", ["a", "b", "c"]).await);
    }
}
