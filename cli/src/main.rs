mod api;
mod session;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::watch;

use crate::api::{ApiError, ChatApi, HttpChatApi};
use crate::session::{ChatSession, Role, SessionState, SessionView, SubmitError};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("server check failed: {0}")]
    Api(#[from] ApiError),
    #[error("terminal i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("prompt rejected: {0}")]
    Rejected(#[from] SubmitError),
    #[error("{0}")]
    Failed(String),
}

#[derive(Parser, Debug)]
#[command(name = "chatline", about = "Terminal chat client for a chatline server")]
struct Cli {
    #[arg(long, env = "CHATLINE_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[arg(long, help = "Send one prompt, print the reply, and exit")]
    prompt: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the server is up.
    Ping,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let api = HttpChatApi::new(&cli.base_url);

    if let Some(Command::Ping) = cli.command {
        api.ping().await?;
        println!("ok");
        return Ok(());
    }

    let session = Arc::new(ChatSession::new(api));
    match cli.prompt {
        Some(prompt) => run_once(&session, &prompt).await,
        None => run_repl(session).await,
    }
}

async fn run_once<A: ChatApi>(session: &ChatSession<A>, prompt: &str) -> Result<(), CliError> {
    session.submit(prompt).await?;
    let view = session.view();
    if let Some(error) = view.error {
        let cause = session.last_failure().unwrap_or_default();
        return Err(CliError::Failed(format!("{error} ({cause})")));
    }
    if let Some(reply) = last_reply(&view) {
        println!("{reply}");
    }
    Ok(())
}

async fn run_repl<A: ChatApi + 'static>(session: Arc<ChatSession<A>>) -> Result<(), CliError> {
    eprintln!("conversation {}", session.conversation_id());
    eprintln!("commands: /history /id /quit");

    let indicator = tokio::spawn(typing_indicator(session.subscribe()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else { break };

        match line.trim() {
            "/quit" => break,
            "/id" => println!("{}", session.conversation_id()),
            "/history" => print_history(&session.view()),
            _ => match session.submit(&line).await {
                Ok(()) => {
                    let view = session.view();
                    if session.state() == SessionState::ErrorDisplayed {
                        eprintln!("error: {}", view.error.unwrap_or_default());
                        if let Some(cause) = session.last_failure() {
                            eprintln!("  cause: {cause}");
                        }
                    } else if let Some(reply) = last_reply(&view) {
                        println!("{reply}");
                    }
                }
                Err(SubmitError::EmptyPrompt) => {}
                Err(e) => eprintln!("{e}"),
            },
        }
    }

    indicator.abort();
    Ok(())
}

/// Print a status line each time a request starts; stops when the session
/// is dropped.
async fn typing_indicator(mut views: watch::Receiver<SessionView>) {
    let mut was_sending = false;
    while views.changed().await.is_ok() {
        let is_sending = views.borrow_and_update().is_sending;
        if is_sending && !was_sending {
            eprintln!("assistant is typing...");
        }
        was_sending = is_sending;
    }
}

fn last_reply(view: &SessionView) -> Option<&str> {
    view.messages
        .last()
        .filter(|message| message.role == Role::Assistant)
        .map(|message| message.content.as_str())
}

fn print_history(view: &SessionView) {
    for message in &view.messages {
        let who = match message.role {
            Role::User => "you",
            Role::Assistant => "assistant",
        };
        println!("{who}: {}", message.content);
    }
}
