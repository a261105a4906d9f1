use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, ChatClient, ChatEvent, ChatView, FileTokenStore, MountOutcome,
    RegistrationForm, Route,
};
use shared::domain::{MessageId, UserProfile};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{broadcast::error::RecvError, mpsc},
};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chat_cli", about = "Terminal client for the group chat service")]
struct Cli {
    /// Overrides `server_url` from client.toml and the environment.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    token_path: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Register {
        username: String,
        full_name: String,
        #[arg(long)]
        password: String,
    },
    Login {
        username: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Shows the profile, or renames it with `--full-name`.
    Profile {
        #[arg(long)]
        full_name: Option<String>,
    },
    Whoami,
    /// Joins the room. Lines from stdin are sent; `/retry` resends a failed
    /// draft and `/quit` leaves.
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(server_url) = cli.server_url {
        settings.server_url = server_url;
    }
    if let Some(token_path) = cli.token_path {
        settings.token_path = token_path;
    }
    debug!(server_url = %settings.server_url, "cli: settings loaded");

    let (route_tx, mut routes) = mpsc::unbounded_channel::<Route>();
    let store = Arc::new(FileTokenStore::new(settings.token_path.clone()));
    let client = ChatClient::new(&settings, store, Arc::new(route_tx))?;

    match cli.command {
        Command::Register {
            username,
            full_name,
            password,
        } => {
            let form = RegistrationForm {
                username,
                full_name,
                password,
            };
            let user = client.accounts.register(&form).await?;
            match user {
                Some(user) => println!("registered and signed in as {}", describe(&user)),
                None => println!("registered and signed in as {}", form.username),
            }
        }
        Command::Login { username, password } => {
            client.accounts.login(&username, &password).await?;
            println!("signed in as {username}");
        }
        Command::Logout => {
            client.accounts.logout().await;
            println!("signed out");
        }
        Command::Profile { full_name } => {
            let profile = match full_name {
                Some(full_name) => client.accounts.update_profile(&full_name).await?,
                None => client.accounts.load_profile().await?,
            };
            print_profile(&profile);
        }
        Command::Whoami => {
            let user = client.accounts.current_user().await?;
            println!("{}", describe(&user));
        }
        Command::Chat => run_chat(&client, &mut routes).await?,
    }

    Ok(())
}

async fn run_chat(
    client: &ChatClient,
    routes: &mut mpsc::UnboundedReceiver<Route>,
) -> Result<()> {
    let view = match client.scheduler.mount().await {
        MountOutcome::Active(view) => view,
        MountOutcome::RedirectedToLogin => {
            eprintln!("not signed in; run `chat_cli login` first");
            return Ok(());
        }
    };
    let mut events = view.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_shown: Option<MessageId> = None;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(ChatEvent::MessagesUpdated { .. }) => {
                    last_shown = print_new_messages(&view, last_shown).await;
                }
                Ok(ChatEvent::UsersUpdated { .. }) => print_online(&view).await,
                Ok(ChatEvent::SendFailed { reason }) => {
                    eprintln!("! not sent: {reason} (/retry to resend)");
                }
                Ok(ChatEvent::DraftChanged) => {}
                Ok(ChatEvent::Closed) | Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "cli: render fell behind view events");
                    last_shown = print_new_messages(&view, last_shown).await;
                }
            },
            route = routes.recv() => match route {
                Some(Route::Login) | None => {
                    eprintln!("session expired; sign in again");
                    break;
                }
                Some(other) => debug!(route = %other, "cli: ignoring navigation"),
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "/quit" => break,
                    "/retry" => send_draft(&view).await,
                    _ => {
                        view.messages().set_draft(line).await;
                        send_draft(&view).await;
                    }
                }
            }
        }
    }

    client.scheduler.unmount().await;
    Ok(())
}

async fn send_draft(view: &ChatView) {
    if let Err(err) = view.messages().send_draft().await {
        warn!(error = %err, "cli: message not sent");
    }
}

async fn print_new_messages(
    view: &ChatView,
    last_shown: Option<MessageId>,
) -> Option<MessageId> {
    let messages = view.messages().snapshot().await;
    for message in messages
        .iter()
        .filter(|message| last_shown.map_or(true, |last| message.id > last))
    {
        println!(
            "[{}] {}: {}",
            message.created_at.format("%H:%M:%S"),
            message.author_name,
            message.text
        );
    }
    messages.iter().map(|message| message.id).max().or(last_shown)
}

async fn print_online(view: &ChatView) {
    let names: Vec<String> = view
        .presence()
        .snapshot()
        .await
        .iter()
        .map(|user| user.display_name().to_string())
        .collect();
    println!("* online ({}): {}", names.len(), names.join(", "));
}

fn describe(user: &UserProfile) -> String {
    format!("{} ({})", user.username, user.full_name)
}

fn print_profile(profile: &UserProfile) {
    println!("username:  {}", profile.username);
    println!("full name: {}", profile.full_name);
    if let Some(created_at) = profile.created_at {
        println!("joined:    {}", created_at.format("%Y-%m-%d"));
    }
    if let Some(last_seen) = profile.last_seen {
        println!("last seen: {}", last_seen.format("%Y-%m-%d %H:%M"));
    }
}
