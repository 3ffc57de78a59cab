use clap::{Parser, Subcommand};
use lib::api::{ApiClient, ApiError};
use lib::session::SessionIdStore;

#[derive(Parser)]
#[command(name = "kgchat")]
#[command(about = "KG Chat CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: KGCHAT_CONFIG_PATH or ~/.kgchat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Chat with the knowledge-base assistant (interactive). Continues the
    /// persisted session unless --new or --session is given.
    Chat {
        /// Config file path (default: KGCHAT_CONFIG_PATH or ~/.kgchat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Existing session id to continue.
        #[arg(long, value_name = "ID")]
        session: Option<String>,

        /// Start a fresh session (clears the persisted session id).
        #[arg(long)]
        new: bool,

        /// Answer from the knowledge base only (disable general LLM responses).
        #[arg(long)]
        kb_only: bool,
    },

    /// List past sessions with previews and recency.
    Sessions {
        /// Config file path (default: KGCHAT_CONFIG_PATH or ~/.kgchat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Delete a session (asks for confirmation unless --yes).
    Delete {
        /// Config file path (default: KGCHAT_CONFIG_PATH or ~/.kgchat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Session id to delete.
        #[arg(value_name = "ID")]
        id: String,

        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },

    /// Check backend health.
    Health {
        /// Config file path (default: KGCHAT_CONFIG_PATH or ~/.kgchat/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("kgchat {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat {
            config,
            session,
            new,
            kb_only,
        }) => {
            if let Err(e) = run_chat(config, session, new, kb_only).await {
                log::error!("chat failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Sessions { config }) => {
            if let Err(e) = run_sessions(config).await {
                log::error!("sessions failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Delete { config, id, yes }) => {
            if let Err(e) = run_delete(config, id, yes).await {
                log::error!("delete failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Health { config }) => {
            if let Err(e) = run_health(config).await {
                log::error!("health failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

/// Build the API client and session store from the config file.
fn open_client(
    config_path: Option<std::path::PathBuf>,
) -> anyhow::Result<(lib::config::Config, ApiClient, SessionIdStore)> {
    let (config, path) = lib::config::load_config(config_path)?;
    let base = lib::config::resolve_base_url(&config);
    let client = ApiClient::new(Some(base));
    let store = SessionIdStore::new(lib::config::session_id_path(&path));
    Ok((config, client, store))
}

fn print_reply(reply: &lib::api::ChatReply) {
    println!("< {}", reply.reply.trim());
    if let Some(badge) = lib::format::source_badge(reply.source) {
        println!("  [{}]", badge);
    }
}

async fn run_chat(
    config_path: Option<std::path::PathBuf>,
    session: Option<String>,
    new: bool,
    kb_only: bool,
) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let (config, client, store) = open_client(config_path)?;
    let mut enable_llm = if kb_only { false } else { config.chat.enable_llm };

    let mut current_session = if new {
        store.set_current(None)?;
        None
    } else {
        session.or_else(|| store.current())
    };

    // Restore the transcript for a resumed session before prompting.
    if let Some(ref id) = current_session {
        match client.session_messages(id).await {
            Ok(messages) => {
                for m in &messages {
                    match m.role.as_str() {
                        "user" => println!("> {}", m.content),
                        _ => {
                            println!("< {}", m.content.trim());
                            if let Some(badge) = m.source.and_then(lib::format::source_badge) {
                                println!("  [{}]", badge);
                            }
                        }
                    }
                }
            }
            Err(e) => {
                // Keep the session id; the backend may just be briefly down.
                log::warn!("could not load history for {}: {}", id, e);
            }
        }
    }

    println!(
        "mode: {} (/llm on|off to change, /help for commands)",
        if enable_llm { "AI-enhanced" } else { "KB only" }
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }
        if input.eq_ignore_ascii_case("/new") {
            current_session = None;
            store.set_current(None)?;
            println!("started a new conversation");
            continue;
        }
        if input.eq_ignore_ascii_case("/llm on") {
            enable_llm = true;
            println!("mode: AI-enhanced");
            continue;
        }
        if input.eq_ignore_ascii_case("/llm off") {
            enable_llm = false;
            println!("mode: KB only");
            continue;
        }
        if input.eq_ignore_ascii_case("/help") {
            println!("/new        start a new conversation");
            println!("/llm on|off enable or disable general LLM responses");
            println!("/exit       quit");
            continue;
        }

        match client
            .send_message(current_session.as_deref(), input, enable_llm)
            .await
        {
            Ok(reply) => {
                print_reply(&reply);
                if current_session.as_deref() != Some(reply.session_id.as_str()) {
                    store.set_current(Some(&reply.session_id))?;
                    current_session = Some(reply.session_id);
                }
            }
            Err(e) => {
                eprintln!("chat error: {}", e);
            }
        }
    }

    Ok(())
}

async fn run_sessions(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let (_, client, store) = open_client(config_path)?;
    let sessions = client.list_sessions().await?;
    if sessions.is_empty() {
        println!("No conversations yet");
        return Ok(());
    }
    let now = chrono::Utc::now();
    let current = store.current();
    for s in &sessions {
        let marker = if current.as_deref() == Some(s.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{} {}  {}  {} ({} messages)",
            marker,
            s.id,
            lib::format::session_preview(s),
            lib::format::recency_label(s.last_active, now),
            s.messages.len()
        );
    }
    Ok(())
}

async fn run_delete(
    config_path: Option<std::path::PathBuf>,
    id: String,
    yes: bool,
) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let (_, client, store) = open_client(config_path)?;

    if !yes {
        print!("Delete conversation {}? This action cannot be undone. [y/N] ", id);
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        let answer = line.trim();
        if !(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")) {
            println!("aborted");
            return Ok(());
        }
    }

    match client.delete_session(&id).await {
        Ok(()) => {
            if store.current().as_deref() == Some(id.as_str()) {
                store.set_current(None)?;
            }
            println!("deleted {}", id);
            Ok(())
        }
        Err(ApiError::EndpointMissing(_)) => {
            anyhow::bail!("delete endpoint not available; ensure the backend is updated and deployed")
        }
        Err(e) => anyhow::bail!("failed to delete session: {}", e),
    }
}

async fn run_health(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let (_, client, _) = open_client(config_path)?;
    match client.health().await {
        Ok(h) => {
            println!("status: {}", h.status);
            if let Some(db) = h.database {
                println!("database: {}", db);
            }
            if let Some(err) = h.error {
                println!("error: {}", err);
            }
            Ok(())
        }
        Err(e) => anyhow::bail!("backend unreachable at {}: {}", client.base_url(), e),
    }
}
