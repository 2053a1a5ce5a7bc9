// chroma entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, stdout is the conversation)
// 2. Load config
// 3. Open database, register the session user
// 4. Build the aggregator over the HTTP sources
// 5. Read commands from stdin until `quit` or EOF

mod handlers;

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use chroma_core::aggregator::Aggregator;
use chroma_core::config;
use chroma_core::db::Database;

use handlers::{parse_command, Command, Handlers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("chroma starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: timeout={}s, palette cache {}",
        config.sources.timeout_secs,
        if config.aggregator.cache_palettes { "on" } else { "off" }
    );
    if config.credentials.bot_token.is_none() {
        info!("No bot token configured; running the local command loop only");
    }

    // 3. Open database
    if let Some(parent) = std::path::Path::new(&config.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let db = Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    let session = &config.session;
    db.register_user(session.user_id, Some(session.username.as_str()), None)
        .context("failed to register session user")?;
    if let Some(joined) = db.joined_at(session.user_id)? {
        info!("Session user {} ({}) first seen {}", session.user_id, session.username, joined);
    }

    // 4. Build the aggregator
    let aggregator = Aggregator::from_config(&config)?;
    let handlers = Handlers::new(aggregator, Arc::new(db), session.user_id);

    // 5. Command loop
    println!("{}", handlers.handle(&Command::Start).await);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let command = parse_command(&line);
        println!("{}", handlers.handle(&command).await);
        if command == Command::Quit {
            break;
        }
    }

    info!("chroma shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file so replies on stdout stay readable.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("chroma.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chroma_app=info,chroma_core=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
