use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context as _, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pomopair::cli::{Cli, Commands};
use pomopair::core::connection::ConnectionState;
use pomopair::core::engine::Engine;
use pomopair::core::lobby::{LobbyManager, LobbyResult};
use pomopair::core::network::{self, PeerLink};
use pomopair::core::session::Session;
use pomopair::games::instructions::instructions_for;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Some(Commands::Rules { game }) = &cli.command {
        print!("{}", instructions_for(game).plain_text());
        return Ok(());
    }
    let config = cli.config();
    init_tracing(&config.log_file)?;

    let choice = match cli.command {
        Some(Commands::Host) => LobbyResult::Host,
        Some(Commands::Join { code }) => LobbyResult::Join(code),
        Some(Commands::Solo) => LobbyResult::Solo,
        Some(Commands::Rules { .. }) => return Ok(()),
        None => {
            let mut terminal = ratatui::init();
            let choice = LobbyManager::new().run(&mut terminal);
            ratatui::restore();
            choice?
        }
    };

    let mut link = match choice {
        LobbyResult::Quit => return Ok(()),
        LobbyResult::Solo => None,
        LobbyResult::Host => match host().await? {
            Some(link) => Some(link),
            None => return Ok(()),
        },
        LobbyResult::Join(code) => join_with_retry(code, config.connect_timeout).await?,
    };

    let connection = link
        .as_ref()
        .map_or_else(ConnectionState::solo, PeerLink::connection_state);
    let events = link.as_mut().and_then(PeerLink::take_events);
    info!(
        connected = connection.is_connected(),
        host = connection.is_host(),
        "starting session"
    );

    let session = Session::new(config.timer_state(), connection, Instant::now());
    let terminal = ratatui::init();
    let result = Engine::new(session, events).run(terminal).await;
    ratatui::restore();

    if let Some(link) = link {
        link.close().await;
    }
    result
}

fn init_tracing(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

/// Prints the session code and waits for one peer. `None` if aborted.
async fn host() -> Result<Option<PeerLink>> {
    let endpoint = network::bind().await?;
    println!("Your session code: {}", endpoint.id());
    println!("Share it with your friend. Waiting for them to join... (Ctrl-C to cancel)");

    tokio::select! {
        link = network::host(endpoint.clone()) => {
            println!("Peer connected!");
            link.map(Some)
        }
        _ = tokio::signal::ctrl_c() => {
            println!("Cancelled.");
            endpoint.close().await;
            Ok(None)
        }
    }
}

/// Keeps asking until the connection works or the user settles for solo.
async fn join_with_retry(code: String, timeout: Duration) -> Result<Option<PeerLink>> {
    let endpoint = network::bind().await?;
    loop {
        println!("Connecting to session {}...", code.trim());
        let attempt = tokio::time::timeout(timeout, network::join(endpoint.clone(), &code))
            .await
            .unwrap_or_else(|_| Err(anyhow!("timed out after {}s", timeout.as_secs())));
        match attempt {
            Ok(link) => {
                println!("Connected to host!");
                return Ok(Some(link));
            }
            Err(err) => {
                warn!(%err, "join failed");
                println!("Connection failed: {err:#}");
                if !confirm("Retry? [y/N] ").await? {
                    println!("Continuing in solo mode.");
                    endpoint.close().await;
                    return Ok(None);
                }
            }
        }
    }
}

async fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt}");
    std::io::Write::flush(&mut std::io::stdout())?;
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}
