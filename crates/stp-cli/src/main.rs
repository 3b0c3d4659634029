//! `stp` — a minimal demo binary exercising the protocol end to end.
//!
//! This binary carries no protocol logic of its own: it wires
//! [`stp_core`]'s public API (`Host`, `Dialer`, `Server`, `Transport`) to a
//! terminal. See `stp-core` for the handshake, transport, and identity
//! machinery.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

use stp_core::{Config, Dialer, Host, Server, Transport};

#[derive(Parser, Debug)]
#[command(name = "stp", version, about = "Signed Transfer Protocol demo chat")]
struct Cli {
    /// Set log level: error,warn,info,debug,trace
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Override the directory holding id.key and known (defaults to the
    /// platform config directory).
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Dial a peer and start chatting once the handshake completes.
    Dial {
        /// Peer address, host:port.
        addr: String,
    },
    /// Listen for peers and chat with each as it connects.
    Serve {
        /// Address to bind, host:port.
        addr: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    fmt()
        .with_env_filter(EnvFilter::new(&cli.log_level))
        .with_target(false)
        .init();

    let mut config = Config::default();
    if let Some(dir) = cli.config_dir {
        config.config_dir = dir;
    }
    config.log_level = cli.log_level.clone();

    let host = Host::load_or_create(&config.identity_path(), &config.known_peers_path())
        .context("failed to load or create local identity")?;

    match cli.cmd {
        Commands::Dial { addr } => {
            let dialer = Dialer::new(host);
            let transport = dialer
                .dial(addr.as_str())
                .await
                .context("handshake with peer failed")?;
            println!("connected; session id: {}", transport.session_id());
            chat(transport).await
        }
        Commands::Serve { addr } => {
            let server = Server::new(host, |transport: Transport| async move {
                println!("peer connected; session id: {}", transport.session_id());
                if let Err(e) = chat(transport).await {
                    tracing::warn!(error = %e, "chat session ended with an error");
                }
                Ok(())
            });
            server
                .listen_and_serve(addr.as_str())
                .await
                .context("server stopped")?;
            Ok(())
        }
    }
}

/// Drive an interactive line-based chat over a ready `Transport`: one task
/// echoes inbound messages to stdout, another forwards stdin lines as
/// outbound messages. The two tasks share only the process's exit: whichever
/// notices the connection has ended (EOF on the socket, or EOF on stdin)
/// ends the session for the caller.
async fn chat(transport: Transport) -> Result<()> {
    let (mut send, mut recv) = transport.into_split();

    let recv_task = tokio::spawn(async move {
        loop {
            match recv.receive::<String>().await {
                Ok((msg, _)) => println!("peer: {msg}"),
                Err(e) => {
                    println!("connection closed: {e}");
                    break;
                }
            }
        }
    });

    let send_task = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Err(e) = send.send(&line).await {
                        println!("send failed: {e}");
                        break;
                    }
                }
                Ok(None) | Err(_) => break,
            }
        }
    });

    tokio::select! {
        _ = recv_task => {}
        _ = send_task => {}
    }
    Ok(())
}
