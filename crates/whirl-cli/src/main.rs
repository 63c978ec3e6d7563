mod view;

use std::io;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

use whirl_client::ClientConfig;
use whirl_client::connection::{self, Input};

use crate::view::{TerminalView, parse_input};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging on stderr, stdout belongs to the chat view
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "whirl=info,whirl_client=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    // Config
    let config = ClientConfig::from_env()?;
    info!("whirl starting, server {} ({} auth)", config.server, config.auth);

    let (input_tx, input_rx) = mpsc::channel(64);
    tokio::spawn(read_stdin(input_tx));

    let mut view = TerminalView::new(io::stdout());
    view.banner(config.auth);
    connection::run(&config, input_rx, &mut view).await;

    info!("whirl stopped");
    Ok(())
}

/// Forward stdin lines until EOF; dropping the sender ends the event loop.
async fn read_stdin(tx: mpsc::Sender<Input>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(parse_input(line)).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!("stdin closed: {}", e);
                break;
            }
        }
    }
}
