//! Insteon Port - modem monitor
//!
//! Usage:
//!   insteon-port --serial /dev/ttyUSB0            Monitor a serial modem
//!   insteon-port --tcp 192.168.1.30:9761          Monitor a serial-over-IP modem
//!   insteon-port --hub 192.168.1.20 --user U --password P
//!   insteon-port --config port.toml --send 0260   Send a message after connecting

mod cli;

use clap::Parser;
use insteon_port::codec::RawCodec;
use insteon_port::error::{PortError, Result};
use insteon_port::logging::{self, LoggingListener};
use insteon_port::{transport, Message, MessagePump, PumpOptions};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// How often the shutdown wait checks for a disconnect
const DISCONNECT_CHECK_INTERVAL_MS: u64 = 250;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    logging::init_tracing(cli.verbose);

    let config = cli.to_config()?;
    let messages = cli.messages()?;

    // Build the pump outside the runtime: the hub client is a blocking client
    let pump = MessagePump::new(
        transport::create(&config.port)?,
        Box::new(RawCodec::new()),
        PumpOptions::from(&config.pump),
    );
    let listener = Arc::new(LoggingListener::new());
    pump.add_listener(listener.clone());

    info!("Connecting to {}", config.port.describe());
    pump.start()?;

    for data in messages {
        pump.write(Message::new(data));
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| PortError::Runtime { source: e })?;
    rt.block_on(wait_for_shutdown(listener));

    pump.stop();
    let stats = pump.stats();
    info!(
        "Sent {} ({} retransmitted), received {}, dropped {}",
        stats.sent, stats.retransmissions, stats.received, stats.dropped
    );
    Ok(())
}

/// Resolve on Ctrl-C, SIGTERM, or when the port disconnects
async fn wait_for_shutdown(listener: Arc<LoggingListener>) {
    let disconnected = async {
        let mut tick = tokio::time::interval(Duration::from_millis(DISCONNECT_CHECK_INTERVAL_MS));
        loop {
            tick.tick().await;
            if listener.is_disconnected() {
                break;
            }
        }
    };

    #[cfg(unix)]
    {
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(_) => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Interrupted"),
            _ = terminate => info!("Terminated"),
            _ = disconnected => {}
        }
    }

    #[cfg(windows)]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Interrupted"),
            _ = disconnected => {}
        }
    }
}
