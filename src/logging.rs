//! Tracing setup and a listener that logs pump events

use crate::message::Message;
use crate::pump::PortListener;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Initialize tracing output
///
/// Call early in main() before any logging occurs.
/// `RUST_LOG` overrides the level chosen by `verbose`.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_file(false)
                .compact(),
        )
        .with(filter)
        .try_init();
}

/// Logs every pump event and remembers whether the port went down
#[derive(Default)]
pub struct LoggingListener {
    disconnected: AtomicBool,
}

impl LoggingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}

impl PortListener for LoggingListener {
    fn disconnected(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
        warn!("Port disconnected");
    }

    fn message_received(&self, msg: &Message) {
        info!("<< {}", msg);
    }

    fn message_sent(&self, msg: &Message) {
        info!(">> {}", msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_listener_tracks_disconnect() {
        let listener = LoggingListener::new();
        listener.message_sent(&Message::new(vec![0x02, 0x60]));
        assert!(!listener.is_disconnected());
        listener.disconnected();
        assert!(listener.is_disconnected());
    }
}
