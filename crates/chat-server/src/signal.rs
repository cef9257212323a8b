//! Ctrl-C handling.
//!
//! The interrupt is turned into an ordinary task that calls
//! [`Broker::terminate`](crate::broker::Broker::terminate). Repeated
//! interrupts while cleanup is running are no-ops.

use tokio::signal;
use tracing::{error, info, warn};

use crate::types::SharedBroker;

pub fn spawn_shutdown_handler(broker: SharedBroker) {
    tokio::spawn(async move {
        loop {
            if let Err(e) = signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl-C");
                return;
            }
            if broker.terminate().await {
                warn!("Ctrl-C received, shutting down");
            } else {
                info!("Ctrl-C received again, shutdown already in progress");
            }
        }
    });
}
