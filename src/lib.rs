pub mod bot;
pub mod command;
pub mod completion;
pub mod config;
pub mod error;
pub mod router;
pub mod transport;

#[cfg(test)]
pub(crate) mod testsupport;

use log::info;

use bot::Bot;
use config::{CONFIG_FILE, Store};
use error::Result;
use transport::console::ConsoleTransport;

/// Load the configuration and run the bot over the console transport until
/// the process is interrupted.
pub async fn run() -> Result<()> {
    let store = Store::new(CONFIG_FILE);
    let config = store.load_or_wait().await;

    let transport = ConsoleTransport::new();
    let mut bot = Bot::new(store, config, transport);

    tokio::select! {
        result = bot.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, shutting down...");
            Ok(())
        }
    }
}
