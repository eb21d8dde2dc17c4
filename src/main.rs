#[tokio::main]
async fn main() -> deskgpt::error::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("deskgpt=info"),
    )
    .init();
    log::info!("Starting deskgpt v{}", env!("CARGO_PKG_VERSION"));

    match deskgpt::run().await {
        Ok(()) => {
            log::info!("Bot shut down successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Bot encountered an error: {e}");
            Err(e)
        }
    }
}
