use std::sync::Arc;

use caballus_bidding::api::DynAPI;
use caballus_bidding::config::Config;
use caballus_bidding::db::PgStore;
use caballus_bidding::engine::Engine;
use caballus_bidding::error::Error;
use caballus_bidding::events;
use caballus_bidding::server::serve;
use caballus_bidding::watcher::ExpiryWatcher;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(err) = run().await {
        tracing::error!(%err, "shutting down");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Error> {
    let config = Config::from_env()?;

    let store = PgStore::new(&config.database_url, config.max_connections).await?;

    let (sink, receiver) = events::channel(config.event_buffer);

    // stands in for the delivery layer until one is wired up
    tokio::spawn(async move {
        while let Ok(event) = receiver.recv().await {
            tracing::info!(?event, "event");
        }
    });

    let engine = Arc::new(
        Engine::new(store, sink)?
            .with_bidding_window(config.bidding_window)
            .with_market_offset(config.market_offset),
    );

    ExpiryWatcher::new(engine.clone(), config.expiry_sweep_interval).spawn();

    serve(engine as DynAPI, config.listen_addr).await
}
