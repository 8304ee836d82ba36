use std::env;

use dotenv::dotenv;
use monza_opensearch::{relay, Dependencies, RelayError};
use monza_opensearch_sink::{CancellationToken, Destination};
use tokio::io::BufReader;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    dotenv().ok();

    init_tracing();

    let Dependencies { destination } = Dependencies::from_env()?;
    let ctx = CancellationToken::new();

    destination.setup(&ctx).await?;

    let signal_ctx = ctx.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                signal_ctx.cancel();
            }
            Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
        }
    });

    let stdin = BufReader::new(tokio::io::stdin());
    let stats = relay(&destination, stdin, &ctx).await;

    // Teardown gets a fresh token so an interrupt still drains what was recorded.
    destination.teardown(&CancellationToken::new()).await;

    let stats = stats?;
    if stats.skipped > 0 {
        warn!(skipped = stats.skipped, "Some input lines were not valid events");
    }
    info!(
        lines = stats.lines,
        recorded = stats.recorded,
        sink = ?destination.stats(),
        "Relay shutting down"
    );

    Ok(())
}

fn init_tracing() {
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    );

    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true).json())
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }

    info!(
        service_name = "monza-opensearch",
        service_version = env!("CARGO_PKG_VERSION"),
        json = json,
        "Tracing initialized"
    );
}
