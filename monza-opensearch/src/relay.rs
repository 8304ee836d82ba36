//! Reads newline-delimited JSON events and records them on a destination.

use monza_opensearch_shared::Event;
use monza_opensearch_sink::{CancellationToken, Destination};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, instrument, warn};

use crate::RelayError;

/// Counters for one relay run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Lines read, blank lines excluded.
    pub lines: u64,
    /// Events handed to the destination.
    pub recorded: u64,
    /// Lines that were not a valid event.
    pub skipped: u64,
}

/// Record every event read from `input` until it ends or `ctx` is cancelled.
///
/// Malformed lines are logged and skipped.
///
/// # Returns
///
/// * `Ok(RelayStats)` - Counters for the run
/// * `Err(RelayError::IoError)` - If reading `input` fails
#[instrument(skip_all)]
pub async fn relay<R>(
    destination: &dyn Destination,
    input: R,
    ctx: &CancellationToken,
) -> Result<RelayStats, RelayError>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = RelayStats::default();
    let mut lines = input.lines();

    loop {
        let line = tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                info!("Relay cancelled");
                break;
            }
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            debug!("Input stream ended");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        stats.lines += 1;

        match serde_json::from_str::<Event>(&line) {
            Ok(event) => {
                destination.record(ctx, event).await;
                stats.recorded += 1;
            }
            Err(e) => {
                stats.skipped += 1;
                warn!(line = stats.lines, error = %e, "Skipping malformed event");
            }
        }
    }

    Ok(stats)
}
