use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::handle::EventSyncHandle;

/// Start the periodic sync task.
///
/// The first pass runs immediately. In run-once mode the task cancels
/// `shutdown` after that pass, which stops the bot.
pub fn start_scheduler(
    handle: EventSyncHandle,
    period: Duration,
    run_once: bool,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Event sync scheduler stopped");
                    break;
                }
                _ = ticker.tick() => {}
            }

            match handle.run_pass().await {
                Ok(report) => {
                    info!("Scheduled sync done: {}", report);
                    if report.failed() > 0 {
                        warn!("{} event(s) failed to sync", report.failed());
                    }
                }
                Err(e) => error!("Sync pass aborted: {}", e),
            }

            if run_once {
                info!("Run-once mode, shutting down after first pass");
                shutdown.cancel();
                break;
            }
        }
    })
}
