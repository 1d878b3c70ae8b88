//! Periodic sweep that inactivates idle accounts.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::account_ledger::AccountLedger;

/// Run the stale-account sweep every `interval` until the task is aborted.
///
/// The first pass runs immediately. A failed pass is logged and retried
/// on the next tick.
async fn sweep_task(
    ledger: Arc<AccountLedger>,
    interval: Duration,
    stale_after: chrono::Duration,
) {
    let mut sweep_interval = tokio::time::interval(interval);
    sweep_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        sweep_interval.tick().await;

        match ledger.inactivate_stale_accounts(stale_after).await {
            Ok(inactivated) if inactivated.is_empty() => {
                tracing::debug!("Inactivation sweep found no stale accounts");
            }
            Ok(inactivated) => {
                tracing::info!(count = inactivated.len(), "Inactivation sweep completed");
            }
            Err(e) => {
                tracing::error!(error = %e, "Inactivation sweep failed");
            }
        }
    }
}

pub fn spawn_inactivation_sweep(
    ledger: Arc<AccountLedger>,
    interval: Duration,
    stale_after: chrono::Duration,
) -> JoinHandle<()> {
    tracing::info!(
        interval_secs = interval.as_secs(),
        stale_after_secs = stale_after.num_seconds(),
        "Starting inactivation sweep"
    );
    tokio::spawn(sweep_task(ledger, interval, stale_after))
}
