//! Periodic refresh task, independent of any rendering loop.

use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::controller::{AppController, RefreshOutcome};

/// Handle to a running refresh schedule. Dropping it does not stop the task; call [`stop`](Self::stop).
#[derive(Debug)]
pub struct RefreshScheduler {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl RefreshScheduler {
    /// Refresh `controller` every `interval`, starting one interval from now.
    pub fn spawn(controller: Arc<AppController>, interval: Duration) -> Self {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(controller, interval, cancel.clone()));
        Self { cancel, handle }
    }

    /// Stop the schedule, cancelling a refresh it is currently running.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(err) = self.handle.await {
            tracing::warn!(error = %err, "refresh scheduler task failed");
        }
    }
}

async fn run(controller: Arc<AppController>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::info!(interval_secs = interval.as_secs(), "refresh scheduler started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            result = controller.scheduled_refresh() => match result {
                Ok(RefreshOutcome::Applied) => tracing::debug!("scheduled refresh applied"),
                Ok(outcome) => tracing::debug!(?outcome, "scheduled refresh not applied"),
                // Already reported to subscribers by the controller.
                Err(err) => tracing::debug!(error = %err, "scheduled refresh failed"),
            },
        }
    }

    tracing::info!("refresh scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::testing::{FakeProvider, Script, location};
    use crate::controller::Phase;
    use rand::{SeedableRng, rngs::StdRng};

    const HOUR: Duration = Duration::from_secs(60 * 60);

    fn setup(script: Script) -> (Arc<FakeProvider>, Arc<AppController>) {
        let provider = Arc::new(FakeProvider::default().with("Oslo", script));
        let controller = Arc::new(AppController::with_rng(
            Arc::clone(&provider) as Arc<dyn crate::WeatherProvider>,
            StdRng::seed_from_u64(3),
        ));
        (provider, controller)
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_once_per_interval() {
        let (provider, controller) = setup(Script::weather("Clear", "01d", 20.0));
        controller.change_location(location("Oslo")).await.expect("initial refresh");

        let scheduler = RefreshScheduler::spawn(Arc::clone(&controller), HOUR);
        tokio::time::sleep(HOUR * 2 + Duration::from_secs(60)).await;
        scheduler.stop().await;

        assert_eq!(provider.calls(), 3);
        assert_eq!(controller.phase(), Phase::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn no_refresh_after_stop() {
        let (provider, controller) = setup(Script::weather("Clear", "01d", 20.0));
        controller.change_location(location("Oslo")).await.expect("initial refresh");

        let scheduler = RefreshScheduler::spawn(Arc::clone(&controller), HOUR);
        scheduler.stop().await;
        tokio::time::sleep(HOUR * 3).await;

        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_mid_refresh_leaves_last_state() {
        let (provider, controller) =
            setup(Script::weather("Clear", "01d", 20.0).delayed(Duration::from_secs(30)));
        controller.change_location(location("Oslo")).await.expect("initial refresh");
        let before = controller.display_state().expect("state");

        let scheduler = RefreshScheduler::spawn(Arc::clone(&controller), HOUR);
        // Lands inside the scheduled refresh's 30 second request.
        tokio::time::sleep(HOUR + Duration::from_secs(10)).await;
        assert_eq!(controller.phase(), Phase::Loading);
        scheduler.stop().await;

        assert_eq!(provider.calls(), 2);
        assert_eq!(controller.phase(), Phase::Ready);
        let after = controller.display_state().expect("state kept");
        assert!(Arc::ptr_eq(&before, &after));
    }
}
