use crate::state::engine::MatchEngine;
use log::debug;
use tokio::time::{MissedTickBehavior, interval, sleep};

/// Live scores on an adaptive timer: fast while matches are in progress, slow otherwise.
/// A resume wakes it early and restarts the timer.
pub struct LivePoller {
    engine: MatchEngine,
}

impl LivePoller {
    pub fn new(engine: MatchEngine) -> Self {
        Self { engine }
    }

    pub async fn run(self) {
        loop {
            self.engine.fetch_live().await;
            let period = self.engine.live_interval().await;

            tokio::select! {
                _ = sleep(period) => {}
                _ = self.engine.resumed() => debug!("live poller resumed early"),
            }
        }
    }
}

/// Upcoming fixtures and recent results on a fixed period.
pub struct HeavyPoller {
    engine: MatchEngine,
}

impl HeavyPoller {
    pub fn new(engine: MatchEngine) -> Self {
        Self { engine }
    }

    pub async fn run(self) {
        let mut ticker = interval(self.engine.settings().heavy_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // First tick completes immediately, so startup fetches right away.
            ticker.tick().await;
            self.engine.fetch_heavy().await;
        }
    }
}
