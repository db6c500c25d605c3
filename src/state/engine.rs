use crate::state::cache::ViewCache;
use crate::state::refresher::{HeavyPoller, LivePoller};
use crate::state::store::MatchStore;
use chrono::{Local, NaiveDate};
use cricket_api::client::CricketApi;
use cricket_api::{DateWindow, Match, MergedView};
use futures_util::future::join_all;
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    /// Live poll period while at least one match is in progress.
    pub live_period: Duration,
    /// Live poll period when nothing is in progress.
    pub idle_period: Duration,
    /// Period of the upcoming + recent results cycle.
    pub heavy_period: Duration,
    pub results_days: u32,
    pub upcoming_days: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            live_period: Duration::from_secs(15),
            idle_period: Duration::from_secs(120),
            heavy_period: Duration::from_secs(300),
            results_days: 30,
            upcoming_days: 14,
        }
    }
}

/// Owns the match buckets and everything that writes to them. Clones share state.
#[derive(Clone)]
pub struct MatchEngine {
    inner: Arc<Inner>,
}

struct Inner {
    api: CricketApi,
    store: Mutex<MatchStore>,
    cache: ViewCache,
    view: watch::Sender<Arc<MergedView>>,
    settings: EngineSettings,
    epoch: AtomicU64,
    /// Most extra result windows requested so far; widens the rehydrate horizon.
    history_windows: AtomicU32,
    resume: Notify,
    pollers: Mutex<Vec<JoinHandle<()>>>,
}

impl MatchEngine {
    pub fn new(api: CricketApi, cache: ViewCache, settings: EngineSettings) -> Self {
        let (view, _) = watch::channel(Arc::new(MergedView::default()));
        Self {
            inner: Arc::new(Inner {
                api,
                store: Mutex::new(MatchStore::default()),
                cache,
                view,
                settings,
                epoch: AtomicU64::new(0),
                history_windows: AtomicU32::new(0),
                resume: Notify::new(),
                pollers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn api(&self) -> &CricketApi {
        &self.inner.api
    }

    pub fn current_view(&self) -> Arc<MergedView> {
        self.inner.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<MergedView>> {
        self.inner.view.subscribe()
    }

    /// Seed empty buckets from the cache and publish right away. Completed matches
    /// older than the loaded result windows are left behind. Returns the number of
    /// cached entries restored.
    pub async fn rehydrate(&self) -> usize {
        let cached = self.inner.cache.load();
        let mut store = self.inner.store.lock().await;
        if !store.is_empty() || cached.is_empty() {
            return 0;
        }
        let total = cached.len();
        let dropped = store.rehydrate(cached, self.results_horizon(today()));
        let view = store.recompute();
        self.inner.view.send_replace(Arc::new(view));
        let restored = total - dropped;
        info!("restored {restored} cached matches, {dropped} expired results dropped");
        restored
    }

    /// First day covered by the default results window plus any extended ones.
    fn results_horizon(&self, today: NaiveDate) -> NaiveDate {
        let windows = self.inner.history_windows.load(Ordering::SeqCst);
        DateWindow::trailing(today, windows, self.inner.settings.results_days).from
    }

    /// Rehydrate, then spawn the live and heavy pollers. Both fetch on their first tick.
    pub async fn start(&self) {
        self.rehydrate().await;

        let mut pollers = self.inner.pollers.lock().await;
        for handle in pollers.drain(..) {
            handle.abort();
        }
        pollers.push(tokio::spawn(LivePoller::new(self.clone()).run()));
        pollers.push(tokio::spawn(HeavyPoller::new(self.clone()).run()));
        debug!("pollers started at epoch {}", self.epoch());
    }

    /// Abort the pollers. Fetches already in flight finish but their results are dropped.
    pub async fn stop(&self) {
        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let mut pollers = self.inner.pollers.lock().await;
        for handle in pollers.drain(..) {
            handle.abort();
        }
        debug!("pollers stopped, epoch now {epoch}");
    }

    /// Wake the live poller: fetch now and restart the adaptive timer.
    pub fn resume(&self) {
        self.inner.resume.notify_one();
    }

    pub(crate) async fn resumed(&self) {
        self.inner.resume.notified().await;
    }

    pub(crate) fn settings(&self) -> EngineSettings {
        self.inner.settings
    }

    pub async fn live_interval(&self) -> Duration {
        let live = self.inner.store.lock().await.live_count();
        if live > 0 {
            self.inner.settings.live_period
        } else {
            self.inner.settings.idle_period
        }
    }

    pub async fn fetch_live(&self) {
        let epoch = self.epoch();
        match self.inner.api.fetch_live().await {
            Ok(matches) => {
                debug!("live bucket: {} matches", matches.len());
                self.apply(epoch, |store| store.replace_live(matches)).await;
            }
            Err(e) => warn!("live fetch failed, keeping previous bucket: {e}"),
        }
    }

    /// Upcoming and recent results, concurrently. Each lands as soon as it resolves.
    pub async fn fetch_heavy(&self) {
        let epoch = self.epoch();
        let today = today();
        let settings = self.inner.settings;

        let upcoming = async {
            let window = DateWindow::forward(today, settings.upcoming_days);
            match self.inner.api.fetch_upcoming(window).await {
                Ok(matches) => {
                    debug!("upcoming bucket: {} matches", matches.len());
                    self.apply(epoch, |store| store.replace_upcoming(matches)).await;
                }
                Err(e) => warn!("upcoming fetch failed, keeping previous bucket: {e}"),
            }
        };

        let results = async {
            let window = DateWindow::trailing(today, 0, settings.results_days);
            self.merge_results_window(epoch, window).await;
        };

        tokio::join!(upcoming, results);
    }

    /// Fetch trailing windows `1..=window_count` and upsert them into the completed
    /// bucket. Returns the whole completed bucket afterwards.
    pub async fn fetch_extended_results(&self, window_count: u32) -> Vec<Match> {
        let epoch = self.epoch();
        let today = today();
        let days = self.inner.settings.results_days;
        self.inner.history_windows.fetch_max(window_count, Ordering::SeqCst);

        join_all(
            (1..=window_count)
                .map(|index| self.merge_results_window(epoch, DateWindow::trailing(today, index, days))),
        )
        .await;

        self.inner.store.lock().await.completed()
    }

    async fn merge_results_window(&self, epoch: u64, window: DateWindow) {
        match self.inner.api.fetch_results(window).await {
            Ok(matches) => {
                let fetched = matches.len();
                let mut added = 0;
                self.apply(epoch, |store| added = store.merge_completed(matches)).await;
                debug!("results {}: {fetched} matches, {added} new", window.query_value());
            }
            Err(e) => warn!("results fetch for {} failed: {e}", window.query_value()),
        }
    }

    fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    /// Mutate the buckets, recompute, publish and persist. Results issued under an
    /// older epoch are discarded. The cache file is written after the buckets unlock.
    pub(crate) async fn apply(&self, epoch: u64, mutate: impl FnOnce(&mut MatchStore)) -> bool {
        let pending = {
            let mut store = self.inner.store.lock().await;
            if epoch != self.epoch() {
                debug!("discarding result from stale epoch {epoch}");
                return false;
            }
            mutate(&mut store);
            let view = store.recompute();
            let pending = self.inner.cache.stage(&view);
            self.inner.view.send_replace(Arc::new(view));
            pending
        };
        if let Some(pending) = pending {
            self.inner.cache.commit(pending);
        }
        true
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::cache::KeyValueStore;
    use crate::state::cache::cache_key;
    use crate::state::cache::tests::{MemoryStore, view_of};
    use chrono::{TimeDelta, Utc};
    use cricket_api::client::ApiEndpoints;
    use cricket_api::{Bucket, EventState, ViewEntry};
    use mockito::Matcher;
    use std::io::{self, Write};
    use std::sync::atomic::AtomicBool;

    fn matches_body(ids: &[&str], state: &str) -> String {
        let items: Vec<String> = ids
            .iter()
            .map(|id| format!(r#"{{"gameId":"{id}","eventState":"{state}"}}"#))
            .collect();
        format!(r#"{{"matches":[{}]}}"#, items.join(","))
    }

    fn engine_for(server: &mockito::Server, store: Arc<MemoryStore>, settings: EngineSettings) -> MatchEngine {
        let api = CricketApi::new(ApiEndpoints {
            feed_url: format!("{}/feed", server.url()),
            scorecard_url: format!("{}/scorecard", server.url()),
            client_id: "test-client".into(),
            proxy_url: None,
            bypass_proxy_cache: false,
        })
        .with_retry_backoff(Duration::from_millis(1));
        MatchEngine::new(api, ViewCache::new(store), settings)
    }

    fn live_query() -> Matcher {
        Matcher::UrlEncoded("gamestate".into(), "1".into())
    }

    fn results_query(index: u32) -> Matcher {
        let window = DateWindow::trailing(today(), index, EngineSettings::default().results_days);
        Matcher::UrlEncoded("daterange".into(), window.query_value())
    }

    /// Response body that flags `started` when the request lands, then holds the
    /// body back for `delay`.
    fn delayed_body(
        body: String,
        delay: Duration,
        started: Arc<AtomicBool>,
    ) -> impl Fn(&mut dyn io::Write) -> io::Result<()> + Send + Sync + 'static {
        move |w: &mut dyn io::Write| {
            started.store(true, Ordering::SeqCst);
            std::thread::sleep(delay);
            w.write_all(body.as_bytes())
        }
    }

    fn ids(view: &MergedView, bucket: Bucket) -> Vec<String> {
        let mut ids: Vec<String> = view.from_bucket(bucket).map(|m| m.game_id.clone()).collect();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn failed_fetch_leaves_bucket_unchanged() {
        let mut server = mockito::Server::new_async().await;
        let engine = engine_for(&server, Arc::default(), EngineSettings::default());

        let ok = server
            .mock("GET", "/feed")
            .match_query(live_query())
            .with_body(matches_body(&["a", "b"], "L"))
            .create_async()
            .await;
        engine.fetch_live().await;
        ok.remove_async().await;

        let failing = server
            .mock("GET", "/feed")
            .match_query(live_query())
            .with_status(503)
            .expect(2)
            .create_async()
            .await;
        engine.fetch_live().await;
        failing.assert_async().await;

        assert_eq!(ids(&engine.current_view(), Bucket::Live), ["a", "b"]);
    }

    #[tokio::test]
    async fn client_error_does_not_wipe_bucket() {
        let mut server = mockito::Server::new_async().await;
        let engine = engine_for(&server, Arc::default(), EngineSettings::default());

        let ok = server
            .mock("GET", "/feed")
            .match_query(live_query())
            .with_body(matches_body(&["a"], "L"))
            .create_async()
            .await;
        engine.fetch_live().await;
        ok.remove_async().await;

        server
            .mock("GET", "/feed")
            .match_query(live_query())
            .with_status(404)
            .create_async()
            .await;
        engine.fetch_live().await;

        assert_eq!(engine.current_view().len(), 1);
    }

    #[tokio::test]
    async fn cached_view_is_superseded_bucket_by_bucket() {
        let mut server = mockito::Server::new_async().await;
        let store = Arc::new(MemoryStore::default());
        let cached = view_of(&[
            ("c1", Bucket::Completed),
            ("c2", Bucket::Completed),
            ("u1", Bucket::Upcoming),
            ("old1", Bucket::Live),
            ("old2", Bucket::Live),
        ]);
        store.set(&cache_key(), &serde_json::to_string(&cached).unwrap()).unwrap();

        let engine = engine_for(&server, store.clone(), EngineSettings::default());
        assert_eq!(engine.rehydrate().await, 5);
        assert_eq!(*engine.current_view(), cached);

        server
            .mock("GET", "/feed")
            .match_query(live_query())
            .with_body(matches_body(&["new1", "new2"], "L"))
            .create_async()
            .await;
        engine.fetch_live().await;

        let view = engine.current_view();
        assert_eq!(ids(&view, Bucket::Live), ["new1", "new2"]);
        assert_eq!(ids(&view, Bucket::Upcoming), ["u1"]);
        assert_eq!(ids(&view, Bucket::Completed), ["c1", "c2"]);
        assert_eq!(view.len(), 5);

        let persisted: MergedView =
            serde_json::from_str(&store.get(&cache_key()).unwrap().unwrap()).unwrap();
        assert_eq!(persisted, *view);
    }

    #[tokio::test]
    async fn rehydrate_skips_when_buckets_already_populated() {
        let mut server = mockito::Server::new_async().await;
        let store = Arc::new(MemoryStore::default());
        let engine = engine_for(&server, store.clone(), EngineSettings::default());

        server
            .mock("GET", "/feed")
            .match_query(live_query())
            .with_body(matches_body(&["a"], "L"))
            .create_async()
            .await;
        engine.fetch_live().await;

        let other = view_of(&[("zzz", Bucket::Completed)]);
        store.set(&cache_key(), &serde_json::to_string(&other).unwrap()).unwrap();
        assert_eq!(engine.rehydrate().await, 0);
        assert!(engine.current_view().find("zzz").is_none());
    }

    #[tokio::test]
    async fn heavy_cycle_fills_upcoming_and_completed() {
        let mut server = mockito::Server::new_async().await;
        let engine = engine_for(&server, Arc::default(), EngineSettings::default());

        let upcoming = server
            .mock("GET", "/feed")
            .match_query(Matcher::UrlEncoded("gamestate".into(), "2".into()))
            .with_body(matches_body(&["u1", "shared"], "U"))
            .create_async()
            .await;
        let results = server
            .mock("GET", "/feed")
            .match_query(results_query(0))
            .with_body(matches_body(&["r1", "shared"], "R"))
            .create_async()
            .await;

        engine.fetch_heavy().await;
        upcoming.assert_async().await;
        results.assert_async().await;

        let view = engine.current_view();
        assert_eq!(view.len(), 3);
        assert_eq!(ids(&view, Bucket::Upcoming), ["shared", "u1"]);
        assert_eq!(ids(&view, Bucket::Completed), ["r1"]);
    }

    #[tokio::test]
    async fn heavy_cycle_applies_each_half_independently() {
        let mut server = mockito::Server::new_async().await;
        let engine = engine_for(&server, Arc::default(), EngineSettings::default());

        server
            .mock("GET", "/feed")
            .match_query(Matcher::UrlEncoded("gamestate".into(), "2".into()))
            .with_status(500)
            .expect(2)
            .create_async()
            .await;
        server
            .mock("GET", "/feed")
            .match_query(results_query(0))
            .with_body(matches_body(&["r1"], "R"))
            .create_async()
            .await;

        engine.fetch_heavy().await;
        assert_eq!(ids(&engine.current_view(), Bucket::Completed), ["r1"]);
    }

    #[tokio::test]
    async fn slow_results_do_not_hold_back_upcoming() {
        let mut server = mockito::Server::new_async().await;
        let engine = engine_for(&server, Arc::default(), EngineSettings::default());
        let mut rx = engine.subscribe();

        server
            .mock("GET", "/feed")
            .match_query(Matcher::UrlEncoded("gamestate".into(), "2".into()))
            .with_body(matches_body(&["u1"], "U"))
            .create_async()
            .await;
        server
            .mock("GET", "/feed")
            .match_query(results_query(0))
            .with_chunked_body(delayed_body(
                matches_body(&["r1"], "R"),
                Duration::from_millis(500),
                Arc::default(),
            ))
            .create_async()
            .await;

        let heavy = tokio::spawn({
            let engine = engine.clone();
            async move { engine.fetch_heavy().await }
        });

        let first = rx.wait_for(|v| !v.is_empty()).await.unwrap().clone();
        assert_eq!(ids(&first, Bucket::Upcoming), ["u1"]);
        assert!(ids(&first, Bucket::Completed).is_empty());

        heavy.await.unwrap();
        let view = engine.current_view();
        assert_eq!(ids(&view, Bucket::Upcoming), ["u1"]);
        assert_eq!(ids(&view, Bucket::Completed), ["r1"]);
    }

    #[tokio::test]
    async fn overlapping_live_fetches_keep_the_last_to_complete() {
        let mut server = mockito::Server::new_async().await;
        let engine = engine_for(&server, Arc::default(), EngineSettings::default());
        let mut rx = engine.subscribe();
        let slow_started = Arc::new(AtomicBool::new(false));

        server
            .mock("GET", "/feed")
            .match_query(live_query())
            .with_chunked_body(delayed_body(
                matches_body(&["slow"], "L"),
                Duration::from_millis(500),
                slow_started.clone(),
            ))
            .create_async()
            .await;
        server
            .mock("GET", "/feed")
            .match_query(live_query())
            .with_body(matches_body(&["fast"], "L"))
            .create_async()
            .await;

        let slow = tokio::spawn({
            let engine = engine.clone();
            async move { engine.fetch_live().await }
        });
        tokio::time::timeout(Duration::from_secs(5), async {
            while !slow_started.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("first request reached the server");

        engine.fetch_live().await;
        let first = rx.borrow_and_update().clone();
        assert_eq!(ids(&first, Bucket::Live), ["fast"]);

        slow.await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(ids(&engine.current_view(), Bucket::Live), ["slow"]);
    }

    #[tokio::test]
    async fn expired_results_are_not_carried_over_from_the_cache() {
        let mut server = mockito::Server::new_async().await;
        let store = Arc::new(MemoryStore::default());
        let now = Utc::now();
        let finished = |id: &str, days_ago: i64| ViewEntry {
            source: Bucket::Completed,
            game: Match {
                game_id: id.into(),
                event_state: EventState::Result,
                end_date: Some(now - TimeDelta::days(days_ago)),
                ..Default::default()
            },
        };
        let cached = MergedView { entries: vec![finished("ancient", 700), finished("recent", 3)] };
        store.set(&cache_key(), &serde_json::to_string(&cached).unwrap()).unwrap();

        let engine = engine_for(&server, store.clone(), EngineSettings::default());
        assert_eq!(engine.rehydrate().await, 1);
        assert!(engine.current_view().find("ancient").is_none());

        server
            .mock("GET", "/feed")
            .match_query(Matcher::UrlEncoded("gamestate".into(), "2".into()))
            .with_body(r#"{"matches":[]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/feed")
            .match_query(results_query(0))
            .with_body(matches_body(&["fresh"], "R"))
            .create_async()
            .await;
        engine.fetch_heavy().await;

        let persisted: MergedView =
            serde_json::from_str(&store.get(&cache_key()).unwrap().unwrap()).unwrap();
        assert_eq!(ids(&persisted, Bucket::Completed), ["fresh", "recent"]);
    }

    #[tokio::test]
    async fn extended_history_widens_the_rehydrate_horizon() {
        let mut server = mockito::Server::new_async().await;
        let engine = engine_for(&server, Arc::default(), EngineSettings::default());
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(engine.results_horizon(day), day - TimeDelta::days(30));

        server
            .mock("GET", "/feed")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;
        engine.fetch_extended_results(2).await;
        assert_eq!(engine.results_horizon(day), day - TimeDelta::days(90));
    }

    #[tokio::test]
    async fn extended_history_only_grows() {
        let mut server = mockito::Server::new_async().await;
        let engine = engine_for(&server, Arc::default(), EngineSettings::default());

        let first = server
            .mock("GET", "/feed")
            .match_query(results_query(1))
            .with_body(matches_body(&["r1", "r2"], "R"))
            .create_async()
            .await;
        let completed = engine.fetch_extended_results(1).await;
        assert_eq!(completed.len(), 2);
        first.remove_async().await;

        server
            .mock("GET", "/feed")
            .match_query(results_query(1))
            .with_body(matches_body(&["r3"], "R"))
            .create_async()
            .await;
        server
            .mock("GET", "/feed")
            .match_query(results_query(2))
            .with_status(404)
            .create_async()
            .await;

        let completed = engine.fetch_extended_results(2).await;
        let mut got: Vec<&str> = completed.iter().map(|m| m.game_id.as_str()).collect();
        got.sort();
        assert_eq!(got, ["r1", "r2", "r3"]);
    }

    #[tokio::test]
    async fn interval_adapts_to_live_bucket() {
        let mut server = mockito::Server::new_async().await;
        let settings = EngineSettings::default();
        let engine = engine_for(&server, Arc::default(), settings);
        assert_eq!(engine.live_interval().await, settings.idle_period);

        let busy = server
            .mock("GET", "/feed")
            .match_query(live_query())
            .with_body(matches_body(&["a"], "L"))
            .create_async()
            .await;
        engine.fetch_live().await;
        assert_eq!(engine.live_interval().await, settings.live_period);
        busy.remove_async().await;

        server
            .mock("GET", "/feed")
            .match_query(live_query())
            .with_body(r#"{"matches":[]}"#)
            .create_async()
            .await;
        engine.fetch_live().await;
        assert_eq!(engine.live_interval().await, settings.idle_period);
    }

    #[tokio::test]
    async fn results_from_a_stale_epoch_are_dropped() {
        let server = mockito::Server::new_async().await;
        let engine = engine_for(&server, Arc::default(), EngineSettings::default());

        let issued_at = engine.epoch();
        engine.stop().await;

        let game = Match { game_id: "late".into(), ..Default::default() };
        let applied = engine.apply(issued_at, |store| store.replace_live(vec![game])).await;

        assert!(!applied);
        assert!(engine.current_view().is_empty());
        assert!(engine.apply(engine.epoch(), |_| {}).await);
    }

    #[tokio::test]
    async fn subscribers_see_published_views() {
        let mut server = mockito::Server::new_async().await;
        let engine = engine_for(&server, Arc::default(), EngineSettings::default());
        let mut rx = engine.subscribe();

        server
            .mock("GET", "/feed")
            .match_query(live_query())
            .with_body(matches_body(&["a"], "L"))
            .create_async()
            .await;
        engine.fetch_live().await;

        rx.changed().await.unwrap();
        assert!(rx.borrow().find("a").is_some());
    }

    #[tokio::test]
    async fn resume_triggers_an_immediate_live_fetch() {
        let mut server = mockito::Server::new_async().await;
        let settings = EngineSettings {
            live_period: Duration::from_secs(600),
            idle_period: Duration::from_secs(600),
            heavy_period: Duration::from_secs(600),
            ..Default::default()
        };
        let engine = engine_for(&server, Arc::default(), settings);
        let mut rx = engine.subscribe();

        let first = server
            .mock("GET", "/feed")
            .match_query(live_query())
            .with_body(matches_body(&["a"], "L"))
            .create_async()
            .await;

        engine.start().await;
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|v| v.find("a").is_some()))
            .await
            .expect("first live tick")
            .unwrap();
        first.remove_async().await;

        server
            .mock("GET", "/feed")
            .match_query(live_query())
            .with_body(matches_body(&["b"], "L"))
            .create_async()
            .await;

        engine.resume();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|v| v.find("b").is_some()))
            .await
            .expect("resume fetch")
            .unwrap();

        engine.stop().await;
        assert!(engine.inner.pollers.lock().await.is_empty());
    }
}
