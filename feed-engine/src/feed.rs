//! Mounted feed: wiring of fetcher, cache, throttle and renderer
//!
//! `Feed::mount` hands the feed a rendering surface and spawns one task that
//! owns all rendered state. That task consumes a single queue of events:
//! the two external signals (filter changed, scroll changed), completions
//! of spawned network work, and the throttle's trailing-flush deadline.
//!
//! ```text
//! filter change ─▶ build_query ─▶ fetch (gen N) ─▶ commit iff N is latest
//!                                                   │
//!                      render ◀─ ensure(sponsor ids)┘ (iff N still latest)
//!
//! scroll tick ─▶ throttle ─▶ window ─▶ render        (no network)
//! ```

use feed_core::{build_query, FilterSelection, Id, Record, ScrollThrottle, Tick, WindowCalculator};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::cache::{EntityDeltaCache, FillReport};
use crate::config::FeedConfig;
use crate::error::Result;
use crate::fetcher::{Generation, RemoteFilteredListFetcher, Tagged};
use crate::render::{RenderSurface, ViewportRenderer};
use crate::source::{EntitySource, HttpEntitySource, HttpListSource, ListSource};

/// External signals from the page.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedSignal {
    FilterChanged(FilterSelection),
    /// New scroll offset of the surface, in pixels
    ScrollChanged(f64),
}

/// Completions of spawned network work.
enum CycleEvent {
    Fetched(Tagged<Result<Vec<Record>>>),
    Resolved {
        generation: Generation,
        report: FillReport,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Nothing requested yet
    Idle,
    /// List fetch in flight
    Loading,
    /// List committed, sponsors being resolved
    Resolving,
    /// Window rendered, scroll ticks re-render
    Ready,
    /// Cycle failed, error state shown
    Failed,
}

/// A configured feed, ready to be mounted on a surface.
pub struct Feed {
    config: FeedConfig,
    calculator: WindowCalculator,
    throttle: ScrollThrottle,
    fetcher: Arc<RemoteFilteredListFetcher>,
    cache: Arc<EntityDeltaCache>,
}

impl Feed {
    /// Create a feed over the given list source and session cache.
    pub fn new(
        config: FeedConfig,
        list_source: Arc<dyn ListSource>,
        cache: Arc<EntityDeltaCache>,
    ) -> Result<Self> {
        config.validate()?;
        let calculator = WindowCalculator::new(config.item_height, config.overscan)?;
        let throttle = ScrollThrottle::new(config.throttle_interval())?;

        Ok(Self {
            config,
            calculator,
            throttle,
            fetcher: Arc::new(RemoteFilteredListFetcher::new(list_source)),
            cache,
        })
    }

    /// Create a feed talking HTTP to the configured endpoints, with a fresh
    /// session cache.
    pub fn from_config(config: FeedConfig) -> Result<Self> {
        config.validate()?;
        let list_source: Arc<dyn ListSource> = Arc::new(HttpListSource::from_config(&config)?);
        let entity_source: Arc<dyn EntitySource> = Arc::new(HttpEntitySource::from_config(&config)?);
        let cache = Arc::new(EntityDeltaCache::new(entity_source));
        Self::new(config, list_source, cache)
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<EntityDeltaCache> {
        &self.cache
    }

    /// Attach to `surface` and start processing signals.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(self, surface: Arc<dyn RenderSurface>) -> MountedFeed {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let state = FeedState {
            renderer: ViewportRenderer::new(self.calculator, self.config.field_mapping(), surface),
            sponsor_field: self.config.sponsor_field.clone(),
            fetcher: self.fetcher,
            cache: self.cache,
            throttle: self.throttle,
            scroll_offset: 0.0,
            records: Arc::new(Vec::new()),
            phase: Phase::Idle,
            event_tx,
        };

        info!(
            item_height = self.config.item_height,
            overscan = self.config.overscan,
            throttle_ms = self.config.throttle_interval_ms,
            "Feed mounted"
        );

        MountedFeed {
            signals: signal_tx,
            task: tokio::spawn(state.run(signal_rx, event_rx)),
        }
    }
}

/// Handle to a mounted feed: the two external signals plus shutdown.
pub struct MountedFeed {
    signals: mpsc::UnboundedSender<FeedSignal>,
    task: JoinHandle<()>,
}

impl MountedFeed {
    /// The filter selection changed. Returns `false` once the feed is gone.
    pub fn filter_changed(&self, selection: FilterSelection) -> bool {
        self.signals.send(FeedSignal::FilterChanged(selection)).is_ok()
    }

    /// The surface scrolled to `scroll_offset`.
    pub fn scroll_changed(&self, scroll_offset: f64) -> bool {
        self.signals.send(FeedSignal::ScrollChanged(scroll_offset)).is_ok()
    }

    /// Stop processing signals and wait for the loop to exit. In-flight
    /// network work is left to finish on its own.
    pub async fn shutdown(self) {
        drop(self.signals);
        if let Err(e) = self.task.await {
            error!(error = %e, "Feed task ended abnormally");
        }
    }
}

/// State owned by the feed task.
struct FeedState {
    renderer: ViewportRenderer,
    sponsor_field: String,
    fetcher: Arc<RemoteFilteredListFetcher>,
    cache: Arc<EntityDeltaCache>,
    throttle: ScrollThrottle,
    scroll_offset: f64,
    records: Arc<Vec<Record>>,
    phase: Phase,
    event_tx: mpsc::UnboundedSender<CycleEvent>,
}

impl FeedState {
    async fn run(
        mut self,
        mut signals: mpsc::UnboundedReceiver<FeedSignal>,
        mut events: mpsc::UnboundedReceiver<CycleEvent>,
    ) {
        loop {
            let flush_at = self.throttle.pending_flush();

            tokio::select! {
                signal = signals.recv() => match signal {
                    Some(FeedSignal::FilterChanged(selection)) => self.start_cycle(&selection),
                    Some(FeedSignal::ScrollChanged(offset)) => self.on_scroll(offset).await,
                    None => {
                        debug!("Signal channel closed, feed loop exiting");
                        break;
                    }
                },
                Some(event) = events.recv() => match event {
                    CycleEvent::Fetched(tagged) => self.on_fetched(tagged),
                    CycleEvent::Resolved { generation, report } => {
                        self.on_resolved(generation, report).await
                    }
                },
                _ = tokio::time::sleep_until(flush_at.unwrap_or_else(Instant::now)), if flush_at.is_some() => {
                    if self.throttle.flush(Instant::now()) && self.phase == Phase::Ready {
                        self.render().await;
                    }
                }
            }
        }
    }

    fn start_cycle(&mut self, selection: &FilterSelection) {
        let query = build_query(selection);
        let generation = self.fetcher.begin();
        info!(generation, %query, "Filter changed, starting fetch cycle");

        self.phase = Phase::Loading;
        self.renderer.show_loading();

        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let tagged = fetcher.fetch(generation, &query).await;
            let _ = tx.send(CycleEvent::Fetched(tagged));
        });
    }

    fn on_fetched(&mut self, tagged: Tagged<Result<Vec<Record>>>) {
        let generation = tagged.generation;
        let Some(result) = self.fetcher.commit(tagged) else {
            return;
        };

        match result {
            Ok(records) => {
                info!(generation, records = records.len(), "List committed");
                let ids: Vec<Id> = records
                    .iter()
                    .flat_map(|record| record.sponsor_ids(&self.sponsor_field))
                    .collect();

                self.records = Arc::new(records);
                self.scroll_offset = 0.0;
                self.throttle.reset();
                self.renderer.scroll_to(0.0);
                self.phase = Phase::Resolving;

                let cache = Arc::clone(&self.cache);
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    let report = cache.ensure(ids).await;
                    let _ = tx.send(CycleEvent::Resolved { generation, report });
                });
            }
            Err(e) => {
                error!(generation, error = %e, "Fetch cycle failed");
                self.records = Arc::new(Vec::new());
                self.phase = Phase::Failed;
                self.renderer.show_error(&e);
            }
        }
    }

    async fn on_resolved(&mut self, generation: Generation, report: FillReport) {
        if !self.fetcher.is_current(generation) {
            debug!(generation, "Discarding sponsor fill of superseded cycle");
            return;
        }

        debug!(
            generation,
            fetched = report.fetched.len(),
            unresolved = report.failed.len(),
            "Sponsors resolved"
        );
        self.phase = Phase::Ready;
        self.render().await;
    }

    async fn on_scroll(&mut self, offset: f64) {
        self.scroll_offset = offset;
        if self.phase != Phase::Ready {
            return;
        }

        match self.throttle.hit(Instant::now()) {
            Tick::Fire => self.render().await,
            Tick::Schedule(deadline) => debug!(?deadline, "Scroll recompute deferred"),
            Tick::Coalesced => {}
        }
    }

    async fn render(&self) {
        let range = {
            let entities = self.cache.read().await;
            self.renderer.render(&self.records, self.scroll_offset, &entities)
        };
        debug!(start = range.start, end = range.end, total = self.records.len(), "Window rendered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeedError;
    use crate::render::{RecordingSurface, SurfaceEvent};
    use crate::source::{MockEntitySource, MockListSource};
    use feed_core::{SecondaryEntity, WindowFrame};
    use std::sync::Mutex;

    /// Records how many handles to `watched` exist while each frame is drawn.
    struct CountingSurface {
        watched: Arc<SecondaryEntity>,
        counts: Mutex<Vec<usize>>,
    }

    impl RenderSurface for CountingSurface {
        fn viewport_height(&self) -> f64 {
            900.0
        }

        fn show_loading(&self) {}

        fn render_window(&self, _frame: WindowFrame) {
            if let Ok(mut counts) = self.counts.lock() {
                counts.push(Arc::strong_count(&self.watched));
            }
        }

        fn show_error(&self, _error: &FeedError) {}
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cache = Arc::new(EntityDeltaCache::new(Arc::new(MockEntitySource::new())));
        let result = Feed::new(
            FeedConfig::default().with_item_height(-1.0),
            Arc::new(MockListSource::new()),
            cache,
        );
        assert!(matches!(result, Err(FeedError::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_before_first_cycle_renders_nothing() {
        let cache = Arc::new(EntityDeltaCache::new(Arc::new(MockEntitySource::new())));
        let feed = Feed::new(FeedConfig::default(), Arc::new(MockListSource::new()), cache).unwrap();
        let surface = Arc::new(RecordingSurface::new(900.0));
        let mounted = feed.mount(surface.clone());

        assert!(mounted.scroll_changed(1000.0));
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        mounted.shutdown().await;

        assert!(surface.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_cycle_event_order() {
        let cache = Arc::new(EntityDeltaCache::new(Arc::new(MockEntitySource::new())));
        let list = MockListSource::new().with_default_response(vec![Record::new("a")]);
        let feed = Feed::new(FeedConfig::default(), Arc::new(list), cache).unwrap();
        let surface = Arc::new(RecordingSurface::new(900.0));
        let mounted = feed.mount(surface.clone());

        mounted.filter_changed(FilterSelection::new());
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        mounted.shutdown().await;

        let events = surface.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], SurfaceEvent::Loading);
        assert_eq!(events[1], SurfaceEvent::ScrollTo(0.0));
        assert!(matches!(&events[2], SurfaceEvent::Window(frame) if frame.rows.len() == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_does_not_copy_sponsor_cache() {
        let source = Arc::new(MockEntitySource::new().with_entity(SecondaryEntity::new("z", "Zenith")));
        let cache = Arc::new(EntityDeltaCache::new(source));
        cache.ensure(vec![Id::from("z")]).await;
        let watched = cache.get(&Id::from("z")).await.unwrap();

        let records = (0..100).map(|i| Record::new(format!("r{}", i))).collect();
        let list = MockListSource::new().with_default_response(records);
        let feed = Feed::new(FeedConfig::default(), Arc::new(list), cache).unwrap();
        let surface = Arc::new(CountingSurface {
            watched,
            counts: Mutex::new(Vec::new()),
        });
        let mounted = feed.mount(surface.clone());

        mounted.filter_changed(FilterSelection::new());
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        mounted.scroll_changed(4500.0);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        mounted.shutdown().await;

        // the cache map plus our own handle, no per-render copy
        let counts = surface.counts.lock().unwrap().clone();
        assert_eq!(counts, vec![2, 2]);
    }
}
