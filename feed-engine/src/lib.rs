//! Feed Engine - windowed rendering and sponsor caching for media feeds
//!
//! Displays an unbounded, server-filtered, ordered collection inside a
//! fixed-size viewport while joining every record to its sponsors:
//! - Async re-query on filter change, committing only the latest result
//! - Sponsor delta cache: fetch only missing ids, tolerate partial failure
//! - Scroll-driven windowing with a throttled recompute
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                MountedFeed                   │
//! │   filter_changed()          scroll_changed() │
//! └───────┬───────────────────────────┬──────────┘
//!         ▼                           ▼
//! ┌───────────────┐           ┌───────────────┐
//! │ ListFetcher   │           │ ScrollThrottle│
//! │ (generations) │           └───────┬───────┘
//! └───────┬───────┘                   │
//!         ▼                           ▼
//! ┌───────────────┐           ┌───────────────┐
//! │ EntityDelta   │──snapshot▶│ Viewport      │──▶ RenderSurface
//! │ Cache         │           │ Renderer      │
//! └───────────────┘           └───────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use feed_engine::{Feed, FeedConfig, FilterSelection, RecordingSurface};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let feed = Feed::from_config(FeedConfig::default().with_endpoints(
//!     "https://cms.example.com/api/videos",
//!     "https://cms.example.com/api/customers",
//! ))?;
//!
//! let surface = Arc::new(RecordingSurface::new(900.0));
//! let mounted = feed.mount(surface.clone());
//!
//! let mut selection = FilterSelection::new();
//! selection.select("topics", "12")?;
//! mounted.filter_changed(selection);
//! mounted.scroll_changed(1800.0);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod fetcher;
pub mod render;
pub mod source;

// Re-export main types for convenience
pub use cache::{EntityDeltaCache, FillReport};
pub use config::FeedConfig;
pub use error::{EntityFailure, FeedError, PartialEntityError, Result};
pub use feed::{Feed, FeedSignal, MountedFeed};
pub use fetcher::{Generation, RemoteFilteredListFetcher, Tagged};
pub use render::{RecordingSurface, RenderSurface, SurfaceEvent, ViewportRenderer};
pub use source::{EntitySource, HttpEntitySource, HttpListSource, ListSource, MockEntitySource, MockListSource};

pub use feed_core::{
    build_query, FilterQuery, FilterSelection, Id, PlacedRow, Record, SecondaryEntity,
    SponsorSlot, Viewport, WindowFrame, WindowRange,
};
