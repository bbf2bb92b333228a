//! Feed Core - building blocks for a virtualized, filterable media feed
//!
//! Everything in this crate is synchronous and free of I/O:
//! - **filter**: filter selection → canonical remote query
//! - **window**: scroll offset + viewport → visible index range
//! - **layout**: rows of the visible range placed inside a full-height spacer
//! - **throttle**: leading/trailing scroll throttle state machine
//! - **types**: records, sponsor entities and their ids
//!
//! The async side (remote list fetcher, sponsor delta cache, mounted feed)
//! lives in `feed-engine`.
//!
//! # Example
//!
//! ```rust
//! use feed_core::{build_query, FilterSelection, Viewport, WindowCalculator};
//!
//! # fn main() -> feed_core::Result<()> {
//! let mut selection = FilterSelection::new();
//! selection.select("topics", "12")?.select("customers", "7")?;
//! assert_eq!(build_query(&selection).as_query_string(), "customers=7&topics=12");
//!
//! let calc = WindowCalculator::new(450.0, 5)?;
//! let range = calc.range(Viewport::new(0.0, 900.0), 1000);
//! assert_eq!((range.start, range.end), (0, 7));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod filter;
pub mod layout;
pub mod throttle;
pub mod types;
pub mod window;

pub use error::{CoreError, Result};
pub use filter::{build_query, FilterQuery, FilterSelection, SEARCH_KEY};
pub use layout::{layout_window, FieldMapping, PlacedRow, SponsorSlot, WindowFrame};
pub use throttle::{ScrollThrottle, Tick};
pub use types::{EntityMap, Id, Record, SecondaryEntity};
pub use window::{Viewport, WindowCalculator, WindowRange};
