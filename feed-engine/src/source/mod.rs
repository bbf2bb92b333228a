//! Remote data sources.
//!
//! - HTTP sources for the filtered-list and sponsor endpoints
//! - Mock sources for testing

pub mod http;
pub mod mock;
pub mod traits;

pub use http::{parse_record_array, HttpEntitySource, HttpListSource};
pub use mock::{MockEntitySource, MockListSource};
pub use traits::{EntitySource, ListSource};
