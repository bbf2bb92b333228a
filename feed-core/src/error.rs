//! Error types for the pure feed building blocks

use thiserror::Error;

/// Result type for feed-core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// Row height estimate must be a positive, finite number of pixels
    #[error("Invalid item height estimate: {0}")]
    InvalidItemHeight(f64),

    /// Field name collides with the free-text query key
    #[error("Filter field name '{0}' is reserved")]
    ReservedField(String),

    /// Throttle interval of zero would never coalesce anything
    #[error("Throttle interval must be greater than zero")]
    ZeroThrottleInterval,
}
