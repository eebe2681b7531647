//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::dip::DipRegistry;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// The DIP registry (has internal locking)
    pub registry: DipRegistry,

    /// Reject documents with error-severity violations on registration
    pub strict: bool,
}

impl AppState {
    pub fn new(strict: bool) -> Self {
        Self {
            registry: DipRegistry::new(),
            strict,
        }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
