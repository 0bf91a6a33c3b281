// Re-export all models from their respective modules
pub mod api;
pub mod catalog;
pub mod search_event;
pub mod stats;

// Re-export commonly used models
pub use api::*;
pub use catalog::*;
pub use search_event::*;
pub use stats::*;
