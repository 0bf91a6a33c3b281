//! Database module providing organized access to the search log
//!
//! - `connection`: connection pool, SQLite pragmas and migrations
//! - `search_log`: append and aggregate queries over `search_queries`
//! - `service`: `DatabaseService`, the facade the rest of the app uses

pub mod connection;
pub mod search_log;
pub mod service;

pub use connection::{DbConnection, DbPool, MIGRATIONS};
pub use service::DatabaseService;

pub use search_log::{QueryCountRow, SearchLogOperations};
