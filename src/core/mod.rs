//! Core watchlist logic, independent of transport and terminal

pub mod backend;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod latch;
pub mod log;
pub mod rates;
pub mod refresh;
pub mod render;
pub mod watchlist;

// Re-export main types for cleaner imports
pub use backend::{RemoteList, WatchlistBackend};
pub use catalog::{Catalog, CatalogEntry};
pub use engine::{WatchlistEngine, WorkflowOutcome};
pub use rates::{DisplayBase, RateCache, RateProvider};
pub use render::{DisplayCard, UserIntent, WatchlistRenderer};
pub use watchlist::{WatchlistEntry, WatchlistStore};
