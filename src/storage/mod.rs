// storage/mod.rs
// Reliability database

pub mod circuit_breaker;
pub mod favorites;
pub mod migrations;
pub mod pool;
pub mod reliability;
pub mod store;
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used items
pub use favorites::{add_favorite, list_favorites, remove_favorite, Favorite};
pub use migrations::run_migrations;
pub use pool::{init_db_pool_with_path, DbPool};
pub use reliability::{
    band_counts, get_history, get_record, query_reliable, record_result, BandCounts,
};
pub use store::ReliabilityStore;
