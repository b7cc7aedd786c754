/// Bounded, insertion-ordered sample history
pub mod history_cache;

pub use history_cache::{HistoryCache, DEFAULT_MAX_ENTRIES};
