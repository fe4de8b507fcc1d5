use std::sync::LazyLock;

pub mod defaults;
pub mod version;

pub static STARTUP_TIME: LazyLock<std::time::SystemTime> =
    LazyLock::new(std::time::SystemTime::now);

/// Persistent key holding the JSON-encoded quote collection.
pub const QUOTES_KEY: &str = "quotes";
/// Persistent key holding the last selected category.
pub const LAST_CATEGORY_KEY: &str = "last_category";
/// Session key holding the last quote shown.
pub const LAST_QUOTE_KEY: &str = "last_quote";

pub const NO_QUOTES_IN_CATEGORY: &str = "No quotes available in this category!";

/// Consecutive sync failures at which the streak is escalated to an error log.
pub const FAILURE_STREAK_ERROR_THRESHOLD: u64 = 3;
