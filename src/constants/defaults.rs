use crate::models::quotes::Quote;

pub const DATABASE_URL: &str = "sqlite://quotes.db?mode=rwc";
pub const QUOTES_SERVER_URL: &str = "https://jsonplaceholder.typicode.com/posts";
pub const SYNC_INTERVAL_SECS: u64 = 10;
pub const SYNC_FETCH_LIMIT: usize = 10;
pub const SYNC_TIMEOUT_SECS: u64 = 5;
pub const SYNC_REMOTE_CATEGORY: &str = "Server";

const DEFAULT_QUOTES: [(&str, &str); 4] = [
    (
        "The best way to get started is to quit talking and begin doing.",
        "Motivation",
    ),
    (
        "Life is what happens when you're busy making other plans.",
        "Life",
    ),
    ("Don't wait. The time will never be just right.", "Motivation"),
    (
        "Happiness is not something ready-made. It comes from your own actions.",
        "Happiness",
    ),
];

/// The built-in collection used when nothing usable is persisted.
pub fn default_quotes() -> Vec<Quote> {
    DEFAULT_QUOTES
        .iter()
        .map(|(text, category)| Quote {
            text: text.to_string(),
            category: category.to_string(),
        })
        .collect()
}
