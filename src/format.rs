use chrono::{DateTime, Utc};

/// `YYYY-MM-DD HH:MM:SS` in UTC, the way dates appear in status messages.
pub fn timestamp(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// The first `limit` space separated scopes, with a trailing "..." when some were cut.
pub fn split_scopes(scope: &str, limit: usize) -> Vec<String> {
    let scopes: Vec<&str> = scope.split_whitespace().collect();
    let mut shown: Vec<String> = scopes.iter().take(limit).map(|s| s.to_string()).collect();
    if shown.len() < scopes.len() {
        shown.push("...".into());
    }
    shown
}

/// "client" -> "Client"
pub fn capitalized(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
