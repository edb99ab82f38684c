use std::sync::LazyLock;

use regex::Regex;

/// Longest accepted account name.
pub const MAX_NAME_LEN: usize = 32;

static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+$").expect("name pattern is valid"));

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\w.\-]+)?\w+@[\w\-]+(\.\w+)+$").expect("email pattern is valid")
});

/// Account names are word characters only.
pub fn is_name(name: &str) -> bool {
    name.chars().count() <= MAX_NAME_LEN && NAME.is_match(name)
}

pub fn is_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

/// Case-folded key used for name lookups everywhere (store, registry, rooms).
pub fn fold(name: &str) -> String {
    name.to_lowercase()
}
