//! Splits a raw input line into argument tokens.
//!
//! A token is a backtick span (may contain newlines), a single- or double-quoted
//! span on one line, or a run of non-whitespace. Delimiters are stripped from the
//! returned token. An unterminated quote is treated as ordinary text.

use std::sync::LazyLock;

use regex::Regex;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"`([\s\S]*?)`|'([^'\n]*)'|"([^"\n]*)"|(\S+)"#).expect("token pattern is valid")
});

pub fn tokenize(line: &str) -> Vec<String> {
    TOKEN
        .captures_iter(line)
        .filter_map(|caps| {
            (1..=4)
                .find_map(|i| caps.get(i))
                .map(|m| m.as_str().to_string())
        })
        .collect()
}
