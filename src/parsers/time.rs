use regex::Regex;
use std::sync::LazyLock;

use crate::models::SENTINEL;

static CLOCK_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-2]\d:[0-5]\d$").expect("clock time pattern is valid")
});
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#\d+|#x[0-9a-fA-F]+|[a-zA-Z]+);").expect("entity pattern is valid")
});

/// Removes markup remnants, character entities and control characters.
pub fn sanitize(raw: &str) -> String {
    let without_tags = TAG.replace_all(raw, " ");
    let without_entities = ENTITY.replace_all(&without_tags, " ");
    without_entities
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Reduces a scraped cell to `HH:MM`, or the sentinel when it doesn't look like one.
pub fn normalize_time(raw: &str) -> String {
    let cleaned: String = sanitize(raw)
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ':')
        .collect();
    if CLOCK_TIME.is_match(&cleaned) {
        cleaned
    } else {
        SENTINEL.to_string()
    }
}

/// Drops a trailing timezone suffix: `"07:00 +01"` becomes `"07:00"`.
pub fn strip_timezone_suffix(raw: &str) -> &str {
    match raw.find(' ') {
        Some(idx) => &raw[..idx],
        None => raw,
    }
}

pub fn is_clock_time(value: &str) -> bool {
    CLOCK_TIME.is_match(value)
}

/// First run of ASCII digits in `text`, if any.
pub fn leading_number(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
