pub mod calendar;
pub mod daily;
pub mod months;
pub mod time;

pub use calendar::parse_calendar_on;
pub use daily::parse_daily_on;

/// Text content of an element with whitespace collapsed.
pub(crate) fn text_of(element: &scraper::ElementRef) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
