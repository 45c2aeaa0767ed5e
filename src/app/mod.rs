pub mod background;
pub mod calendar;
pub mod daemon;
pub mod refresh;

#[cfg(test)]
pub(crate) mod fakes;

pub use background::{background_refresh, BackgroundOutcome};
pub use calendar::{CalendarCache, CalendarService};
pub use daemon::Daemon;
pub use refresh::{refresh_cycle, RefreshSummary};
