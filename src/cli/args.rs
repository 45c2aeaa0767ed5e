use clap::{Args, Parser, Subcommand};

use crate::models::{NotificationState, Prayer};

#[derive(Parser, Debug)]
#[command(name = "miqat", version, author, about = "Daily prayer times, reminders and a widget cache")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve today's prayer times and show the countdown to the next prayer
    Times,
    /// Resolve, reschedule today's notifications and update the widget once
    Refresh,
    /// Run in the foreground: refresh on start, on day change and on request, and deliver alarms
    Daemon,
    /// Ask the daemon for fresh times and wait for the widget cache (exit 75 = retry later)
    BackgroundRefresh,
    /// Show the month calendar from the scraped source
    Calendar(CalendarArgs),
    /// Print the cached widget record and whether it is fresh
    Widget,
    /// List alarms scheduled for today
    Alarms,
    /// Set how one prayer (or its reminder) alerts, and save the config
    Notify {
        /// fajr, sunrise, dhuhr, asr, maghrib or isha
        prayer: Prayer,
        /// off, silent, vibrate or full
        state: NotificationState,
        /// Apply to the reminder before the prayer instead
        #[arg(long)]
        reminder: bool,
    },
}

#[derive(Args, Debug)]
#[group(multiple = false)]
pub struct CalendarArgs {
    /// Show tomorrow instead of today
    #[arg(long)]
    pub tomorrow: bool,
    /// Show a specific Hijri day of the current month
    #[arg(long, value_name = "DAY")]
    pub hijri: Option<u32>,
    /// Show every day of the month
    #[arg(long)]
    pub all: bool,
    /// Print the whole month as JSON keyed by Hijri day
    #[arg(long)]
    pub json: bool,
}
