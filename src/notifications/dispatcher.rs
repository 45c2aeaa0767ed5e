use std::collections::HashSet;
use std::io::{self, Write};

use crate::models::{EntryKind, Prayer, ScheduledNotificationEntry};
use crate::notifications::channels::is_audible;

/// Terminal delivery of due alarms. Keeps track of countdowns on display
/// so their dismiss alarm can clear them.
#[derive(Debug, Default)]
pub struct Dispatcher {
    countdowns: HashSet<Prayer>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_countdowns(&self) -> usize {
        self.countdowns.len()
    }

    pub fn deliver<W: Write>(&mut self, entry: &ScheduledNotificationEntry, out: &mut W) -> io::Result<()> {
        let prayer = entry.target.prayer();
        let bell = if is_audible(&entry.channel) { "\x07" } else { "" };

        match entry.kind {
            EntryKind::Alert => {
                log::info!("Prayer alert: {} ({})", entry.payload.body, entry.channel);
                writeln!(out, "{bell}  ● {}", entry.payload.body)?;
            }
            EntryKind::Countdown => {
                log::info!("Reminder: {} ({})", entry.payload.body, entry.channel);
                self.countdowns.insert(prayer);
                writeln!(out, "{bell}  ◔ {}", entry.payload.body)?;
            }
            EntryKind::Dismiss => {
                if self.countdowns.remove(&prayer) {
                    log::debug!("Cleared countdown for {}", prayer);
                    writeln!(out, "  ○ {} countdown cleared", prayer)?;
                }
            }
        }
        out.flush()
    }
}
