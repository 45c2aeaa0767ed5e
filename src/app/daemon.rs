use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use std::io::Write;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::app::refresh::{refresh_cycle, RefreshSummary};
use crate::config::AppConfig;
use crate::db::Store;
use crate::notifications::{AlarmBackend, Dispatcher};
use crate::prayer_times::SourceResolver;
use crate::widget::{SignalAction, SignalBus};

/// Why a tick ran a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    Startup,
    NewDay,
    Requested,
}

/// Foreground resolver: keeps today's alarms and the widget record current
/// and delivers alarms as they come due.
pub struct Daemon<'a> {
    resolver: SourceResolver<'a>,
    store: &'a Store,
    config: &'a AppConfig,
    dispatcher: Dispatcher,
    refreshed_for: Option<NaiveDate>,
}

impl<'a> Daemon<'a> {
    pub fn new(resolver: SourceResolver<'a>, store: &'a Store, config: &'a AppConfig) -> Self {
        Self {
            resolver,
            store,
            config,
            dispatcher: Dispatcher::new(),
            refreshed_for: None,
        }
    }

    fn refresh_reason(&self, today: NaiveDate) -> Option<RefreshReason> {
        // consume first so a request raised before a day change is not replayed later
        let requested = match self.store.consume(SignalAction::RequestRefresh) {
            Ok(raised) => raised.is_some(),
            Err(error) => {
                log::warn!("Could not read refresh requests: {}", error);
                false
            }
        };

        match self.refreshed_for {
            None => Some(RefreshReason::Startup),
            Some(day) if day != today => Some(RefreshReason::NewDay),
            _ if requested => Some(RefreshReason::Requested),
            _ => None,
        }
    }

    /// One pass of the loop. Returns the refresh summary when a refresh ran.
    pub async fn tick<Tz, W>(&mut self, now: &DateTime<Tz>, out: &mut W) -> Option<(RefreshReason, RefreshSummary)>
    where
        Tz: TimeZone,
        W: Write,
    {
        let today = now.date_naive();
        let refreshed = match self.refresh_reason(today) {
            Some(reason) => {
                log::info!("Refreshing ({:?})", reason);
                if reason == RefreshReason::NewDay {
                    match self.store.clear_expired_calendars(today) {
                        Ok(removed) if removed > 0 => log::info!("Dropped {} expired month calendars", removed),
                        Ok(_) => {}
                        Err(error) => log::warn!("Could not prune month calendars: {}", error),
                    }
                }
                let summary = refresh_cycle(&self.resolver, self.store, self.config, now).await;
                self.refreshed_for = Some(today);
                Some((reason, summary))
            }
            None => None,
        };

        self.dispatch_due(now.with_timezone(&Utc), out);
        refreshed
    }

    fn dispatch_due<W: Write>(&mut self, now: DateTime<Utc>, out: &mut W) {
        let due = match self.store.take_due(now) {
            Ok(due) => due,
            Err(error) => {
                log::warn!("Could not read due alarms: {}", error);
                return;
            }
        };
        for entry in &due {
            if let Err(error) = self.dispatcher.deliver(entry, out) {
                log::warn!("Failed to deliver {}: {}", entry.id, error);
            }
        }
        if !due.is_empty() {
            log::debug!("Delivered {} alarms, {} countdowns showing", due.len(), self.dispatcher.active_countdowns());
        }
    }

    /// Ticks until Ctrl-C.
    pub async fn run(mut self) -> Result<()> {
        let period = Duration::from_secs(self.config.refresh.daemon_tick_secs.max(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        log::info!("Daemon started, ticking every {:?}", period);
        let mut stdout = std::io::stdout();
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                result = &mut shutdown => {
                    result?;
                    log::info!("Daemon stopping");
                    return Ok(());
                }
            }

            if let Some((reason, summary)) = self.tick(&Local::now(), &mut stdout).await {
                log::info!(
                    "{:?} refresh: {} via {}, {} notifications",
                    reason,
                    summary.resolved.date,
                    summary.resolved.source_used,
                    summary.scheduled
                );
            }
        }
    }
}
