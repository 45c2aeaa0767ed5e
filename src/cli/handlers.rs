use anyhow::{anyhow, Context, Result};
use chrono::Local;

use crate::app::{background_refresh, refresh_cycle, BackgroundOutcome, CalendarService, Daemon};
use crate::cli::args::CalendarArgs;
use crate::config::AppConfig;
use crate::db::Store;
use crate::models::{NotificationState, Prayer, PrayerDay, PrayerTimes, SENTINEL};
use crate::notifications::AlarmBackend;
use crate::prayer_times::{offline_calculator, HttpSources, OfflineCalculator, SourceResolver};
use crate::utils::format::{format_duration_secs, is_past, next_prayer};
use crate::widget::WidgetSyncBridge;

// ─── ANSI helpers ────────────────────────────────────────────────────────────

macro_rules! println_colored {
    ($color:expr, $($arg:tt)*) => {{
        print!("{}", $color);
        print!($($arg)*);
        println!("\x1b[0m");
    }};
}

const GREEN: &str = "\x1b[32m";
const AMBER: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const GOLD: &str = "\x1b[38;2;196;160;68m";

/// Network and offline collaborators built from the config.
struct Sources {
    http: HttpSources,
    offline: Box<dyn OfflineCalculator>,
}

impl Sources {
    fn from_config(config: &AppConfig) -> Result<Self> {
        let source = &config.source;
        let http = HttpSources::new(source.endpoints(), source.timeout()).context("Building HTTP client")?;
        let offline = offline_calculator(
            source.offline_mode,
            &source.calc_method,
            &source.madhab,
            source.timezone_offset,
        )
        .context("Configuring offline calculator")?;
        Ok(Self { http, offline })
    }

    fn resolver(&self) -> SourceResolver<'_> {
        SourceResolver::new(&self.http, &self.http, self.offline.as_ref())
    }
}

fn print_times(times: &PrayerTimes) {
    let now = Local::now().time();
    for (prayer, value) in times.iter() {
        if value == SENTINEL || is_past(value, now) {
            println_colored!(DIM, "  {:<10}  {}", prayer.display_name(), value);
        } else {
            println_colored!(BOLD, "  {:<10}  {}", prayer.display_name(), value);
        }
    }
}

// ─── Times ───────────────────────────────────────────────────────────────────

pub async fn handle_times(config: &AppConfig) -> Result<()> {
    let sources = Sources::from_config(config)?;
    let today = Local::now().date_naive();
    let resolved = sources.resolver().resolve(&config.source.resolver(), today).await;

    println!();
    let city = resolved.city.as_deref().unwrap_or(&config.source.city_name);
    println_colored!(GOLD, "  Prayer Times · {} ({})", city, today.format("%Y-%m-%d"));
    println!();

    if resolved.is_total_failure() {
        println_colored!(RED, "  ✗ No source answered. Check your connection or enable offline mode.");
        println!();
        return Ok(());
    }

    print_times(&resolved.times);
    if let Some((prayer, secs)) = next_prayer(&resolved.times, Local::now().naive_local()) {
        println!();
        println_colored!(AMBER, "  Next: {} in {}", prayer.display_name(), format_duration_secs(secs));
    }
    println!();
    println_colored!(DIM, "  Source: {}", resolved.source_used);
    println!();
    Ok(())
}

// ─── Refresh ─────────────────────────────────────────────────────────────────

pub async fn handle_refresh(store: &Store, config: &AppConfig) -> Result<()> {
    let sources = Sources::from_config(config)?;
    let summary = refresh_cycle(&sources.resolver(), store, config, &Local::now()).await;

    if summary.resolved.is_total_failure() {
        println_colored!(RED, "  ✗ Every source failed; previous alarms and widget kept");
        return Ok(());
    }
    println_colored!(
        GREEN,
        "  ✓ Times from {} · {} notifications scheduled",
        summary.resolved.source_used,
        summary.scheduled
    );
    match summary.record {
        Some(record) => println_colored!(GREEN, "  ✓ Widget updated for {}", record.location),
        None => println_colored!(AMBER, "  Widget cache could not be verified"),
    }
    Ok(())
}

// ─── Daemon ──────────────────────────────────────────────────────────────────

pub async fn handle_daemon(store: &Store, config: &AppConfig) -> Result<()> {
    let sources = Sources::from_config(config)?;
    println_colored!(DIM, "  miqat daemon running. Ctrl-C to stop.");
    Daemon::new(sources.resolver(), store, config).run().await
}

// ─── Background refresh ──────────────────────────────────────────────────────

/// Returns the process exit code for the host scheduler.
pub async fn handle_background_refresh(store: &Store, config: &AppConfig) -> i32 {
    let outcome = background_refresh(store, &config.refresh).await;
    match &outcome {
        BackgroundOutcome::Fresh(record) => {
            println_colored!(GREEN, "  ✓ Widget record written at {}", record.written_at.format("%H:%M:%S"))
        }
        BackgroundOutcome::Retry(error) => println_colored!(AMBER, "  {} (retry later)", error),
        BackgroundOutcome::Failed(error) => println_colored!(RED, "  ✗ {}", error),
    }
    outcome.exit_code()
}

// ─── Calendar ────────────────────────────────────────────────────────────────

fn print_day(day: &PrayerDay) {
    let date = day
        .date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| format!("{} {}", day.solar_day, day.solar_month));
    let times: Vec<&str> = day.times.iter().map(|(_, t)| t).collect();
    println!(
        "  {:>3}  {:<10}  {:<12}  {}",
        day.hijri_day.label(),
        day.weekday,
        date,
        times.join("  ")
    );
}

pub async fn handle_calendar(store: &Store, config: &AppConfig, args: &CalendarArgs) -> Result<()> {
    let sources = Sources::from_config(config)?;
    let today = Local::now().date_naive();
    let calendar = CalendarService::new(&sources.http, store)
        .month(&config.source.city_id, today)
        .await
        .context("Loading month calendar")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&calendar.keyed_by_hijri())?);
        return Ok(());
    }

    println!();
    let title = match &calendar.hijri_transliteration {
        Some(translit) => format!("{} ({})", calendar.hijri_month, translit),
        None => calendar.hijri_month.clone(),
    };
    println_colored!(GOLD, "  {} · {}", title, calendar.solar_months.join(" / "));
    println!();

    if args.all {
        for day in calendar.all_days() {
            print_day(day);
        }
    } else if let Some(hijri) = args.hijri {
        let day = calendar
            .by_hijri_day(hijri)
            .ok_or_else(|| anyhow!("No Hijri day {} in {}", hijri, calendar.hijri_month))?;
        print_day(day);
    } else {
        let day = if args.tomorrow {
            calendar.tomorrow(today)
        } else {
            calendar.today(today)
        };
        let day = day.ok_or_else(|| anyhow!("The cached month does not cover the requested day"))?;
        print_day(day);
    }

    let dates = calendar.gregorian_dates();
    if let (Some(first), Some(last), Some(expires_at)) = (dates.first(), dates.last(), calendar.expires_at) {
        println!();
        println_colored!(
            DIM,
            "  {} days, {} to {}, refetched from {}",
            calendar.total_days,
            first.format("%d/%m"),
            last.format("%d/%m"),
            expires_at.format("%Y-%m-%d")
        );
    }
    println!();
    Ok(())
}

// ─── Widget ──────────────────────────────────────────────────────────────────

pub fn handle_widget(store: &Store) -> Result<()> {
    let bridge = WidgetSyncBridge::new(store, store);
    let Some(record) = bridge.read_cached()? else {
        println_colored!(AMBER, "  No widget record yet. Run `miqat refresh`.");
        return Ok(());
    };

    println!();
    println_colored!(GOLD, "  {}", record.location);
    println!();
    print_times(&record.times);
    println!();
    let written = record.written_at.format("%Y-%m-%d %H:%M");
    if record.is_fresh(Local::now().date_naive()) {
        println_colored!(GREEN, "  Fresh · written {} from {}", written, record.source);
    } else {
        println_colored!(RED, "  Stale · written {} from {}", written, record.source);
    }
    println_colored!(
        DIM,
        "  hue {:.0}  {}  transparency {:.0}%",
        record.hue,
        if record.dark_mode { "dark" } else { "light" },
        record.transparency * 100.0
    );
    println!();
    Ok(())
}

// ─── Alarms ──────────────────────────────────────────────────────────────────

pub fn handle_alarms(store: &Store) -> Result<()> {
    let today = Local::now().date_naive();
    let alarms = store.list_day(today)?;

    println!();
    if alarms.is_empty() {
        println_colored!(DIM, "  No alarms pending for {}", today.format("%Y-%m-%d"));
    } else {
        println_colored!(GOLD, "  Pending alarms ({})", alarms.len());
        println!();
        for alarm in &alarms {
            println!(
                "  {}  {:<9}  {:<8}  {}",
                alarm.fire_at.with_timezone(&Local).format("%H:%M"),
                alarm.kind.as_str(),
                alarm.target.prayer().display_name(),
                alarm.channel
            );
        }
    }
    println!();
    Ok(())
}

// ─── Notify ──────────────────────────────────────────────────────────────────

pub fn handle_notify(mut config: AppConfig, prayer: Prayer, state: NotificationState, reminder: bool) -> Result<()> {
    config.notifications.set_state(prayer, state, reminder);
    config.save().context("Saving config")?;

    let target = if reminder { "reminder" } else { "notification" };
    println_colored!(GREEN, "  ✓ {} {} set to {}", prayer.display_name(), target, state.as_str());
    println_colored!(DIM, "  Takes effect on the next refresh.");
    Ok(())
}
