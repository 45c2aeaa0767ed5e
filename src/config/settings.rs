use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::{NotificationState, Prayer, SoundStyle, WidgetTheme};
use crate::prayer_times::{Endpoints, ResolverConfig};
use crate::widget::PollPolicy;

fn default_city_id() -> String {
    "1".to_string()
}
fn default_city_name() -> String {
    "Rabat".to_string()
}
fn default_latitude() -> String {
    "34.0209".to_string()
}
fn default_longitude() -> String {
    "-6.8416".to_string()
}
fn default_calc_method() -> String {
    "MuslimWorldLeague".to_string()
}
fn default_madhab() -> String {
    "Shafi".to_string()
}
fn default_timezone_offset() -> i32 {
    60
}
fn default_daily_url() -> String {
    "https://www.habous.gov.ma/prieres/horaire-api.php".to_string()
}
fn default_monthly_url() -> String {
    "https://www.habous.gov.ma/prieres/horaire_hijri_2.php".to_string()
}
fn default_api_url() -> String {
    "https://api.aladhan.com/v1/timings".to_string()
}
fn default_timeout_secs() -> u64 {
    8
}
fn default_reminder_minutes() -> u32 {
    15
}
fn default_hue() -> f32 {
    160.0
}
fn default_transparency() -> f32 {
    0.2
}
fn default_daemon_tick_secs() -> u64 {
    30
}
fn default_poll_interval_ms() -> u64 {
    2000
}
fn default_max_attempts() -> u32 {
    10
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_true")]
    pub prefer_scraped: bool,
    #[serde(default)]
    pub offline_mode: bool,
    #[serde(default = "default_city_id")]
    pub city_id: String,
    #[serde(default = "default_city_name")]
    pub city_name: String,
    /// Decimal degrees as written by the user.
    #[serde(default = "default_latitude")]
    pub latitude: String,
    #[serde(default = "default_longitude")]
    pub longitude: String,
    #[serde(default = "default_calc_method")]
    pub calc_method: String,
    #[serde(default = "default_madhab")]
    pub madhab: String,
    #[serde(default = "default_timezone_offset")]
    pub timezone_offset: i32, // minutes from UTC
    #[serde(default = "default_daily_url")]
    pub daily_url: String,
    #[serde(default = "default_monthly_url")]
    pub monthly_url: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            prefer_scraped: true,
            offline_mode: false,
            city_id: default_city_id(),
            city_name: default_city_name(),
            latitude: default_latitude(),
            longitude: default_longitude(),
            calc_method: default_calc_method(),
            madhab: default_madhab(),
            timezone_offset: default_timezone_offset(),
            daily_url: default_daily_url(),
            monthly_url: default_monthly_url(),
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SourceConfig {
    pub fn resolver(&self) -> ResolverConfig {
        ResolverConfig {
            prefer_scraped: self.prefer_scraped,
            offline_mode: self.offline_mode,
            city_id: self.city_id.clone(),
            city_name: self.city_name.clone(),
            latitude: self.latitude.clone(),
            longitude: self.longitude.clone(),
        }
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            daily_url: self.daily_url.clone(),
            monthly_url: self.monthly_url.clone(),
            api_url: self.api_url.clone(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Per-prayer maps only apply when this is set.
    #[serde(default)]
    pub advanced: bool,
    #[serde(default)]
    pub prayer_state: NotificationState,
    #[serde(default = "default_reminder_state")]
    pub reminder_state: NotificationState,
    #[serde(default)]
    pub prayers: HashMap<Prayer, NotificationState>,
    #[serde(default)]
    pub reminders: HashMap<Prayer, NotificationState>,
    #[serde(default = "default_reminder_minutes")]
    pub reminder_minutes: u32,
    #[serde(default)]
    pub sound_style: SoundStyle,
}

fn default_reminder_state() -> NotificationState {
    NotificationState::Silent
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            advanced: false,
            prayer_state: NotificationState::Full,
            reminder_state: default_reminder_state(),
            prayers: HashMap::new(),
            reminders: HashMap::new(),
            reminder_minutes: default_reminder_minutes(),
            sound_style: SoundStyle::default(),
        }
    }
}

impl NotificationSettings {
    /// Pins one prayer (or its reminder) to `state` and switches to per-prayer settings.
    pub fn set_state(&mut self, prayer: Prayer, state: NotificationState, reminder: bool) {
        if !self.advanced {
            // keep every other prayer where the global state had it
            for other in Prayer::ALL {
                self.prayers.entry(other).or_insert(self.prayer_state);
                self.reminders.entry(other).or_insert(self.reminder_state);
            }
            self.advanced = true;
        }
        let map = if reminder { &mut self.reminders } else { &mut self.prayers };
        map.insert(prayer, state);
    }

    pub fn effective_prayer_state(&self, prayer: Prayer) -> NotificationState {
        Self::effective(self.advanced, &self.prayers, prayer, self.prayer_state)
    }

    pub fn effective_reminder_state(&self, prayer: Prayer) -> NotificationState {
        Self::effective(self.advanced, &self.reminders, prayer, self.reminder_state)
    }

    fn effective(
        advanced: bool,
        map: &HashMap<Prayer, NotificationState>,
        prayer: Prayer,
        global: NotificationState,
    ) -> NotificationState {
        if advanced {
            map.get(&prayer).copied().unwrap_or(global)
        } else {
            global
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetConfig {
    #[serde(default = "default_hue")]
    pub hue: f32,
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default = "default_transparency")]
    pub transparency: f32,
    /// Replaces the resolved city name on the widget.
    #[serde(default)]
    pub location_label: Option<String>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            hue: default_hue(),
            dark_mode: false,
            transparency: default_transparency(),
            location_label: None,
        }
    }
}

impl WidgetConfig {
    pub fn theme(&self) -> WidgetTheme {
        WidgetTheme {
            hue: self.hue.rem_euclid(360.0),
            dark_mode: self.dark_mode,
            transparency: self.transparency.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_daemon_tick_secs")]
    pub daemon_tick_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            daemon_tick_secs: default_daemon_tick_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl RefreshConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            max_attempts: self.max_attempts.max(1),
            interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub widget: WidgetConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
}

impl AppConfig {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("", "", "miqat").context("Could not determine project directories")
    }

    pub fn config_path() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn data_dir() -> Result<PathBuf> {
        let dirs = Self::project_dirs()?;
        Ok(dirs.data_dir().to_path_buf())
    }

    pub fn db_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("miqat.db"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(&path).with_context(|| format!("Reading {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Parsing config.toml")
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).context("Serializing config")?;
        std::fs::write(path, content).with_context(|| format!("Writing {:?}", path))?;
        Ok(())
    }

    pub fn ensure_data_dir() -> Result<PathBuf> {
        let dir = Self::data_dir()?;
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}
