use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::Deserialize;

use crate::engine::pipeline::{EngineSettings, Windowing};
use crate::models::{
    FormatTag, GroupBy, HostOrder, MissingHostPolicy, UnchangedPolicy, Window, WindowingKind,
};

/// Accepted local date format for `from` / `till`, besides RFC 3339.
pub const DATE_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Root configuration structure, deserialized from `.inventory-diff/config.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub window: WindowConfig,
}

/// Monitoring server connection.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Frontend base URL; the JSON-RPC endpoint is `<url>/api_jsonrpc.php`.
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Servers older than 6.4: log in with `user` and pass the session in the
    /// request body instead of an `Authorization` header.
    #[serde(default)]
    pub legacy_auth: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            url: default_url(),
            timeout_secs: default_timeout_secs(),
            legacy_auth: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
}

/// Which events and items describe package inventories.
#[derive(Debug, Deserialize)]
pub struct InventoryConfig {
    /// Name of the event fired when a host's package list changes.
    #[serde(default = "default_event_name")]
    pub event_name: String,
    /// Item keys whose values list one package per line.
    #[serde(default = "default_newline_keys")]
    pub newline_keys: Vec<String>,
    /// Item keys whose values look like `[rpm] a-1.0, b-2.0`.
    #[serde(default = "default_bracketed_keys")]
    pub bracketed_keys: Vec<String>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        InventoryConfig {
            event_name: default_event_name(),
            newline_keys: default_newline_keys(),
            bracketed_keys: default_bracketed_keys(),
        }
    }
}

impl InventoryConfig {
    /// All configured item keys, newline keys first.
    pub fn item_keys(&self) -> Vec<String> {
        self.newline_keys
            .iter()
            .chain(&self.bracketed_keys)
            .cloned()
            .collect()
    }

    pub fn format_for_key(&self, key: &str) -> Option<FormatTag> {
        if self.newline_keys.iter().any(|k| k == key) {
            Some(FormatTag::Newline)
        } else if self.bracketed_keys.iter().any(|k| k == key) {
            Some(FormatTag::BracketedCsv)
        } else {
            None
        }
    }
}

/// Report flavour.
#[derive(Debug, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_group_by")]
    pub group_by: GroupBy,
    #[serde(default = "default_windowing")]
    pub windowing: WindowingKind,
    #[serde(default = "default_missing_hosts")]
    pub missing_hosts: MissingHostPolicy,
    #[serde(default = "default_unchanged_hosts")]
    pub unchanged_hosts: UnchangedPolicy,
    #[serde(default = "default_order")]
    pub order: HostOrder,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            group_by: default_group_by(),
            windowing: default_windowing(),
            missing_hosts: default_missing_hosts(),
            unchanged_hosts: default_unchanged_hosts(),
            order: default_order(),
        }
    }
}

/// Interval lengths in hours, and the explicit range for `windowing = "range"`.
#[derive(Debug, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_search_hours")]
    pub search_hours: u32,
    #[serde(default = "default_trigger_hours")]
    pub trigger_hours: u32,
    #[serde(default = "default_fixed_hours")]
    pub fixed_hours: u32,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub till: Option<String>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            search_hours: default_search_hours(),
            trigger_hours: default_trigger_hours(),
            fixed_hours: default_fixed_hours(),
            from: None,
            till: None,
        }
    }
}

fn default_url() -> String {
    "http://localhost/zabbix".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_event_name() -> String {
    "Installed packages have changed".to_string()
}

fn default_newline_keys() -> Vec<String> {
    vec!["ubuntu.soft".to_string()]
}

fn default_bracketed_keys() -> Vec<String> {
    vec!["system.sw.packages".to_string()]
}

fn default_group_by() -> GroupBy {
    GroupBy::Diff
}

fn default_windowing() -> WindowingKind {
    WindowingKind::EventDriven
}

fn default_missing_hosts() -> MissingHostPolicy {
    MissingHostPolicy::Sentinel
}

fn default_unchanged_hosts() -> UnchangedPolicy {
    UnchangedPolicy::Exclude
}

fn default_order() -> HostOrder {
    HostOrder::Recency
}

fn default_search_hours() -> u32 {
    11
}

fn default_trigger_hours() -> u32 {
    12
}

fn default_fixed_hours() -> u32 {
    24
}

/// Load the configuration, searching in order:
///
/// 1. `config_override` — path passed via `--config`
/// 2. `<base>/.inventory-diff/config.toml`
/// 3. `~/.config/inventory-diff/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(base: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let local_config = base.join(".inventory-diff").join("config.toml");
    if local_config.exists() {
        return read_config(&local_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home
            .join(".config")
            .join("inventory-diff")
            .join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
}

impl Config {
    /// Reject settings that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        if self.server.url.trim().is_empty() {
            bail!("server.url must not be empty");
        }
        if self.window.search_hours == 0
            || self.window.trigger_hours == 0
            || self.window.fixed_hours == 0
        {
            bail!("window intervals must be at least one hour");
        }
        if self.inventory.item_keys().is_empty() {
            bail!("at least one inventory item key must be configured");
        }
        if let Some(key) = self
            .inventory
            .newline_keys
            .iter()
            .find(|k| self.inventory.bracketed_keys.contains(k))
        {
            bail!("item key '{key}' is listed as both newline and bracketed");
        }
        if self.engine.windowing == WindowingKind::Range {
            self.range_window()?;
        }
        Ok(())
    }

    /// Resolve the engine settings for this run.
    pub fn engine_settings(&self) -> Result<EngineSettings> {
        let windowing = match self.engine.windowing {
            WindowingKind::EventDriven => Windowing::EventDriven {
                search_hours: self.window.search_hours,
                trigger_hours: self.window.trigger_hours,
            },
            WindowingKind::Fixed => Windowing::Fixed {
                hours: self.window.fixed_hours,
            },
            WindowingKind::Range => Windowing::Range {
                window: self.range_window()?,
            },
        };

        Ok(EngineSettings {
            group_by: self.engine.group_by,
            windowing,
            missing_hosts: self.engine.missing_hosts,
            unchanged_hosts: self.engine.unchanged_hosts,
            order: self.engine.order,
        })
    }

    fn range_window(&self) -> Result<Window> {
        let (Some(from), Some(till)) = (&self.window.from, &self.window.till) else {
            bail!("range windowing needs both window.from and window.till");
        };
        let window = Window::new(parse_time(from)?, parse_time(till)?);
        if window.from > window.till {
            bail!("window.from ({from}) is after window.till ({till})");
        }
        Ok(window)
    }
}

/// Parse `dd.mm.yyyy HH:MM` (local time) or RFC 3339 into unix seconds.
pub fn parse_time(value: &str) -> Result<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp());
    }

    let naive = NaiveDateTime::parse_from_str(value, DATE_FORMAT)
        .with_context(|| format!("Invalid date '{value}', expected dd.mm.yyyy HH:MM"))?;
    let local = Local
        .from_local_datetime(&naive)
        .earliest()
        .with_context(|| format!("Date '{value}' does not exist in the local time zone"))?;
    Ok(local.timestamp())
}
