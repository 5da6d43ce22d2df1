use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::BotError;

const ENV_PREFIX: &str = "CLICKER_";
const DEFAULT_API_BASE_URL: &str = "https://api.hamsterkombatgame.io";
const DEFAULT_DAILY_JSON_URL: &str = "https://dntaya.github.io/HamsterKombatBot/daily_combo.json";

/// Runtime policy for one account loop. Built once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub auto_upgrade: bool,
    pub auto_clicker: bool,
    pub apply_daily_energy: bool,
    pub wait_for_most_profit_upgrades: bool,
    pub min_taps_for_clicker_in_percent: u32,
    /// Hours of passive income kept out of upgrade spending.
    pub balance_strategy: f64,
    pub max_sleep_time: f64,
    pub min_sleep_time: f64,
    pub idle_sleep_time: f64,
    pub sleep_interval_before_upgrade: (u64, u64),
    pub daily_json_url: String,
    pub api_base_url: String,
    pub profile_dir: PathBuf,
    pub profile: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_upgrade: true,
            auto_clicker: true,
            apply_daily_energy: true,
            wait_for_most_profit_upgrades: true,
            min_taps_for_clicker_in_percent: 80,
            balance_strategy: 10.0,
            max_sleep_time: 10800.0,
            min_sleep_time: 40.0,
            idle_sleep_time: 3600.0,
            sleep_interval_before_upgrade: (7, 30),
            daily_json_url: DEFAULT_DAILY_JSON_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            profile_dir: default_profile_dir(),
            profile: None,
        }
    }
}

fn default_profile_dir() -> PathBuf {
    let local = PathBuf::from("profiles");
    if local.is_dir() {
        return local;
    }
    dirs::home_dir()
        .map(|h| h.join(".clicker-autopilot").join("profiles"))
        .unwrap_or(local)
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, BotError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(BotError::Config(format!("{} must be a boolean, got {:?}", key, raw))),
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, BotError> {
    raw.trim()
        .parse()
        .map_err(|_| BotError::Config(format!("{} must be a number, got {:?}", key, raw)))
}

fn parse_range(key: &str, raw: &str) -> Result<(u64, u64), BotError> {
    let cleaned = raw.trim().trim_start_matches('[').trim_end_matches(']');
    let parts: Vec<&str> = cleaned.split(',').collect();
    if parts.len() != 2 {
        return Err(BotError::Config(format!("{} must look like \"7,30\", got {:?}", key, raw)));
    }
    let low: u64 = parse_num(key, parts[0])?;
    let high: u64 = parse_num(key, parts[1])?;
    if low > high {
        return Err(BotError::Config(format!("{} lower bound exceeds upper bound", key)));
    }
    Ok((low, high))
}

impl Settings {
    /// Read settings from the process environment (after `.env` is loaded).
    pub fn from_env() -> Result<Self, BotError> {
        Self::from_lookup(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, BotError> {
        let get = |name: &str| {
            let key = format!("{}{}", ENV_PREFIX, name);
            lookup(&key).map(|v| (key, v))
        };
        let mut settings = Settings::default();

        if let Some((k, v)) = get("AUTO_UPGRADE") {
            settings.auto_upgrade = parse_bool(&k, &v)?;
        }
        if let Some((k, v)) = get("AUTO_CLICKER") {
            settings.auto_clicker = parse_bool(&k, &v)?;
        }
        if let Some((k, v)) = get("APPLY_DAILY_ENERGY") {
            settings.apply_daily_energy = parse_bool(&k, &v)?;
        }
        if let Some((k, v)) = get("WAIT_FOR_MOST_PROFIT_UPGRADES") {
            settings.wait_for_most_profit_upgrades = parse_bool(&k, &v)?;
        }
        if let Some((k, v)) = get("MIN_TAPS_FOR_CLICKER_IN_PERCENT") {
            settings.min_taps_for_clicker_in_percent = parse_num(&k, &v)?;
        }
        if let Some((k, v)) = get("BALANCE_STRATEGY") {
            settings.balance_strategy = parse_num(&k, &v)?;
        }
        if let Some((k, v)) = get("MAX_SLEEP_TIME") {
            settings.max_sleep_time = parse_num(&k, &v)?;
        }
        if let Some((k, v)) = get("MIN_SLEEP_TIME") {
            settings.min_sleep_time = parse_num(&k, &v)?;
        }
        if let Some((k, v)) = get("SLEEP_INTERVAL_BEFORE_UPGRADE") {
            settings.sleep_interval_before_upgrade = parse_range(&k, &v)?;
        }
        if let Some((_, v)) = get("DAILY_JSON_URL") {
            settings.daily_json_url = v;
        }
        if let Some((_, v)) = get("API_BASE_URL") {
            settings.api_base_url = v;
        }
        if let Some((_, v)) = get("PROFILE_DIR") {
            settings.profile_dir = PathBuf::from(v);
        }
        settings.profile = get("PROFILE").map(|(_, v)| v);

        if settings.min_taps_for_clicker_in_percent > 100 {
            return Err(BotError::Config(
                "CLICKER_MIN_TAPS_FOR_CLICKER_IN_PERCENT must be at most 100".to_string(),
            ));
        }
        Ok(settings)
    }
}

// ── Profiles ────────────────────────────────────────────────────────

/// Credentials and transport options for one game account.
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub name: String,
    pub token: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub proxy: Option<String>,
}

impl Profile {
    pub fn load_from_file(path: &Path) -> Result<Self, BotError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| BotError::Config(format!("Failed to read profile {}: {}", path.display(), e)))?;
        serde_json::from_str(&contents)
            .map_err(|e| BotError::Config(format!("Failed to parse profile {}: {}", path.display(), e)))
    }

    /// Load `name` from `dir`, or the first profile (by file name) when no
    /// name is given.
    pub fn load(dir: &Path, name: Option<&str>) -> Result<Self, BotError> {
        if let Some(name) = name {
            return Self::load_from_file(&dir.join(format!("{}.json", name)));
        }

        let entries = std::fs::read_dir(dir)
            .map_err(|e| BotError::Config(format!("Failed to read profile dir {}: {}", dir.display(), e)))?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        paths.sort();

        for path in &paths {
            match Self::load_from_file(path) {
                Ok(profile) => {
                    info!("Loaded profile {} from {}", profile.name, path.display());
                    return Ok(profile);
                }
                Err(e) => warn!("{}. Skipping.", e),
            }
        }
        Err(BotError::Config(format!("No usable profile found in {}", dir.display())))
    }
}
