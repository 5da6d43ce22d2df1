use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use crate::error::BotError;

// ── Account ──────────────────────────────────────────────────────────

/// Snapshot of the account as last reported by the server, plus whatever
/// passive accrual has been simulated locally since.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountState {
    pub id: String,
    pub balance: f64,
    pub earn_per_hour: f64,
    pub earn_per_sec: f64,
    pub last_passive_earn: f64,
    pub available_energy: f64,
    pub max_energy: f64,
    pub energy_recover_per_sec: f64,
    pub earn_per_tap: f64,
    /// Unix seconds of the last full-energy boost.
    pub last_energy_boost_time: i64,
    pub exchange_id: Option<String>,
}

impl AccountState {
    /// Advance passive income and energy recovery by `secs` seconds.
    pub fn accrue(&mut self, secs: f64) {
        self.available_energy =
            (self.available_energy + self.energy_recover_per_sec * secs).min(self.max_energy);
        self.balance += self.earn_per_sec * secs;
    }
}

// ── Upgrades ─────────────────────────────────────────────────────────

/// Unlock requirement attached to an upgrade card.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "_type")]
pub enum UpgradeCondition {
    ByUpgrade {
        #[serde(rename = "upgradeId")]
        upgrade_id: String,
        #[serde(default)]
        level: u32,
    },
    SubscribeTelegramChannel,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Upgrade {
    pub id: String,
    pub name: String,
    pub level: u32,
    pub max_level: u32,
    pub price: f64,
    /// Hourly income gained by buying the next level.
    pub earn_per_hour: f64,
    pub is_available: bool,
    pub is_expired: bool,
    pub cooldown_seconds: u64,
    pub condition: Option<UpgradeCondition>,
}

impl Upgrade {
    pub fn can_upgrade(&self) -> bool {
        self.is_available
            && !self.is_expired
            && self.earn_per_hour != 0.0
            && self.level <= self.max_level
            && self.condition != Some(UpgradeCondition::SubscribeTelegramChannel)
    }
}

// ── Daily rewards ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyCombo {
    pub upgrade_ids: Vec<String>,
    pub bonus_coins: f64,
    pub is_claimed: bool,
}

impl DailyCombo {
    pub const SLOTS: usize = 3;

    pub fn is_claimable(&self) -> bool {
        !self.is_claimed && self.upgrade_ids.len() == Self::SLOTS
    }

    pub fn contains(&self, id: &str) -> bool {
        self.upgrade_ids.iter().any(|u| u == id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyCipher {
    pub cipher: String,
    pub bonus_coins: f64,
    pub is_claimed: bool,
}

impl DailyCipher {
    /// The published cipher is base64 with one junk character spliced in at
    /// index 3.
    pub fn decode(&self) -> Result<String, BotError> {
        let mut chars: Vec<char> = self.cipher.chars().collect();
        if chars.len() <= 3 {
            return Err(BotError::Unknown(format!(
                "cipher too short to decode: {:?}",
                self.cipher
            )));
        }
        chars.remove(3);
        let encoded: String = chars.into_iter().collect();

        let bytes = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| BotError::Unknown(format!("Failed to decode cipher: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| BotError::Unknown(format!("Cipher is not valid UTF-8: {}", e)))
    }
}

/// Server-side game configuration relevant to the bot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameConfig {
    pub daily_cipher: Option<DailyCipher>,
}

// ── Boosts & tasks ───────────────────────────────────────────────────

pub const FULL_ENERGY_BOOST: &str = "BoostFullAvailableTaps";

#[derive(Debug, Clone, PartialEq)]
pub struct Boost {
    pub id: String,
    pub level: u32,
    pub max_level: u32,
    pub cooldown_seconds: u64,
}

impl Boost {
    pub fn can_apply(&self) -> bool {
        self.cooldown_seconds == 0 && self.level <= self.max_level
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DayReward {
    pub days: u32,
    pub reward_coins: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Task {
    pub id: String,
    pub is_completed: bool,
    pub reward_coins: f64,
    pub rewards_by_days: Vec<DayReward>,
    pub days: u32,
}

impl Task {
    /// Coins credited when the task completes. Streak tasks pay by day.
    pub fn reward(&self) -> f64 {
        if self.days > 0 {
            if let Some(day) = self.rewards_by_days.get(self.days as usize - 1) {
                return day.reward_coins;
            }
        }
        self.reward_coins
    }
}
