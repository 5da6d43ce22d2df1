use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::game::state::{
    AccountState, Boost, DailyCipher, DailyCombo, Task, Upgrade, UpgradeCondition, FULL_ENERGY_BOOST,
};

// ── Account ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserBoost {
    pub id: String,
    pub level: u32,
    pub last_upgrade_at: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClickerUser {
    pub id: String,
    pub balance_coins: f64,
    pub earn_passive_per_hour: f64,
    pub earn_passive_per_sec: f64,
    pub last_passive_earn: f64,
    pub available_taps: f64,
    pub max_taps: f64,
    pub taps_recover_per_sec: f64,
    pub earn_per_tap: f64,
    pub exchange_id: Option<String>,
    pub boosts: HashMap<String, UserBoost>,
}

impl From<ClickerUser> for AccountState {
    fn from(user: ClickerUser) -> Self {
        let last_energy_boost_time = user
            .boosts
            .get(FULL_ENERGY_BOOST)
            .map(|b| b.last_upgrade_at)
            .unwrap_or(0);
        AccountState {
            id: user.id,
            balance: user.balance_coins,
            earn_per_hour: user.earn_passive_per_hour,
            earn_per_sec: user.earn_passive_per_sec,
            last_passive_earn: user.last_passive_earn,
            available_energy: user.available_taps,
            max_energy: user.max_taps,
            energy_recover_per_sec: user.taps_recover_per_sec,
            earn_per_tap: user.earn_per_tap,
            last_energy_boost_time,
            exchange_id: user.exchange_id.filter(|id| !id.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub clicker_user: ClickerUser,
}

// ── Upgrades ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeDto {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub level: u32,
    pub max_level: Option<u32>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub profit_per_hour_delta: f64,
    #[serde(default)]
    pub is_available: bool,
    #[serde(default)]
    pub is_expired: bool,
    #[serde(default)]
    pub cooldown_seconds: u64,
    #[serde(default)]
    pub condition: Option<UpgradeCondition>,
}

impl From<UpgradeDto> for Upgrade {
    fn from(dto: UpgradeDto) -> Self {
        Upgrade {
            max_level: dto.max_level.unwrap_or(dto.level),
            id: dto.id,
            name: dto.name,
            level: dto.level,
            price: dto.price,
            earn_per_hour: dto.profit_per_hour_delta,
            is_available: dto.is_available,
            is_expired: dto.is_expired,
            cooldown_seconds: dto.cooldown_seconds,
            condition: dto.condition,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradesResponse {
    #[serde(default)]
    pub upgrades_for_buy: Vec<UpgradeDto>,
    #[serde(default)]
    pub daily_combo: DailyCombo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyUpgradeResponse {
    pub clicker_user: ClickerUser,
    #[serde(default)]
    pub upgrades_for_buy: Vec<UpgradeDto>,
    #[serde(default)]
    pub daily_combo: DailyCombo,
}

// ── Boosts, tasks, config ──────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostDto {
    pub id: String,
    #[serde(default)]
    pub level: u32,
    pub max_level: Option<u32>,
    #[serde(default)]
    pub cooldown_seconds: u64,
}

impl From<BoostDto> for Boost {
    fn from(dto: BoostDto) -> Self {
        Boost {
            max_level: dto.max_level.unwrap_or(dto.level),
            id: dto.id,
            level: dto.level,
            cooldown_seconds: dto.cooldown_seconds,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostsResponse {
    #[serde(default)]
    pub boosts_for_buy: Vec<BoostDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TasksResponse {
    #[serde(default)]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckTaskResponse {
    pub task: Task,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigResponse {
    pub daily_cipher: Option<DailyCipher>,
}

// ── Requests ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TapRequest {
    pub count: i64,
    pub available_taps: i64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyUpgradeRequest {
    pub upgrade_id: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyBoostRequest {
    pub boost_id: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckTaskRequest {
    pub task_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectExchangeRequest {
    pub exchange_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimCipherRequest {
    pub cipher: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_payload_fills_missing_fields() {
        let json = r#"{"clickerUser":{
            "id":"42","balanceCoins":1500.5,"earnPassivePerHour":3600,
            "earnPassivePerSec":1,"availableTaps":500,"maxTaps":1000,
            "tapsRecoverPerSec":3,"earnPerTap":1,
            "boosts":{"BoostFullAvailableTaps":{"id":"BoostFullAvailableTaps","level":2,"lastUpgradeAt":1719700000}}
        }}"#;
        let account: AccountState = serde_json::from_str::<UserResponse>(json).unwrap().clicker_user.into();

        assert_eq!(account.balance, 1500.5);
        assert_eq!(account.available_energy, 500.0);
        assert_eq!(account.last_energy_boost_time, 1719700000);
        assert_eq!(account.exchange_id, None);
        assert_eq!(account.last_passive_earn, 0.0);
    }

    #[test]
    fn upgrade_without_max_level_caps_at_current() {
        let json = r#"{"upgradesForBuy":[{
            "id":"ceo","name":"CEO","level":4,"price":1200,"profitPerHourDelta":90,
            "isAvailable":false,"isExpired":false,
            "condition":{"_type":"ByUpgrade","upgradeId":"hr","level":5}
        }],"dailyCombo":{"upgradeIds":["ceo"],"bonusCoins":5000000,"isClaimed":false}}"#;
        let response: UpgradesResponse = serde_json::from_str(json).unwrap();
        let upgrade: Upgrade = response.upgrades_for_buy[0].clone().into();

        assert_eq!(upgrade.max_level, 4);
        assert_eq!(upgrade.cooldown_seconds, 0);
        assert_eq!(
            upgrade.condition,
            Some(UpgradeCondition::ByUpgrade {
                upgrade_id: "hr".to_string(),
                level: 5
            })
        );
        assert_eq!(response.daily_combo.upgrade_ids, vec!["ceo"]);
    }

    #[test]
    fn tap_request_uses_camel_case() {
        let body = serde_json::to_value(TapRequest {
            count: 10,
            available_taps: 90,
            timestamp: 1,
        })
        .unwrap();
        assert_eq!(body["availableTaps"], 90);
    }
}
