//! In-memory game backend used by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::BotError;
use crate::game::combo::{ComboFeed, ComboHint};
use crate::game::state::{
    AccountState, Boost, DailyCombo, GameConfig, Task, Upgrade, UpgradeCondition, FULL_ENERGY_BOOST,
};
use crate::network::client::{GameClient, PurchaseOutcome};

#[derive(Debug, Default)]
pub struct FakeState {
    pub account: AccountState,
    pub upgrades: Vec<Upgrade>,
    pub daily_combo: DailyCombo,
    /// Cards that count towards today's combo when bought.
    pub combo_targets: Vec<String>,
    pub boosts: Vec<Boost>,
    pub tasks: Vec<Task>,
    pub config: GameConfig,
    /// Returned (once) by the next `fetch_account`.
    pub fail_next_fetch: Option<BotError>,
    /// Returned (once) by the next cipher or combo claim.
    pub fail_next_claim: Option<BotError>,
    /// Exchange selection is answered with a different exchange.
    pub reject_exchange: bool,
    pub calls: Vec<String>,
}

#[derive(Default)]
pub struct FakeClient {
    pub state: Mutex<FakeState>,
}

impl FakeClient {
    pub fn new(state: FakeState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, prefix: &str) -> Vec<String> {
        self.calls().into_iter().filter(|c| c.starts_with(prefix)).collect()
    }

    fn record(&self, call: String) -> std::sync::MutexGuard<'_, FakeState> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state
    }
}

impl GameClient for FakeClient {
    async fn fetch_account(&self) -> Result<AccountState, BotError> {
        let mut state = self.record("fetch_account".to_string());
        if let Some(err) = state.fail_next_fetch.take() {
            return Err(err);
        }
        Ok(state.account.clone())
    }

    async fn fetch_upgrades(&self) -> Result<(Vec<Upgrade>, DailyCombo), BotError> {
        let state = self.record("fetch_upgrades".to_string());
        Ok((state.upgrades.clone(), state.daily_combo.clone()))
    }

    async fn fetch_boosts(&self) -> Result<Vec<Boost>, BotError> {
        Ok(self.record("fetch_boosts".to_string()).boosts.clone())
    }

    async fn fetch_tasks(&self) -> Result<Vec<Task>, BotError> {
        Ok(self.record("fetch_tasks".to_string()).tasks.clone())
    }

    async fn fetch_config(&self) -> Result<GameConfig, BotError> {
        Ok(self.record("fetch_config".to_string()).config.clone())
    }

    async fn select_exchange(&self, exchange_id: &str) -> Result<bool, BotError> {
        let mut state = self.record(format!("select_exchange:{}", exchange_id));
        if state.reject_exchange {
            return Ok(false);
        }
        state.account.exchange_id = Some(exchange_id.to_string());
        Ok(true)
    }

    async fn claim_cipher(&self, decoded: &str) -> Result<AccountState, BotError> {
        let mut state = self.record(format!("claim_cipher:{}", decoded));
        if let Some(err) = state.fail_next_claim.take() {
            return Err(err);
        }
        if let Some(cipher) = state.config.daily_cipher.as_mut() {
            cipher.is_claimed = true;
            let bonus = cipher.bonus_coins;
            state.account.balance += bonus;
        }
        Ok(state.account.clone())
    }

    async fn claim_combo(&self) -> Result<AccountState, BotError> {
        let mut state = self.record("claim_combo".to_string());
        if let Some(err) = state.fail_next_claim.take() {
            return Err(err);
        }
        if !state.daily_combo.is_claimable() {
            return Err(BotError::Transient {
                status: 400,
                message: "combo not complete".to_string(),
            });
        }
        state.daily_combo.is_claimed = true;
        let bonus = state.daily_combo.bonus_coins;
        state.account.balance += bonus;
        Ok(state.account.clone())
    }

    async fn buy_upgrade(&self, upgrade_id: &str) -> Result<PurchaseOutcome, BotError> {
        let mut state = self.record(format!("buy_upgrade:{}", upgrade_id));
        let state = &mut *state;

        let Some(bought) = state.upgrades.iter_mut().find(|u| u.id == upgrade_id) else {
            return Err(BotError::Transient {
                status: 400,
                message: format!("unknown upgrade {}", upgrade_id),
            });
        };
        if bought.price > state.account.balance {
            return Err(BotError::Transient {
                status: 400,
                message: "insufficient funds".to_string(),
            });
        }
        state.account.balance -= bought.price;
        state.account.earn_per_hour += bought.earn_per_hour;
        bought.level += 1;
        let new_level = bought.level;

        for upgrade in state.upgrades.iter_mut() {
            if let Some(UpgradeCondition::ByUpgrade { upgrade_id: prereq, level }) = &upgrade.condition {
                if prereq == upgrade_id && new_level >= *level {
                    upgrade.is_available = true;
                }
            }
        }

        if state.combo_targets.iter().any(|t| t == upgrade_id) && !state.daily_combo.contains(upgrade_id) {
            state.daily_combo.upgrade_ids.push(upgrade_id.to_string());
        }

        Ok(PurchaseOutcome {
            account: state.account.clone(),
            upgrades: state.upgrades.clone(),
            daily_combo: state.daily_combo.clone(),
        })
    }

    async fn apply_boost(&self, boost_id: &str) -> Result<AccountState, BotError> {
        let mut state = self.record(format!("apply_boost:{}", boost_id));
        if boost_id == FULL_ENERGY_BOOST {
            state.account.available_energy = state.account.max_energy;
        }
        Ok(state.account.clone())
    }

    async fn send_taps(&self, energy: i64, taps: i64) -> Result<AccountState, BotError> {
        let mut state = self.record(format!("send_taps:{}:{}", energy, taps));
        let spent = (taps as f64 * state.account.earn_per_tap).min(state.account.available_energy);
        state.account.available_energy -= spent;
        state.account.balance += spent;
        Ok(state.account.clone())
    }

    async fn complete_task(&self, task_id: &str) -> Result<bool, BotError> {
        let mut state = self.record(format!("complete_task:{}", task_id));
        match state.tasks.iter_mut().find(|t| t.id == task_id) {
            Some(task) => {
                task.is_completed = true;
                Ok(true)
            }
            None => Ok(task_id == "select_exchange"),
        }
    }
}

/// Combo feed that serves a fixed hint, or always fails.
pub struct FakeFeed {
    hint: Option<ComboHint>,
    calls: AtomicUsize,
}

impl FakeFeed {
    pub fn with_hint(hint: ComboHint) -> Self {
        Self {
            hint: Some(hint),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            hint: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ComboFeed for FakeFeed {
    async fn fetch(&self) -> Result<ComboHint, BotError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.hint
            .clone()
            .ok_or_else(|| BotError::Unknown("feed unavailable".to_string()))
    }
}
