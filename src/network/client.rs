use crate::error::BotError;
use crate::game::state::{AccountState, Boost, DailyCombo, GameConfig, Task, Upgrade};

/// Fresh state returned by the server after buying an upgrade.
#[derive(Debug, Clone)]
pub struct PurchaseOutcome {
    pub account: AccountState,
    pub upgrades: Vec<Upgrade>,
    pub daily_combo: DailyCombo,
}

/// Everything the cycle needs from the game backend.
///
/// Calls for one account are issued strictly one at a time.
#[allow(async_fn_in_trait)]
pub trait GameClient {
    async fn fetch_account(&self) -> Result<AccountState, BotError>;
    async fn fetch_upgrades(&self) -> Result<(Vec<Upgrade>, DailyCombo), BotError>;
    async fn fetch_boosts(&self) -> Result<Vec<Boost>, BotError>;
    async fn fetch_tasks(&self) -> Result<Vec<Task>, BotError>;
    async fn fetch_config(&self) -> Result<GameConfig, BotError>;
    async fn select_exchange(&self, exchange_id: &str) -> Result<bool, BotError>;
    async fn claim_cipher(&self, decoded: &str) -> Result<AccountState, BotError>;
    async fn claim_combo(&self) -> Result<AccountState, BotError>;
    async fn buy_upgrade(&self, upgrade_id: &str) -> Result<PurchaseOutcome, BotError>;
    async fn apply_boost(&self, boost_id: &str) -> Result<AccountState, BotError>;
    async fn send_taps(&self, energy: i64, taps: i64) -> Result<AccountState, BotError>;
    async fn complete_task(&self, task_id: &str) -> Result<bool, BotError>;
}
