use std::convert::Infallible;
use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::error::BotError;
use crate::game::combo::{ComboFeed, ComboSolver};
use crate::game::sleep::{SleepArbiter, SleepProposal, SleepReason};
use crate::game::state::{AccountState, Boost, DailyCipher, DailyCombo, Task, Upgrade, FULL_ENERGY_BOOST};
use crate::game::taps::{TapEngine, TapPlan};
use crate::game::upgrades::{ChainStep, PlannerDecision, UpgradePlanner};
use crate::network::client::GameClient;

const TRANSIENT_BACKOFF_SECS: f64 = 3600.0;
const UNKNOWN_BACKOFF_SECS: f64 = 3.0;
/// Pause after claiming a reward so the server can catch up.
const SETTLE_SECS: f64 = 5.0;
const ENERGY_BOOST_COOLDOWN_SECS: i64 = 3600;
/// Purchases allowed while pushing a single combo card forward.
const MAX_SLOT_STEPS: usize = 16;

const EXCHANGES: &[&str] = &["binance", "bybit", "okx", "bingx", "htx", "kucoin"];
const PLACEHOLDER_EXCHANGE: &str = "hamster";
const SKIPPED_TASKS: &[&str] = &["invite_friends"];

/// How long to back off after a failed cycle. `None` means stop for good.
pub fn backoff_for(err: &BotError) -> Option<f64> {
    match err {
        BotError::SessionInvalid(_) => None,
        BotError::Transient { .. } => Some(TRANSIENT_BACKOFF_SECS),
        BotError::Unknown(_) | BotError::Config(_) => Some(UNKNOWN_BACKOFF_SECS),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotProgress {
    Filled,
    /// Blocked on money or cooldown; other cards may still move.
    Waiting,
    /// Cannot be advanced at all; give up on the combo this cycle.
    Blocked,
}

/// Drives a single account: fetch, decide, act, sleep, repeat.
pub struct CycleController<C, F> {
    client: C,
    feed: F,
    settings: Settings,
    planner: UpgradePlanner,
    taps: TapEngine,
    combo: ComboSolver,
    arbiter: SleepArbiter,
    rng: StdRng,

    account: AccountState,
    upgrades: Vec<Upgrade>,
    boosts: Vec<Boost>,
    tasks: Vec<Task>,
    daily_combo: DailyCombo,
}

impl<C: GameClient, F: ComboFeed> CycleController<C, F> {
    pub fn new(client: C, feed: F, settings: Settings) -> Self {
        Self::with_rng(client, feed, settings, StdRng::from_entropy())
    }

    pub fn with_rng(client: C, feed: F, settings: Settings, rng: StdRng) -> Self {
        Self {
            planner: UpgradePlanner::new(
                settings.balance_strategy,
                settings.wait_for_most_profit_upgrades,
                settings.max_sleep_time,
            ),
            taps: TapEngine::new(settings.min_taps_for_clicker_in_percent),
            combo: ComboSolver::new(),
            arbiter: SleepArbiter::new(settings.idle_sleep_time),
            client,
            feed,
            settings,
            rng,
            account: AccountState::default(),
            upgrades: Vec::new(),
            boosts: Vec::new(),
            tasks: Vec::new(),
            daily_combo: DailyCombo::default(),
        }
    }

    /// Loop forever. Returns only when the session is no longer usable.
    pub async fn run(&mut self) -> Result<Infallible, BotError> {
        loop {
            match self.run_cycle().await {
                Ok(next) => self.sleep_until_next_cycle(next).await,
                Err(e) => {
                    self.arbiter.clear();
                    let Some(backoff) = backoff_for(&e) else {
                        error!("Invalid session: {}", e);
                        return Err(e);
                    };
                    match &e {
                        BotError::Transient { .. } => error!("Client response error: {}", e),
                        _ => error!("Unknown error: {:?}", e),
                    }
                    info!("Sleep {}s before next iteration because of error", backoff);
                    self.sleep(backoff).await;
                }
            }
        }
    }

    /// One pass over the account. Returns the wait chosen for this cycle.
    pub async fn run_cycle(&mut self) -> Result<SleepProposal, BotError> {
        let config = self.client.fetch_config().await?;
        self.account = self.client.fetch_account().await?;
        self.ensure_exchange().await?;

        info!(
            "Last passive earn: +{:.0} | Earn every hour: {:.0}",
            self.account.last_passive_earn, self.account.earn_per_hour
        );
        info!(
            "[id: {}] [balance: {:.0}] [pph: {:.0}]",
            self.account.id, self.account.balance, self.account.earn_per_hour
        );

        let (upgrades, daily_combo) = self.client.fetch_upgrades().await?;
        self.upgrades = upgrades;
        self.daily_combo = daily_combo;
        self.boosts = self.client.fetch_boosts().await?;
        self.tasks = self.client.fetch_tasks().await?;

        if let Some(cipher) = &config.daily_cipher {
            self.claim_cipher(cipher).await?;
        }

        self.complete_tasks().await?;

        if self.settings.auto_clicker {
            self.tap_and_boost().await?;
        }

        if self.settings.auto_upgrade {
            self.make_upgrades().await?;
        }

        Ok(self.arbiter.resolve())
    }

    /// The only place time passes. Local energy and balance accrue as the
    /// server would accrue them.
    pub async fn sleep(&mut self, secs: f64) {
        let mut secs = secs.max(0.0);
        let duration = match Duration::try_from_secs_f64(secs) {
            Ok(duration) => duration,
            Err(_) => {
                secs = self.settings.max_sleep_time;
                Duration::from_secs_f64(secs)
            }
        };
        tokio::time::sleep(duration).await;
        self.account.accrue(secs);
    }

    async fn sleep_until_next_cycle(&mut self, next: SleepProposal) {
        let secs = next.remaining(self.settings.min_sleep_time);
        match next.reason {
            SleepReason::UpgradeMoney => info!("Sleep {:.0}s for earn money for upgrades", secs),
            SleepReason::UpgradeCooldown => info!("Sleep {:.0}s for waiting cooldown for upgrades", secs),
            SleepReason::EnergyRecover => info!("Sleep {:.0}s for recover full energy", secs),
            SleepReason::Idle => info!("Sleep {:.0}s before next iteration", secs),
        }
        self.sleep(secs).await;
    }

    // ── Rewards ─────────────────────────────────────────────────────

    async fn ensure_exchange(&mut self) -> Result<(), BotError> {
        let needs_exchange = match self.account.exchange_id.as_deref() {
            None => true,
            Some(id) => id == PLACEHOLDER_EXCHANGE,
        };
        if !needs_exchange {
            return Ok(());
        }

        let exchange = EXCHANGES[self.rng.gen_range(0..EXCHANGES.len())];
        if !self.client.select_exchange(exchange).await? {
            warn!("Exchange {} was not confirmed by the server", exchange);
            return Ok(());
        }
        if self.client.complete_task("select_exchange").await? {
            self.account.exchange_id = Some(exchange.to_string());
            info!("Successfully selected exchange {}", exchange);
        }
        Ok(())
    }

    async fn claim_cipher(&mut self, cipher: &DailyCipher) -> Result<(), BotError> {
        if cipher.is_claimed {
            return Ok(());
        }
        let decoded = match cipher.decode() {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("Skipping daily cipher: {}", e);
                return Ok(());
            }
        };

        match self.client.claim_cipher(&decoded).await {
            Ok(account) => {
                self.account = account;
                info!(
                    "Successfully get cipher reward | Cipher: {} | Reward coins: +{:.0}",
                    decoded, cipher.bonus_coins
                );
                self.sleep(SETTLE_SECS).await;
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Failed to claim daily cipher: {}", e);
                Ok(())
            }
        }
    }

    async fn complete_tasks(&mut self) -> Result<(), BotError> {
        let pending: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| !t.is_completed && !SKIPPED_TASKS.contains(&t.id.as_str()))
            .cloned()
            .collect();

        for task in pending {
            if !self.client.complete_task(&task.id).await? {
                continue;
            }
            let reward = task.reward();
            self.account.balance += reward;
            if task.id == "streak_days" {
                info!(
                    "Successfully get daily reward | Days: {} | Balance: {:.0} (+{:.0})",
                    task.days, self.account.balance, reward
                );
            } else {
                info!(
                    "Successfully get reward for task {} | Balance: {:.0} (+{:.0})",
                    task.id, self.account.balance, reward
                );
            }
        }
        Ok(())
    }

    // ── Tapping ─────────────────────────────────────────────────────

    async fn tap_and_boost(&mut self) -> Result<(), BotError> {
        self.maybe_tap().await?;

        let since_boost = Utc::now().timestamp() - self.account.last_energy_boost_time;
        if self.settings.apply_daily_energy && since_boost >= ENERGY_BOOST_COOLDOWN_SECS {
            info!("Sleep {}s before checking energy boost", SETTLE_SECS);
            self.sleep(SETTLE_SECS).await;
            if self.apply_energy_boost().await? {
                self.maybe_tap().await?;
            }
        }

        let delay = TapEngine::energy_recovery_delay(&self.account)?;
        self.arbiter.propose(delay, SleepReason::EnergyRecover);
        Ok(())
    }

    /// Spend the energy pool if there is enough of it. Returns whether taps
    /// were sent.
    pub async fn maybe_tap(&mut self) -> Result<bool, BotError> {
        let action = match self.taps.plan(&self.account, &mut self.rng)? {
            TapPlan::Insufficient { available, required } => {
                info!("Not enough taps: {}/{}", available, required);
                return Ok(false);
            }
            TapPlan::BelowThreshold { available, threshold } => {
                info!("Not enough taps for launch clicker: {}/{:.0}", available, threshold);
                return Ok(false);
            }
            TapPlan::Tap(action) => action,
        };

        info!("Sleep {}s before taps", action.delay_secs);
        self.sleep(action.delay_secs as f64).await;

        let previous_balance = self.account.balance;
        let account = self.client.send_taps(action.energy, action.taps).await?;
        let gained = account.balance - previous_balance;
        self.account = account;

        info!(
            "Successfully tapped {} times! | Balance: {:.0} (+{:.0})",
            action.taps, self.account.balance, gained
        );
        Ok(true)
    }

    async fn apply_energy_boost(&mut self) -> Result<bool, BotError> {
        let Some(boost) = self.boosts.iter().find(|b| b.id == FULL_ENERGY_BOOST) else {
            return Ok(false);
        };
        if !boost.can_apply() {
            return Ok(false);
        }

        self.account = self.client.apply_boost(FULL_ENERGY_BOOST).await?;
        info!("Successfully apply energy boost");
        Ok(true)
    }

    // ── Upgrades ────────────────────────────────────────────────────

    async fn make_upgrades(&mut self) -> Result<(), BotError> {
        self.check_daily_combo().await?;

        loop {
            match self.planner.decide(&self.upgrades, &self.account) {
                PlannerDecision::Nothing => {
                    info!("No available upgrades");
                    break;
                }
                PlannerDecision::WaitMoney { upgrade, delay } => {
                    info!("Not enough money for upgrade {}", upgrade.name);
                    self.arbiter.propose(delay, SleepReason::UpgradeMoney);
                    break;
                }
                PlannerDecision::WaitCooldown { upgrade, delay } => {
                    info!("Upgrade {} on cooldown for {}s", upgrade.name, delay);
                    self.arbiter.propose(delay, SleepReason::UpgradeCooldown);
                    break;
                }
                PlannerDecision::Buy(upgrade) => self.do_upgrade(&upgrade).await?,
            }
        }
        Ok(())
    }

    async fn do_upgrade(&mut self, upgrade: &Upgrade) -> Result<(), BotError> {
        let (low, high) = self.settings.sleep_interval_before_upgrade;
        let pause = self.rng.gen_range(low..=high);
        info!("Sleep {}s before upgrade {}", pause, upgrade.name);
        self.sleep(pause as f64).await;

        let outcome = self.client.buy_upgrade(&upgrade.id).await?;
        self.account = outcome.account;
        self.upgrades = outcome.upgrades;
        self.daily_combo = outcome.daily_combo;

        let level = self
            .upgrades
            .iter()
            .find(|u| u.id == upgrade.id)
            .map(|u| u.level)
            .unwrap_or(upgrade.level + 1);
        info!(
            "Successfully upgraded {} to {} lvl | Earn every hour: {:.0} (+{:.0})",
            upgrade.name, level, self.account.earn_per_hour, upgrade.earn_per_hour
        );
        Ok(())
    }

    // ── Daily combo ─────────────────────────────────────────────────

    async fn check_daily_combo(&mut self) -> Result<(), BotError> {
        if self.daily_combo.is_claimed {
            return Ok(());
        }
        if self.try_claim_combo().await? {
            return Ok(());
        }

        let ids = self.combo.resolve(&self.feed, Utc::now()).await;
        if ids.is_empty() {
            return Ok(());
        }

        for id in &ids {
            if self.daily_combo.contains(id) {
                continue;
            }
            match self.advance_combo_slot(id).await? {
                SlotProgress::Filled | SlotProgress::Waiting => continue,
                SlotProgress::Blocked => return Ok(()),
            }
        }

        self.try_claim_combo().await?;
        Ok(())
    }

    /// Buy `id`, or whatever its unlock chain needs first, until the card
    /// lands in today's combo or something blocks.
    async fn advance_combo_slot(&mut self, id: &str) -> Result<SlotProgress, BotError> {
        for _ in 0..MAX_SLOT_STEPS {
            if self.daily_combo.contains(id) {
                return Ok(SlotProgress::Filled);
            }
            let Some(target) = self.upgrades.iter().find(|u| u.id == id) else {
                info!("Combo card {} is not on offer. Skipped", id);
                return Ok(SlotProgress::Blocked);
            };

            match self.planner.chain_step(target, &self.upgrades, &self.account)? {
                ChainStep::Blocked { upgrade_id, reason } => {
                    info!(
                        "Can't upgrade {} for daily combo ({}: {}). Skipped",
                        id, upgrade_id, reason
                    );
                    return Ok(SlotProgress::Blocked);
                }
                ChainStep::Gated(PlannerDecision::Buy(upgrade)) => {
                    self.do_upgrade(&upgrade).await?;
                    info!("Upgrade {} for daily combo is done.", upgrade.name);
                    if upgrade.id == id && !self.daily_combo.contains(id) {
                        warn!("Bought {} but it did not count towards the combo", id);
                        return Ok(SlotProgress::Blocked);
                    }
                }
                ChainStep::Gated(PlannerDecision::WaitMoney { upgrade, delay }) => {
                    info!("Not enough money for combo upgrade {}", upgrade.name);
                    self.arbiter.propose(delay, SleepReason::UpgradeMoney);
                    return Ok(SlotProgress::Waiting);
                }
                ChainStep::Gated(PlannerDecision::WaitCooldown { upgrade, delay }) => {
                    info!("Combo upgrade {} on cooldown for {}s", upgrade.name, delay);
                    self.arbiter.propose(delay, SleepReason::UpgradeCooldown);
                    return Ok(SlotProgress::Waiting);
                }
                ChainStep::Gated(PlannerDecision::Nothing) => return Ok(SlotProgress::Blocked),
            }
        }

        if self.daily_combo.contains(id) {
            Ok(SlotProgress::Filled)
        } else {
            Ok(SlotProgress::Waiting)
        }
    }

    async fn try_claim_combo(&mut self) -> Result<bool, BotError> {
        if !self.daily_combo.is_claimable() {
            return Ok(false);
        }

        match self.client.claim_combo().await {
            Ok(account) => {
                self.account = account;
                self.daily_combo.is_claimed = true;
                info!(
                    "Successfully get daily combo reward | Reward coins: +{:.0}",
                    self.daily_combo.bonus_coins
                );
                self.sleep(SETTLE_SECS).await;
                Ok(true)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Failed to claim daily combo: {}", e);
                Ok(false)
            }
        }
    }
}
