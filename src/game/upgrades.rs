use std::collections::HashSet;

use crate::error::BotError;
use crate::game::state::{AccountState, Upgrade, UpgradeCondition};

/// Longest prerequisite chain walked for a single combo slot.
pub const MAX_CHAIN_DEPTH: usize = 8;

// ── Decisions ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum PlannerDecision {
    Buy(Upgrade),
    /// Best card is not affordable yet; wait `delay` seconds of income.
    WaitMoney { upgrade: Upgrade, delay: f64 },
    /// Best card is cooling down for `delay` seconds.
    WaitCooldown { upgrade: Upgrade, delay: f64 },
    Nothing,
}

/// Result of walking a combo card's unlock chain.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainStep {
    /// Reached a buyable card (the target or one of its prerequisites).
    Gated(PlannerDecision),
    /// Neither the card nor its chain can be advanced.
    Blocked { upgrade_id: String, reason: String },
}

// ── Planner ─────────────────────────────────────────────────────────

pub struct UpgradePlanner {
    /// Hours of income kept in reserve.
    reserve_factor: f64,
    wait_for_most_profit: bool,
    max_sleep: f64,
}

impl UpgradePlanner {
    pub fn new(reserve_factor: f64, wait_for_most_profit: bool, max_sleep: f64) -> Self {
        Self {
            reserve_factor,
            wait_for_most_profit,
            max_sleep,
        }
    }

    pub fn spendable_balance(&self, account: &AccountState) -> f64 {
        account.balance - account.earn_per_hour * self.reserve_factor
    }

    /// Cost metric for an upgrade; lower is better.
    ///
    /// Hours to pay back the price, plus the cooldown in hours, plus the
    /// seconds of income still needed to afford it.
    pub fn significance(&self, upgrade: &Upgrade, account: &AccountState) -> f64 {
        if upgrade.earn_per_hour == 0.0 {
            return 0.0;
        }
        let mut score = upgrade.price / upgrade.earn_per_hour + upgrade.cooldown_seconds as f64 / 3600.0;
        if account.earn_per_sec > 0.0 {
            let gap = upgrade.price - self.spendable_balance(account);
            score += (gap / account.earn_per_sec).max(0.0);
        }
        score
    }

    /// Best-scoring upgrade worth considering, if any.
    pub fn pick_next<'a>(&self, upgrades: &'a [Upgrade], account: &AccountState) -> Option<&'a Upgrade> {
        let spendable = self.spendable_balance(account);
        upgrades
            .iter()
            .filter(|u| u.can_upgrade())
            .filter(|u| self.wait_for_most_profit || (spendable > u.price && u.cooldown_seconds == 0))
            .min_by(|a, b| {
                self.significance(a, account)
                    .total_cmp(&self.significance(b, account))
            })
    }

    /// Affordability and cooldown check done right before buying.
    pub fn gate(&self, upgrade: &Upgrade, account: &AccountState) -> PlannerDecision {
        let spendable = self.spendable_balance(account);
        if upgrade.price > spendable {
            return PlannerDecision::WaitMoney {
                upgrade: upgrade.clone(),
                delay: self.money_wait(upgrade.price - spendable, account),
            };
        }
        if upgrade.cooldown_seconds > 0 {
            return PlannerDecision::WaitCooldown {
                upgrade: upgrade.clone(),
                delay: upgrade.cooldown_seconds as f64,
            };
        }
        PlannerDecision::Buy(upgrade.clone())
    }

    pub fn decide(&self, upgrades: &[Upgrade], account: &AccountState) -> PlannerDecision {
        match self.pick_next(upgrades, account) {
            Some(best) => self.gate(best, account),
            None => PlannerDecision::Nothing,
        }
    }

    fn money_wait(&self, gap: f64, account: &AccountState) -> f64 {
        if account.earn_per_sec <= 0.0 {
            return self.max_sleep;
        }
        (gap / account.earn_per_sec).floor().min(self.max_sleep)
    }

    /// Follow `target`'s unlock chain down to the first card that can be
    /// bought, and gate it.
    ///
    /// A prerequisite is only followed while it is below the level the
    /// condition asks for, so a chain never buys past what unlocks the card.
    pub fn chain_step(
        &self,
        target: &Upgrade,
        upgrades: &[Upgrade],
        account: &AccountState,
    ) -> Result<ChainStep, BotError> {
        let mut visited = HashSet::new();
        let mut current = target;

        loop {
            if !visited.insert(current.id.as_str()) {
                return Err(BotError::Unknown(format!(
                    "upgrade condition chain for {} loops back to {}",
                    target.id, current.id
                )));
            }
            if visited.len() > MAX_CHAIN_DEPTH {
                return Err(BotError::Unknown(format!(
                    "upgrade condition chain for {} is deeper than {}",
                    target.id, MAX_CHAIN_DEPTH
                )));
            }

            if current.is_available {
                return Ok(ChainStep::Gated(self.gate(current, account)));
            }

            let blocked = |reason: String| -> Result<ChainStep, BotError> {
                Ok(ChainStep::Blocked {
                    upgrade_id: current.id.clone(),
                    reason,
                })
            };

            if current.is_expired || current.level > current.max_level {
                return blocked("expired or at max level".to_string());
            }

            let (prerequisite_id, required_level) = match &current.condition {
                Some(UpgradeCondition::ByUpgrade { upgrade_id, level }) => (upgrade_id, *level),
                other => return blocked(format!("unsupported condition {:?}", other)),
            };

            let Some(prerequisite) = upgrades.iter().find(|u| &u.id == prerequisite_id) else {
                return blocked(format!("prerequisite {} not listed", prerequisite_id));
            };

            if required_level > 0 && prerequisite.level >= required_level {
                return blocked(format!(
                    "prerequisite {} already at level {}",
                    prerequisite.id, prerequisite.level
                ));
            }

            current = prerequisite;
        }
    }
}
