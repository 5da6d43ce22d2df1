use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepReason {
    UpgradeMoney,
    UpgradeCooldown,
    EnergyRecover,
    /// Nothing was blocking; just recheck later.
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SleepProposal {
    /// Seconds, measured from `created_at`.
    pub delay: f64,
    pub reason: SleepReason,
    pub created_at: Instant,
}

impl SleepProposal {
    /// Seconds left on this proposal once the time since it was made is
    /// subtracted, never below `floor`.
    pub fn remaining(&self, floor: f64) -> f64 {
        (self.delay - self.created_at.elapsed().as_secs_f64()).max(floor)
    }
}

/// Collects wait requests made during one cycle and keeps the earliest.
pub struct SleepArbiter {
    preferred: Option<SleepProposal>,
    default_delay: f64,
}

impl SleepArbiter {
    pub fn new(default_delay: f64) -> Self {
        Self {
            preferred: None,
            default_delay,
        }
    }

    pub fn propose(&mut self, delay: f64, reason: SleepReason) {
        let delay = delay.max(0.0);
        if let Some(current) = &self.preferred {
            if delay >= current.delay {
                return;
            }
        }
        self.preferred = Some(SleepProposal {
            delay,
            reason,
            created_at: Instant::now(),
        });
    }

    /// Drop whatever was proposed, e.g. when the cycle was abandoned.
    pub fn clear(&mut self) {
        self.preferred = None;
    }

    /// Take the binding proposal for this cycle, falling back to the idle
    /// interval. Clears the arbiter for the next cycle.
    pub fn resolve(&mut self) -> SleepProposal {
        self.preferred.take().unwrap_or_else(|| SleepProposal {
            delay: self.default_delay,
            reason: SleepReason::Idle,
            created_at: Instant::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_smallest_proposal() {
        let mut arbiter = SleepArbiter::new(3600.0);
        arbiter.propose(900.0, SleepReason::EnergyRecover);
        arbiter.propose(120.0, SleepReason::UpgradeCooldown);
        arbiter.propose(500.0, SleepReason::UpgradeMoney);

        let chosen = arbiter.resolve();
        assert_eq!(chosen.delay, 120.0);
        assert_eq!(chosen.reason, SleepReason::UpgradeCooldown);
    }

    #[test]
    fn equal_delay_keeps_first_reason() {
        let mut arbiter = SleepArbiter::new(3600.0);
        arbiter.propose(60.0, SleepReason::UpgradeMoney);
        arbiter.propose(60.0, SleepReason::EnergyRecover);
        assert_eq!(arbiter.resolve().reason, SleepReason::UpgradeMoney);
    }

    #[test]
    fn empty_arbiter_falls_back_to_idle() {
        let mut arbiter = SleepArbiter::new(3600.0);
        let chosen = arbiter.resolve();
        assert_eq!(chosen.delay, 3600.0);
        assert_eq!(chosen.reason, SleepReason::Idle);
    }

    #[test]
    fn resolve_resets_for_next_cycle() {
        let mut arbiter = SleepArbiter::new(3600.0);
        arbiter.propose(10.0, SleepReason::UpgradeMoney);
        arbiter.resolve();
        assert_eq!(arbiter.resolve().reason, SleepReason::Idle);
    }

    #[test]
    fn clear_discards_proposals() {
        let mut arbiter = SleepArbiter::new(3600.0);
        arbiter.propose(10.0, SleepReason::UpgradeMoney);
        arbiter.clear();
        assert_eq!(arbiter.resolve().delay, 3600.0);
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_subtracts_elapsed_time() {
        let mut arbiter = SleepArbiter::new(3600.0);
        arbiter.propose(100.0, SleepReason::UpgradeMoney);
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;

        let chosen = arbiter.resolve();
        assert!((chosen.remaining(0.0) - 70.0).abs() < 1e-6);
        assert_eq!(chosen.remaining(80.0), 80.0);
    }
}
