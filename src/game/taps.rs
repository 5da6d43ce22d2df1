use rand::Rng;

use crate::error::BotError;
use crate::game::state::AccountState;

/// Humans tap roughly this many times per second.
const TAPS_PER_SECOND: i64 = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct TapAction {
    /// Energy reported alongside the taps, clamped to the pool size.
    pub energy: i64,
    /// Taps actually sent, including the random over-tap.
    pub taps: i64,
    pub available_taps: i64,
    /// Seconds to wait before sending, as if tapping by hand.
    pub delay_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TapPlan {
    /// Less than one tap's worth of energy.
    Insufficient { available: i64, required: f64 },
    /// Not enough energy to be worth a round trip.
    BelowThreshold { available: i64, threshold: f64 },
    Tap(TapAction),
}

pub struct TapEngine {
    min_percent: u32,
}

impl TapEngine {
    pub fn new(min_percent: u32) -> Self {
        Self { min_percent }
    }

    pub fn plan<R: Rng>(&self, account: &AccountState, rng: &mut R) -> Result<TapPlan, BotError> {
        if account.earn_per_tap <= 0.0 {
            return Err(BotError::Unknown(format!(
                "earn_per_tap must be positive, got {}",
                account.earn_per_tap
            )));
        }

        let available_taps = (account.available_energy / account.earn_per_tap).floor() as i64;
        if (available_taps as f64) < account.earn_per_tap {
            return Ok(TapPlan::Insufficient {
                available: available_taps,
                required: account.earn_per_tap,
            });
        }

        let max_taps = (account.max_energy / account.earn_per_tap).floor();
        let taps_to_start = max_taps * self.min_percent as f64 / 100.0;
        if (available_taps as f64) < taps_to_start {
            return Ok(TapPlan::BelowThreshold {
                available: available_taps,
                threshold: taps_to_start,
            });
        }

        let energy = account.available_energy.min(account.max_energy).floor() as i64;
        // The official client over-counts by 1-4% when tapping by hand.
        let over_tap = rng.gen_range(1..=4) as f64 / 100.0;
        let taps = available_taps + (available_taps as f64 * over_tap).floor() as i64;

        Ok(TapPlan::Tap(TapAction {
            energy,
            taps,
            available_taps,
            delay_secs: (available_taps / TAPS_PER_SECOND) as u64,
        }))
    }

    /// Seconds until the energy pool is full again.
    pub fn energy_recovery_delay(account: &AccountState) -> Result<f64, BotError> {
        if account.energy_recover_per_sec <= 0.0 {
            return Err(BotError::Unknown(format!(
                "energy_recover_per_sec must be positive, got {}",
                account.energy_recover_per_sec
            )));
        }
        let missing = (account.max_energy - account.available_energy).max(0.0);
        Ok(missing / account.energy_recover_per_sec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn make_account(energy: f64, max_energy: f64, earn_per_tap: f64) -> AccountState {
        AccountState {
            available_energy: energy,
            max_energy,
            earn_per_tap,
            energy_recover_per_sec: 3.0,
            ..Default::default()
        }
    }

    #[test]
    fn tiny_energy_is_insufficient() {
        let engine = TapEngine::new(80);
        let mut rng = StdRng::seed_from_u64(1);
        let plan = engine.plan(&make_account(5.0, 1000.0, 10.0), &mut rng).unwrap();
        assert_eq!(
            plan,
            TapPlan::Insufficient {
                available: 0,
                required: 10.0
            }
        );
    }

    #[test]
    fn zero_earn_per_tap_is_an_error() {
        let engine = TapEngine::new(80);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(engine.plan(&make_account(500.0, 1000.0, 0.0), &mut rng).is_err());
    }

    #[test]
    fn waits_for_start_threshold() {
        let engine = TapEngine::new(80);
        let mut rng = StdRng::seed_from_u64(1);
        // 700 of 1000 taps available, 800 needed.
        let plan = engine.plan(&make_account(700.0, 1000.0, 1.0), &mut rng).unwrap();
        assert!(matches!(plan, TapPlan::BelowThreshold { available: 700, .. }));
    }

    #[test]
    fn full_pool_taps_with_bounded_over_tap() {
        let engine = TapEngine::new(80);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = engine.plan(&make_account(1000.0, 1000.0, 1.0), &mut rng).unwrap();
            let TapPlan::Tap(action) = plan else {
                panic!("expected a tap action");
            };
            assert_eq!(action.available_taps, 1000);
            assert_eq!(action.energy, 1000);
            assert!(action.taps >= 1010 && action.taps <= 1040, "taps = {}", action.taps);
            assert_eq!(action.delay_secs, 166);
        }
    }

    #[test]
    fn energy_is_clamped_to_pool_size() {
        let engine = TapEngine::new(0);
        let mut rng = StdRng::seed_from_u64(3);
        let plan = engine.plan(&make_account(1200.0, 1000.0, 2.0), &mut rng).unwrap();
        let TapPlan::Tap(action) = plan else {
            panic!("expected a tap action");
        };
        assert_eq!(action.energy, 1000);
        assert_eq!(action.available_taps, 600);
    }

    #[test]
    fn recovery_delay_divides_missing_energy() {
        let account = make_account(400.0, 1000.0, 1.0);
        assert_eq!(TapEngine::energy_recovery_delay(&account).unwrap(), 200.0);

        let stalled = AccountState {
            energy_recover_per_sec: 0.0,
            ..account
        };
        assert!(TapEngine::energy_recovery_delay(&stalled).is_err());
    }
}
