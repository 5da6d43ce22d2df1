pub mod combo;
pub mod sleep;
pub mod state;
pub mod taps;
pub mod upgrades;
