use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::BotError;

/// The daily combo rotates at 19:00 in UTC+7.
const RESET_OFFSET_SECS: i32 = 7 * 3600;
const RESET_HOUR: u32 = 19;

/// How long to wait before asking the feed again after a miss.
const RETRY_AFTER_MINUTES: i64 = 30;

/// Payload published by the combo hint feed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComboHint {
    pub date: String,
    #[serde(default)]
    pub combo: Vec<String>,
}

#[allow(async_fn_in_trait)]
pub trait ComboFeed {
    async fn fetch(&self) -> Result<ComboHint, BotError>;
}

fn reset_zone() -> FixedOffset {
    FixedOffset::east_opt(RESET_OFFSET_SECS).expect("UTC+7 is a valid offset")
}

/// The `[start, end)` interval during which the combo dated `date` is live.
pub fn window_for(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let reset = NaiveTime::from_hms_opt(RESET_HOUR, 0, 0).expect("valid reset time");
    let local = date.and_time(reset);
    let start = reset_zone()
        .from_local_datetime(&local)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&local));
    (start, start + Duration::days(1))
}

/// Date of the combo that is live at `now`.
pub fn current_combo_date(now: DateTime<Utc>) -> NaiveDate {
    (now.with_timezone(&reset_zone()) - Duration::hours(RESET_HOUR as i64)).date_naive()
}

fn parse_hint_date(raw: &str) -> Option<NaiveDate> {
    ["%Y-%m-%d", "%d-%m-%y", "%d.%m.%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw.trim(), fmt).ok())
}

#[derive(Debug, Clone)]
struct CachedCombo {
    ids: Vec<String>,
    expires_at: DateTime<Utc>,
    starts_at: DateTime<Utc>,
}

impl CachedCombo {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now < self.expires_at
    }
}

/// Works out which three cards make up today's combo.
#[derive(Default)]
pub struct ComboSolver {
    cache: Option<CachedCombo>,
    retry_at: Option<DateTime<Utc>>,
}

impl ComboSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Today's combo card ids, or an empty list when they are not known.
    pub async fn resolve<F: ComboFeed>(&mut self, feed: &F, now: DateTime<Utc>) -> Vec<String> {
        if let Some(cached) = &self.cache {
            if cached.is_live(now) {
                return cached.ids.clone();
            }
            info!("Cached combo expired, trying to update remotely...");
            self.cache = None;
        }

        if let Some(retry_at) = self.retry_at {
            if now < retry_at {
                return Vec::new();
            }
        }

        let hint = match feed.fetch().await {
            Ok(hint) => hint,
            Err(e) => {
                warn!("Failed to fetch combo hint: {}", e);
                self.retry_at = Some(now + Duration::minutes(RETRY_AFTER_MINUTES));
                return Vec::new();
            }
        };

        let Some(date) = parse_hint_date(&hint.date) else {
            warn!("Combo hint has unreadable date {:?}", hint.date);
            self.retry_at = Some(now + Duration::minutes(RETRY_AFTER_MINUTES));
            return Vec::new();
        };

        let (starts_at, expires_at) = window_for(date);
        let cached = CachedCombo {
            ids: hint.combo,
            expires_at,
            starts_at,
        };
        if !cached.is_live(now) || cached.ids.is_empty() {
            info!(
                "Remote combo is for {} but the live combo is for {}. Combo update skipped.",
                date,
                current_combo_date(now)
            );
            self.retry_at = Some(now + Duration::minutes(RETRY_AFTER_MINUTES));
            return Vec::new();
        }

        info!("Combo for {} resolved: {:?}", date, cached.ids);
        self.retry_at = None;
        let ids = cached.ids.clone();
        self.cache = Some(cached);
        ids
    }
}
