// 13.0 round.rs: round state and the weekly expiry calendar.
// one live round at a time; positions, smiles, and strike menus all belong
// to it and reset at rollover. expiries land on Fridays 08:00 UTC.

use crate::types::{Price, Timestamp, UnderlyingId, STRIKE_LEVELS};
use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const WEEK_MILLIS: i64 = 7 * 24 * 60 * 60 * 1000;

const EXPIRY_HOUR_UTC: u32 = 8;
// chrono: Friday is 4 days from Monday
const EXPIRY_WEEKDAY: u32 = 4;

// chrono cannot represent dates near i64::MAX millis; clamp well inside its
// range so the day arithmetic below cannot overflow either
const MAX_CLOCK_MILLIS: i64 = 253_402_300_799_000; // 9999-12-31 23:59:59 UTC

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundState {
    pub number: u64,
    pub expiry: Timestamp,
    pub settled: bool,
    pub strike_menus: HashMap<UnderlyingId, [Price; STRIKE_LEVELS]>,
}

impl RoundState {
    pub fn new(number: u64, expiry: Timestamp) -> Self {
        Self {
            number,
            expiry,
            settled: false,
            strike_menus: HashMap::new(),
        }
    }

    pub fn menu(&self, underlying: UnderlyingId) -> Option<&[Price; STRIKE_LEVELS]> {
        self.strike_menus.get(&underlying)
    }
}

/// First Friday 08:00 UTC boundary strictly after `now`. Clocks outside the
/// [epoch, year 9999] window saturate to its edges first.
pub fn next_weekly_expiry(now: Timestamp) -> Timestamp {
    let millis = now.as_millis().clamp(0, MAX_CLOCK_MILLIS);
    let dt: DateTime<Utc> =
        DateTime::from_timestamp_millis(millis).expect("clamped into chrono range");

    let base = dt
        .date_naive()
        .and_hms_opt(EXPIRY_HOUR_UTC, 0, 0)
        .expect("valid wall time")
        .and_utc();

    let days_ahead =
        (EXPIRY_WEEKDAY + 7 - dt.weekday().num_days_from_monday()) % 7;
    let mut candidate = base + Duration::days(days_ahead as i64);
    if candidate.timestamp_millis() <= millis {
        candidate += Duration::days(7);
    }
    Timestamp::from_millis(candidate.timestamp_millis())
}

/// Expiry of the round following one that expired at `old_expiry`. Normally
/// one week later; if more than a full extra week slipped by unobserved, the
/// boundary is recomputed from `now` instead of compounding a stale expiry.
pub fn advance_expiry(old_expiry: Timestamp, now: Timestamp) -> Timestamp {
    let candidate = Timestamp::from_millis(old_expiry.as_millis() + WEEK_MILLIS);
    if now < candidate {
        candidate
    } else {
        next_weekly_expiry(now)
    }
}
