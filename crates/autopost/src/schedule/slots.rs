//! Fixed daily publishing slots.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Days, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AutopostError, AutopostResult};

/// Part of the day a slot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Morning,
    Noon,
    Evening,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Period::Morning => "morning",
            Period::Noon => "noon",
            Period::Evening => "evening",
        };
        write!(f, "{s}")
    }
}

/// A time of day eligible for a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub hour: u32,
    pub minute: u32,
    pub period: Period,
}

const fn slot(hour: u32, minute: u32, period: Period) -> Slot {
    Slot {
        hour,
        minute,
        period,
    }
}

/// Daily slots in assignment order, local time.
pub const DAILY_SLOTS: [Slot; 10] = [
    slot(7, 0, Period::Morning),
    slot(8, 0, Period::Morning),
    slot(9, 0, Period::Morning),
    slot(12, 0, Period::Noon),
    slot(12, 30, Period::Noon),
    slot(13, 0, Period::Noon),
    slot(20, 0, Period::Evening),
    slot(21, 0, Period::Evening),
    slot(22, 0, Period::Evening),
    slot(23, 0, Period::Evening),
];

/// Days scanned before giving up on finding a free slot.
pub const HORIZON_DAYS: u32 = 30;

/// Earliest slot strictly after `now` that is not in `occupied`.
///
/// Scans today's slots in table order, then the following days. Local times
/// that do not exist on a given day (DST gaps) are skipped.
pub fn next_free_slot<Tz: TimeZone>(
    now: &DateTime<Tz>,
    occupied: &HashSet<DateTime<Utc>>,
) -> AutopostResult<(DateTime<FixedOffset>, Period)> {
    let tz = now.timezone();
    let today = now.date_naive();

    for day in 0..HORIZON_DAYS {
        let Some(date) = today.checked_add_days(Days::new(u64::from(day))) else {
            break;
        };
        for slot in DAILY_SLOTS {
            let Some(naive) = date.and_hms_opt(slot.hour, slot.minute, 0) else {
                continue;
            };
            let Some(at) = tz.from_local_datetime(&naive).earliest() else {
                continue;
            };
            if at <= *now || occupied.contains(&at.with_timezone(&Utc)) {
                continue;
            }
            return Ok((at.fixed_offset(), slot.period));
        }
    }

    Err(AutopostError::NoFreeSlot { days: HORIZON_DAYS })
}
