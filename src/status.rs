//! Prayer status classification and countdowns
//!
//! Everything here is a pure function of the prayer time strings and a
//! supplied `now`. The `Local` wrappers at the bottom are what the pages use.

use crate::utils::{parse_time_parts, MISSING_TIME};
use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use serde::Serialize;

/// Minutes before a prayer during which it is shown as "Soon"
pub const SOON_THRESHOLD_MINUTES: i64 = 15;

// Larger offsets cannot be represented by chrono and are treated as unreadable.
const MAX_OFFSET_MINUTES: i64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrayerStatus {
    /// More than fifteen minutes before the prayer
    Upcoming,
    /// Within fifteen minutes before the prayer
    CurrentSoon,
    /// Between the prayer and the next one
    CurrentActive,
    Passed,
}

impl PrayerStatus {
    /// Coarse status name: `upcoming`, `current` or `passed`
    #[must_use]
    pub fn kind(self) -> &'static str {
        match self {
            PrayerStatus::Upcoming => "upcoming",
            PrayerStatus::CurrentSoon | PrayerStatus::CurrentActive => "current",
            PrayerStatus::Passed => "passed",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            PrayerStatus::Upcoming => "Upcoming",
            PrayerStatus::CurrentSoon => "Soon",
            PrayerStatus::CurrentActive => "Current",
            PrayerStatus::Passed => "Passed",
        }
    }

    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            PrayerStatus::Upcoming => "#666666",
            PrayerStatus::CurrentSoon | PrayerStatus::CurrentActive => "#FFD700",
            PrayerStatus::Passed => "#999999",
        }
    }

    #[must_use]
    pub fn background_color(self) -> &'static str {
        match self {
            PrayerStatus::Upcoming | PrayerStatus::Passed => "transparent",
            PrayerStatus::CurrentSoon => "#3f51b5",
            PrayerStatus::CurrentActive => "#2e7d32",
        }
    }

    #[must_use]
    pub fn is_current(self) -> bool {
        matches!(self, PrayerStatus::CurrentSoon | PrayerStatus::CurrentActive)
    }

    #[must_use]
    pub fn display(self) -> StatusDisplay {
        StatusDisplay {
            status: self.kind(),
            label: self.label(),
            color: self.color(),
            background_color: self.background_color(),
        }
    }
}

/// Status with its display attributes, as sent to pages and the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusDisplay {
    pub status: &'static str,
    pub label: &'static str,
    pub color: &'static str,
    pub background_color: &'static str,
}

/// Classifies a prayer relative to `now`.
///
/// `next_prayer_time` ending at or before the prayer itself is taken to be on
/// the following day (Isha to Fajr). A prayer time that cannot be read is
/// classified as passed.
#[must_use]
pub fn prayer_status_at<Tz: TimeZone>(
    prayer_time: &str,
    next_prayer_time: Option<&str>,
    now: &DateTime<Tz>,
) -> PrayerStatus {
    let today = now.date_naive();
    let tz = now.timezone();

    let Some(prayer_at) = resolve_time(&tz, today, prayer_time) else {
        return PrayerStatus::Passed;
    };

    let next_at = next_prayer_time.and_then(|next| {
        let same_day = resolve_time(&tz, today, next)?;
        if same_day <= prayer_at {
            resolve_time(&tz, today.succ_opt()?, next)
        } else {
            Some(same_day)
        }
    });

    if *now < prayer_at.clone() - Duration::minutes(SOON_THRESHOLD_MINUTES) {
        PrayerStatus::Upcoming
    } else if *now < prayer_at {
        PrayerStatus::CurrentSoon
    } else if next_at.is_some_and(|next_at| *now < next_at) {
        PrayerStatus::CurrentActive
    } else {
        PrayerStatus::Passed
    }
}

/// Time left until the prayer as `"3h 5m"` or `"45m"`.
///
/// A prayer at or before `now` is counted towards the same time on the next
/// calendar day. Unreadable times give `"-"`.
#[must_use]
pub fn time_until_at<Tz: TimeZone>(prayer_time: &str, now: &DateTime<Tz>) -> String {
    let today = now.date_naive();
    let tz = now.timezone();

    let target = resolve_time(&tz, today, prayer_time).and_then(|today_at| {
        if today_at <= *now {
            resolve_time(&tz, today.succ_opt()?, prayer_time)
        } else {
            Some(today_at)
        }
    });

    let Some(target) = target else {
        return MISSING_TIME.to_string();
    };

    let diff_ms = target.signed_duration_since(now.clone()).num_milliseconds();
    let hours = diff_ms.div_euclid(3_600_000);
    let minutes = diff_ms.rem_euclid(3_600_000) / 60_000;

    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// [`prayer_status_at`] against the local clock
#[must_use]
pub fn prayer_status(prayer_time: &str, next_prayer_time: Option<&str>) -> PrayerStatus {
    prayer_status_at(prayer_time, next_prayer_time, &Local::now())
}

/// [`time_until_at`] against the local clock
#[must_use]
pub fn time_until_next(prayer_time: &str) -> String {
    time_until_at(prayer_time, &Local::now())
}

fn resolve_time<Tz: TimeZone>(tz: &Tz, date: NaiveDate, raw: &str) -> Option<DateTime<Tz>> {
    let (hours, minutes, _) = parse_time_parts(raw)?;
    let offset = hours.checked_mul(60)?.checked_add(minutes)?;
    if offset.abs() > MAX_OFFSET_MINUTES {
        return None;
    }

    // Out-of-range hours and minutes spill over into neighbouring days.
    let naive = date
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::minutes(offset))?;
    localize(tz, naive)
}

fn localize<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(at) => Some(at),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        // skipped by a DST jump; the wall clock reads an hour later
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest(),
    }
}
