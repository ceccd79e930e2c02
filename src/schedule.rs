//! Turns feed records into what the pages show: today's five prayers with
//! their status and countdown, and this week's Jummah slots.

use crate::config::Clock;
use crate::feed::{JummahSlot, MosqueData, PrayerTiming};
use crate::status::{prayer_status_at, time_until_at, PrayerStatus, StatusDisplay};
use crate::utils::{format_date, format_time, parse_feed_date};
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrayerName {
    Fajr,
    Zuhr,
    Asr,
    Maghrib,
    Isha,
}

impl PrayerName {
    pub const ALL: [PrayerName; 5] = [
        PrayerName::Fajr,
        PrayerName::Zuhr,
        PrayerName::Asr,
        PrayerName::Maghrib,
        PrayerName::Isha,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PrayerName::Fajr => "Fajr",
            PrayerName::Zuhr => "Zuhr",
            PrayerName::Asr => "Asr",
            PrayerName::Maghrib => "Maghrib",
            PrayerName::Isha => "Isha",
        }
    }

    /// Raw time for this prayer from a feed record
    #[must_use]
    pub fn time_in(self, timing: &PrayerTiming) -> &str {
        match self {
            PrayerName::Fajr => &timing.fajr,
            // several jama'at times may be listed; the first is the prayer
            PrayerName::Zuhr => timing.zuhr.split_whitespace().next().unwrap_or(""),
            PrayerName::Asr => &timing.asr,
            PrayerName::Maghrib => &timing.magrib,
            PrayerName::Isha => &timing.isha,
        }
    }
}

/// One line of the prayer times list
#[derive(Debug, Clone, Serialize)]
pub struct PrayerRow {
    pub name: &'static str,
    /// Time as published by the feed
    pub time: String,
    pub display_time: String,
    #[serde(flatten)]
    pub status: StatusDisplay,
    #[serde(skip)]
    pub phase: PrayerStatus,
    /// Remaining time, only for prayers that are still upcoming
    pub countdown: Option<String>,
}

/// Today's prayers for a mosque
#[derive(Debug, Clone, Serialize)]
pub struct DaySchedule {
    pub mosque_name: String,
    pub date: String,
    pub date_label: String,
    pub rows: Vec<PrayerRow>,
}

impl DaySchedule {
    /// The first prayer that has not started yet
    #[must_use]
    pub fn next_prayer(&self) -> Option<&PrayerRow> {
        self.rows.iter().find(|row| {
            matches!(row.phase, PrayerStatus::Upcoming | PrayerStatus::CurrentSoon)
        })
    }
}

/// Feed record for `today`, falling back to the first published day
#[must_use]
pub fn timing_for_date(data: &MosqueData, today: NaiveDate) -> Option<&PrayerTiming> {
    data.timings
        .iter()
        .find(|timing| parse_feed_date(&timing.date) == Some(today))
        .or_else(|| data.timings.first())
}

/// Builds the rows for one day. Each prayer runs until the next one in the
/// list; Isha has no successor.
#[must_use]
pub fn prayer_rows_at<Tz: TimeZone>(
    timing: &PrayerTiming,
    clock: Clock,
    show_seconds: bool,
    now: &DateTime<Tz>,
) -> Vec<PrayerRow> {
    let times: Vec<(PrayerName, &str)> = PrayerName::ALL
        .iter()
        .map(|&name| (name, name.time_in(timing)))
        .collect();

    times
        .iter()
        .enumerate()
        .map(|(i, &(name, time))| {
            let next = times.get(i + 1).map(|&(_, next)| next);
            let phase = prayer_status_at(time, next, now);
            PrayerRow {
                name: name.as_str(),
                time: time.to_string(),
                display_time: format_time(time, show_seconds, clock.is_24_hour()),
                status: phase.display(),
                phase,
                countdown: (phase == PrayerStatus::Upcoming).then(|| time_until_at(time, now)),
            }
        })
        .collect()
}

/// Today's schedule for `data`, or `None` when the feed lists no days
#[must_use]
pub fn day_schedule_at<Tz: TimeZone>(
    data: &MosqueData,
    clock: Clock,
    show_seconds: bool,
    now: &DateTime<Tz>,
) -> Option<DaySchedule> {
    let timing = timing_for_date(data, now.date_naive())?;
    Some(DaySchedule {
        mosque_name: data.mosque_name.clone(),
        date: timing.date.clone(),
        date_label: format_date(&timing.date),
        rows: prayer_rows_at(timing, clock, show_seconds, now),
    })
}

/// Sunday and Saturday of the week containing `today`
#[must_use]
pub fn week_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today - Duration::days(i64::from(today.weekday().num_days_from_sunday()));
    (start, start + Duration::days(6))
}

/// Jummah entries dated within the Sunday to Saturday week of `today`
#[must_use]
pub fn jummah_for_week(schedule: &[JummahSlot], today: NaiveDate) -> Vec<&JummahSlot> {
    let (start, end) = week_bounds(today);
    schedule
        .iter()
        .filter(|slot| {
            parse_feed_date(&slot.date).is_some_and(|date| date >= start && date <= end)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn timing(date: &str) -> PrayerTiming {
        PrayerTiming {
            day: "Mon".to_string(),
            date: date.to_string(),
            fajr: "06:10".to_string(),
            zuhr: "12:30 13:15".to_string(),
            asr: "14:15".to_string(),
            magrib: "16:20".to_string(),
            isha: "18:00".to_string(),
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_zuhr_uses_first_time() {
        assert_eq!(PrayerName::Zuhr.time_in(&timing("15-01-2024")), "12:30");
        let empty = PrayerTiming::default();
        assert_eq!(PrayerName::Zuhr.time_in(&empty), "");
    }

    #[test]
    fn test_rows_at_noon() {
        let rows = prayer_rows_at(&timing("15-01-2024"), Clock::Hour12, false, &noon());
        let names: Vec<_> = rows.iter().map(|row| row.name).collect();
        assert_eq!(names, vec!["Fajr", "Zuhr", "Asr", "Maghrib", "Isha"]);

        // Fajr runs until Zuhr starts
        assert_eq!(rows[0].phase, PrayerStatus::CurrentActive);
        assert_eq!(rows[0].countdown, None);
        assert_eq!(rows[1].phase, PrayerStatus::Upcoming);
        assert_eq!(rows[1].display_time, "12:30 PM");
        assert_eq!(rows[1].countdown.as_deref(), Some("30m"));
        assert_eq!(rows[2].countdown.as_deref(), Some("2h 15m"));
    }

    #[test]
    fn test_rows_after_zuhr_starts() {
        let afternoon = Utc.with_ymd_and_hms(2024, 1, 15, 13, 0, 0).unwrap();
        let rows = prayer_rows_at(&timing("15-01-2024"), Clock::Hour12, false, &afternoon);
        assert_eq!(rows[0].phase, PrayerStatus::Passed);
        assert_eq!(rows[1].phase, PrayerStatus::CurrentActive);
        assert_eq!(rows[2].phase, PrayerStatus::Upcoming);
        assert_eq!(rows[4].phase, PrayerStatus::Upcoming);
    }

    #[test]
    fn test_fajr_is_current_until_zuhr() {
        let morning = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        let rows = prayer_rows_at(&timing("15-01-2024"), Clock::Hour24, false, &morning);
        assert_eq!(rows[0].phase, PrayerStatus::CurrentActive);
        assert_eq!(rows[0].status.label, "Current");
        assert_eq!(rows[0].display_time, "06:10");
    }

    #[test]
    fn test_next_prayer() {
        let data = MosqueData {
            mosque_name: "Central".to_string(),
            timings: vec![timing("15-01-2024")],
        };
        let schedule = day_schedule_at(&data, Clock::Hour12, false, &noon()).unwrap();
        assert_eq!(schedule.next_prayer().map(|row| row.name), Some("Zuhr"));
        assert_eq!(schedule.date_label, "Monday, 15 January 2024");

        let night = Utc.with_ymd_and_hms(2024, 1, 15, 23, 0, 0).unwrap();
        let schedule = day_schedule_at(&data, Clock::Hour12, false, &night).unwrap();
        assert!(schedule.next_prayer().is_none());
    }

    #[test]
    fn test_timing_for_date_prefers_today() {
        let data = MosqueData {
            mosque_name: "Central".to_string(),
            timings: vec![timing("14-01-2024"), timing("15-01-2024")],
        };
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(timing_for_date(&data, today).unwrap().date, "15-01-2024");

        let later = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(timing_for_date(&data, later).unwrap().date, "14-01-2024");

        let empty = MosqueData {
            mosque_name: "Central".to_string(),
            timings: vec![],
        };
        assert!(timing_for_date(&empty, today).is_none());
    }

    #[test]
    fn test_week_bounds_sunday_to_saturday() {
        // 15 January 2024 is a Monday
        let (start, end) = week_bounds(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 1, 14).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 1, 20).unwrap());

        let sunday = NaiveDate::from_ymd_opt(2024, 1, 14).unwrap();
        assert_eq!(week_bounds(sunday).0, sunday);
    }

    #[test]
    fn test_jummah_for_week() {
        let schedule = vec![
            JummahSlot {
                date: "12-01-2024".to_string(),
                times: vec!["13:00".to_string()],
            },
            JummahSlot {
                date: "19-01-2024".to_string(),
                times: vec!["13:15".to_string(), "14:00".to_string()],
            },
            JummahSlot {
                date: "not-a-date".to_string(),
                times: vec![],
            },
            JummahSlot {
                date: "26-01-2024".to_string(),
                times: vec!["13:15".to_string()],
            },
        ];

        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let this_week = jummah_for_week(&schedule, today);
        assert_eq!(this_week.len(), 1);
        assert_eq!(this_week[0].date, "19-01-2024");

        let saturday = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
        assert_eq!(jummah_for_week(&schedule, saturday).len(), 1);
    }
}
