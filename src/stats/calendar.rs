//! Calendar math over solve dates (UTC days)

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Days before today covered by the heatmap; today is included on top
pub const HEATMAP_DAYS: u64 = 365;

/// One cell of the activity heatmap
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeatmapDay {
    /// Serialized as `YYYY-MM-DD`
    pub date: NaiveDate,
    pub count: u32,
}

/// Distinct UTC calendar days of the given timestamps
pub fn distinct_days(timestamps: &[DateTime<Utc>]) -> BTreeSet<NaiveDate> {
    timestamps.iter().map(|ts| ts.date_naive()).collect()
}

/// Consecutive-day solve streak ending today or yesterday.
///
/// Zero when the most recent solve day is older than yesterday. Days after
/// `today` are ignored.
pub fn streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut recent = days.range(..=today).rev();

    let Some(&latest) = recent.next() else {
        return 0;
    };
    if today.signed_duration_since(latest).num_days() > 1 {
        return 0;
    }

    let mut count = 1;
    let mut previous = latest;
    for &day in recent {
        if previous.signed_duration_since(day).num_days() != 1 {
            break;
        }
        count += 1;
        previous = day;
    }
    count
}

/// Dense daily solve counts from `today - 365` through `today`, ascending
pub fn heatmap(timestamps: &[DateTime<Utc>], today: NaiveDate) -> Vec<HeatmapDay> {
    let mut counts: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for ts in timestamps {
        *counts.entry(ts.date_naive()).or_default() += 1;
    }

    let start = today.checked_sub_days(Days::new(HEATMAP_DAYS)).unwrap_or(NaiveDate::MIN);
    start
        .iter_days()
        .take_while(|date| *date <= today)
        .map(|date| HeatmapDay { date, count: counts.get(&date).copied().unwrap_or(0) })
        .collect()
}

/// `part / whole` as a percentage rounded to one decimal; 0 when `whole` is 0
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * 1000.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn days_before(today: NaiveDate, offsets: &[u64]) -> BTreeSet<NaiveDate> {
        offsets.iter().map(|n| today.checked_sub_days(Days::new(*n)).unwrap()).collect()
    }

    #[test]
    fn streak_counts_back_from_today() {
        let today = day(2024, 3, 10);
        assert_eq!(streak(&days_before(today, &[0, 1, 2]), today), 3);
    }

    #[test]
    fn streak_starting_yesterday_is_active() {
        let today = day(2024, 3, 10);
        assert_eq!(streak(&days_before(today, &[1, 2, 4]), today), 2);
    }

    #[test]
    fn stale_streak_is_zero() {
        let today = day(2024, 3, 10);
        assert_eq!(streak(&days_before(today, &[2, 3]), today), 0);
        assert_eq!(streak(&BTreeSet::new(), today), 0);
    }

    #[test]
    fn streak_crosses_month_boundary() {
        let today = day(2024, 3, 1);
        let days = BTreeSet::from([day(2024, 2, 28), day(2024, 2, 29), day(2024, 3, 1)]);
        assert_eq!(streak(&days, today), 3);
    }

    #[test]
    fn distinct_days_collapses_same_day() {
        let ts = vec![
            Utc.with_ymd_and_hms(2024, 3, 10, 1, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 10, 23, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap(),
        ];
        assert_eq!(distinct_days(&ts), BTreeSet::from([day(2024, 3, 9), day(2024, 3, 10)]));
    }

    #[test]
    fn heatmap_is_dense_and_ascending() {
        let today = day(2024, 3, 10);
        let ts = vec![
            Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2023, 1, 1, 9, 0, 0).unwrap(),
        ];

        let map = heatmap(&ts, today);
        assert_eq!(map.len(), 366);
        assert_eq!(map.first().unwrap().date, day(2023, 3, 11));
        assert_eq!(map.last().unwrap(), &HeatmapDay { date: today, count: 2 });
        assert!(map.windows(2).all(|w| w[1].date.signed_duration_since(w[0].date).num_days() == 1));
        assert_eq!(map.iter().map(|d| d.count).sum::<u32>(), 2);
    }

    #[test]
    fn heatmap_serializes_plain_dates() {
        let cell = HeatmapDay { date: day(2024, 3, 10), count: 1 };
        assert_eq!(serde_json::to_string(&cell).unwrap(), r#"{"date":"2024-03-10","count":1}"#);
    }

    #[test]
    fn percentage_rounds_to_one_decimal() {
        assert_eq!(percentage(6, 10), 60.0);
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(0, 0), 0.0);
    }
}
