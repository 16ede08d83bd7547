use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::dates::{parse_calendar_date, parse_optional_date};
use crate::league::Division;

pub const DAYS_PER_WEEK: u64 = 7;
pub const DEFAULT_GRACE_DAYS: u32 = 2;

/// Where a division stands relative to a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekStatus {
    /// Most recent week whose play date has been reached.
    pub calendar_week: u32,
    /// Week whose dues are currently payable.
    pub due_week: u32,
    /// Play date of `calendar_week` plus the grace period, when resolvable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_deadline: Option<NaiveDate>,
}

impl Default for WeekStatus {
    fn default() -> Self {
        Self {
            calendar_week: 1,
            due_week: 1,
            grace_deadline: None,
        }
    }
}

/// Play date for a 1-based `week`. A parseable per-week override wins,
/// otherwise the date is `start_date + 7 * (week - 1)` days.
pub fn play_date_for_week(division: &Division, week: u32) -> Option<NaiveDate> {
    if week < 1 {
        return None;
    }
    let Some(start) = parse_optional_date(division.start_date.as_deref()) else {
        tracing::debug!(division = %division.name, "division has no usable start date");
        return None;
    };

    if let Some(date) = division.week_override(week).and_then(parse_calendar_date) {
        return Some(date);
    }

    start.checked_add_days(Days::new(u64::from(week - 1) * DAYS_PER_WEEK))
}

/// Resolved play date for every week of the season, index 0 being week 1.
pub fn play_dates(division: &Division) -> Vec<Option<NaiveDate>> {
    (1..=division.total_weeks)
        .map(|week| play_date_for_week(division, week))
        .collect()
}

fn clamp_week(week: i64, total_weeks: u32) -> u32 {
    let upper = i64::from(total_weeks.max(1));
    u32::try_from(week.clamp(1, upper)).unwrap_or(1)
}

fn grace_deadline(play_date: Option<NaiveDate>, grace_days: u32) -> Option<NaiveDate> {
    play_date?.checked_add_days(Days::new(u64::from(grace_days)))
}

/// Compute the calendar week and due week for `today`.
///
/// The grace deadline is reported but does not shift `due_week`; both weeks
/// are clamped into `1..=total_weeks`.
pub fn calendar_and_due_week(division: &Division, today: NaiveDate, grace_days: u32) -> WeekStatus {
    let Some(start) = parse_optional_date(division.start_date.as_deref()) else {
        tracing::warn!(
            division = %division.name,
            "cannot compute calendar week without a valid start date"
        );
        return WeekStatus::default();
    };
    let total_weeks = division.total_weeks;

    let (calendar_week, due_week) = if division.has_custom_play_dates() {
        let calendar_week = (1..=total_weeks)
            .filter(|week| play_date_for_week(division, *week).is_some_and(|date| date <= today))
            .max()
            .unwrap_or(1);
        let before_play_date = play_date_for_week(division, calendar_week)
            .is_some_and(|play_date| today < play_date);
        let due_week = if before_play_date {
            i64::from(calendar_week) - 1
        } else {
            i64::from(calendar_week)
        };
        (i64::from(calendar_week), due_week)
    } else {
        let elapsed_days = today.signed_duration_since(start).num_days();
        let calendar_week = (elapsed_days.div_euclid(7) + 1).max(1);
        (calendar_week, calendar_week)
    };

    let calendar_week = clamp_week(calendar_week, total_weeks);
    let due_week = clamp_week(due_week, total_weeks);
    WeekStatus {
        calendar_week,
        due_week,
        grace_deadline: grace_deadline(play_date_for_week(division, calendar_week), grace_days),
    }
}
