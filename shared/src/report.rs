use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{DateRange, parse_optional_date};
use crate::league::{Division, Payment, Team};
use crate::sanction::PlayerKey;
use crate::schedule::{calendar_and_due_week, play_date_for_week};

pub const DEFAULT_SANCTION_FEE: f64 = 25.0;

/// True when the payment was collected and its payment date falls in `range`.
pub fn is_payment_in_date_range(payment: &Payment, range: &DateRange) -> bool {
    if !payment.paid.counts_as_collected() {
        return false;
    }
    parse_optional_date(payment.payment_date.as_deref()).is_some_and(|date| range.contains(date))
}

/// True when the week's resolved play date falls in `range`.
pub fn is_week_in_date_range(division: &Division, week: u32, range: &DateRange) -> bool {
    play_date_for_week(division, week).is_some_and(|date| range.contains(date))
}

#[derive(Debug, Clone, Copy)]
pub struct ReportSettings {
    pub today: NaiveDate,
    pub grace_days: u32,
    pub sanction_fee: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamPeriodRow {
    pub team_id: String,
    pub team_name: String,
    pub division: String,
    pub collected: f64,
    pub sanction_fees_collected: f64,
    pub weeks_owed: Vec<u32>,
    pub amount_owed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodReport {
    pub range: DateRange,
    pub teams: Vec<TeamPeriodRow>,
    pub total_collected: f64,
    pub total_sanction_fees: f64,
    pub total_owed: f64,
}

fn summarize_team(
    team: &Team,
    division: &Division,
    range: &DateRange,
    settings: &ReportSettings,
) -> TeamPeriodRow {
    let in_range: Vec<&Payment> = team
        .weekly_payments
        .iter()
        .filter(|payment| is_payment_in_date_range(payment, range))
        .collect();
    let collected = in_range.iter().map(|payment| payment.amount).sum();
    let sanction_players: HashSet<PlayerKey> = in_range
        .iter()
        .flat_map(|payment| payment.bca_sanction_players.iter())
        .map(|name| PlayerKey::new(name))
        .filter(|key| !key.is_empty())
        .collect();

    let status = calendar_and_due_week(division, settings.today, settings.grace_days);
    let weeks_owed: Vec<u32> = (1..=status.due_week)
        .filter(|week| is_week_in_date_range(division, *week, range))
        .filter(|week| !team.has_collected_payment_for(*week))
        .collect();
    let amount_owed = division.weekly_dues() * weeks_owed.len() as f64;

    TeamPeriodRow {
        team_id: team.id.clone(),
        team_name: team.team_name.clone(),
        division: team.division.clone(),
        collected,
        sanction_fees_collected: settings.sanction_fee * sanction_players.len() as f64,
        weeks_owed,
        amount_owed,
    }
}

/// Money collected in `range` and dues owed for weeks played in `range`,
/// per active team. Teams pointing at an unknown division are skipped.
pub fn summarize_period(
    teams: &[Team],
    divisions: &[Division],
    range: &DateRange,
    settings: &ReportSettings,
) -> PeriodReport {
    let by_name: HashMap<&str, &Division> = divisions
        .iter()
        .map(|division| (division.name.trim(), division))
        .collect();

    let mut rows = Vec::with_capacity(teams.len());
    for team in teams.iter().filter(|team| !team.archived) {
        let Some(division) = by_name.get(team.division.trim()) else {
            tracing::warn!(
                team = %team.team_name,
                division = %team.division,
                "skipping team with unknown division in period report"
            );
            continue;
        };
        rows.push(summarize_team(team, division, range, settings));
    }
    rows.sort_by(|a, b| {
        a.division
            .cmp(&b.division)
            .then_with(|| a.team_name.cmp(&b.team_name))
    });

    PeriodReport {
        range: *range,
        total_collected: rows.iter().map(|row| row.collected).sum(),
        total_sanction_fees: rows.iter().map(|row| row.sanction_fees_collected).sum(),
        total_owed: rows.iter().map(|row| row.amount_owed).sum(),
        teams: rows,
    }
}
