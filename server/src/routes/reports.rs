use std::borrow::Cow;
use std::fmt::Write as _;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use dues_shared::{
    DateRange, Division, PeriodReport, ReportSettings, Team, calendar_and_due_week,
    summarize_period,
};
use serde::Deserialize;

use crate::state::AppState;

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub division: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub division: Option<String>,
}

/// `GET /api/reports/date-range?start=&end=&division=`: Collected versus owed
/// for an inclusive reporting window.
pub async fn date_range_report(
    State(state): State<AppState>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Json<PeriodReport>, StatusCode> {
    state.observability.record_report_request();
    let range = DateRange::parse(&query.start, &query.end).ok_or(StatusCode::BAD_REQUEST)?;
    let division_filter = query
        .division
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let (teams, divisions) = {
        let league = state.league.read().await;
        if let Some(name) = division_filter
            && league.division_by_name(name).is_none()
        {
            return Err(StatusCode::NOT_FOUND);
        }
        (league.teams(division_filter, false), league.divisions())
    };

    let settings = ReportSettings {
        today: state.today(),
        grace_days: state.grace_days,
        sanction_fee: state.sanction_fee,
    };
    Ok(Json(summarize_period(&teams, &divisions, &range, &settings)))
}

fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn render_teams_csv(teams: &[Team], divisions: &[Division], state: &AppState) -> String {
    let today = state.today();
    let mut body = String::from(
        "team_name,captain_name,division,members,calendar_week,due_week,paid_weeks,weeks_behind,archived\n",
    );

    for team in teams {
        let status = divisions
            .iter()
            .find(|division| division.name.trim() == team.division.trim())
            .map(|division| calendar_and_due_week(division, today, state.grace_days));
        let paid_weeks = team.paid_weeks();
        let weeks_behind = status.map(|status| {
            (1..=status.due_week)
                .filter(|week| !paid_weeks.contains(week))
                .count()
        });

        let members = team
            .team_members
            .iter()
            .map(|member| member.name.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        let optional = |value: Option<String>| value.unwrap_or_default();
        let fields = [
            team.team_name.clone(),
            team.captain_name.clone(),
            team.division.clone(),
            members,
            optional(status.map(|s| s.calendar_week.to_string())),
            optional(status.map(|s| s.due_week.to_string())),
            paid_weeks.len().to_string(),
            optional(weeks_behind.map(|n| n.to_string())),
            if team.archived { "yes" } else { "no" }.to_owned(),
        ];
        let line = fields
            .iter()
            .map(|field| csv_field(field))
            .collect::<Vec<_>>()
            .join(",");
        let _ = writeln!(body, "{line}");
    }

    body
}

/// `GET /api/export/teams.csv?division=`: Spreadsheet export of every team.
pub async fn export_teams_csv(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> impl IntoResponse {
    let division_filter = query
        .division
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());
    let (teams, divisions) = {
        let league = state.league.read().await;
        (league.teams(division_filter, true), league.divisions())
    };
    let body = render_teams_csv(&teams, &divisions, &state);

    (
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"teams.csv\"",
            ),
        ],
        body,
    )
}
