use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use dues_shared::{
    PaidStatus, Payment, Team, TeamMember, format_calendar_date, parse_calendar_date,
    sanction_paid_set, unpaid_sanction_players, validate_payment_amount,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::persistence::{self, Table};
use crate::routes::{new_id, now_rfc3339};
use crate::state::AppState;

const MAX_TEAM_NAME_LEN: usize = 80;
const MAX_ROSTER_SIZE: usize = 40;

#[derive(Debug, Deserialize)]
pub struct TeamsQuery {
    #[serde(default)]
    pub division: Option<String>,
    #[serde(default)]
    pub include_archived: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayDuesRequest {
    pub week: u32,
    #[serde(default)]
    pub amount: f64,
    /// Explicit status skips amount classification.
    #[serde(default)]
    pub paid: Option<PaidStatus>,
    #[serde(default, alias = "payment_date")]
    pub payment_date: Option<String>,
    #[serde(default, alias = "bca_sanction_players")]
    pub bca_sanction_players: Vec<String>,
    #[serde(default, alias = "payment_method")]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TeamSanctions {
    pub team_id: String,
    pub paid_players: Vec<String>,
    pub unpaid_members: Vec<TeamMember>,
}

fn validate_team(team: &mut Team) -> Result<(), StatusCode> {
    team.team_name = team.team_name.trim().to_owned();
    team.captain_name = team.captain_name.trim().to_owned();
    team.division = team.division.trim().to_owned();
    if team.team_name.is_empty() || team.team_name.len() > MAX_TEAM_NAME_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }
    if team.team_members.len() > MAX_ROSTER_SIZE {
        return Err(StatusCode::BAD_REQUEST);
    }
    team.team_members.retain(|member| !member.name.trim().is_empty());
    Ok(())
}

fn clean_text(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

/// `GET /api/teams?division=&include_archived=`
pub async fn list_teams(
    State(state): State<AppState>,
    Query(query): Query<TeamsQuery>,
) -> Json<Vec<Team>> {
    let teams = state
        .league
        .read()
        .await
        .teams(query.division.as_deref(), query.include_archived);
    Json(teams)
}

/// `GET /api/teams/{id}`
pub async fn get_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Team>, StatusCode> {
    state
        .league
        .read()
        .await
        .team(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// `POST /api/teams`
pub async fn create_team(
    State(state): State<AppState>,
    Json(mut team): Json<Team>,
) -> Result<(StatusCode, Json<Team>), StatusCode> {
    validate_team(&mut team)?;
    let now = now_rfc3339();
    team.id = new_id();
    team.archived = false;
    team.created_at = Some(now.clone());
    team.updated_at = Some(now);

    let mut league = state.league.write().await;
    if league.division_by_name(&team.division).is_none() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }
    persistence::save_team(&state, &team).await?;
    league.put_team(team.clone());
    info!(team_id = %team.id, team = %team.team_name, division = %team.division, "team created");

    Ok((StatusCode::CREATED, Json(team)))
}

/// `PUT /api/teams/{id}`: Full replacement of the editable fields. Payment
/// history, archive flag and creation time always come from the stored team.
pub async fn update_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut team): Json<Team>,
) -> Result<Json<Team>, StatusCode> {
    validate_team(&mut team)?;

    let mut league = state.league.write().await;
    let stored = league.team(&id).cloned().ok_or(StatusCode::NOT_FOUND)?;
    if league.division_by_name(&team.division).is_none() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }
    if team.weekly_payments != stored.weekly_payments && !team.weekly_payments.is_empty() {
        warn!(team_id = %id, "ignoring payment edits sent through team update");
    }

    team.id = id;
    team.weekly_payments = stored.weekly_payments;
    team.archived = stored.archived;
    team.created_at = stored.created_at;
    team.updated_at = Some(now_rfc3339());

    persistence::save_team(&state, &team).await?;
    league.put_team(team.clone());
    Ok(Json(team))
}

/// `DELETE /api/teams/{id}`
pub async fn delete_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let mut league = state.league.write().await;
    if league.team(&id).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    persistence::delete(&state, Table::Teams, &id).await?;
    if let Some(team) = league.remove_team(&id) {
        info!(team_id = %id, team = %team.team_name, "team deleted");
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn set_archived(
    state: &AppState,
    id: &str,
    archived: bool,
) -> Result<Json<Team>, StatusCode> {
    let mut league = state.league.write().await;
    let mut team = league.team(id).cloned().ok_or(StatusCode::NOT_FOUND)?;
    if team.archived == archived {
        return Ok(Json(team));
    }
    // A restored team must point at a division that still exists.
    if !archived && league.division_by_name(&team.division).is_none() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }
    team.archived = archived;
    team.updated_at = Some(now_rfc3339());
    persistence::save_team(state, &team).await?;
    league.put_team(team.clone());
    info!(team_id = %id, archived, "team archive flag changed");
    Ok(Json(team))
}

/// `POST /api/teams/{id}/archive`
pub async fn archive_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Team>, StatusCode> {
    set_archived(&state, &id, true).await
}

/// `POST /api/teams/{id}/restore`
pub async fn restore_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Team>, StatusCode> {
    set_archived(&state, &id, false).await
}

/// `POST /api/teams/{id}/pay-dues`: Append one payment to the team's history.
pub async fn pay_dues(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PayDuesRequest>,
) -> Result<Json<Team>, StatusCode> {
    let mut league = state.league.write().await;
    let mut team = league.team(&id).cloned().ok_or(StatusCode::NOT_FOUND)?;
    let division = league
        .division_by_name(&team.division)
        .cloned()
        .ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;

    if request.week < 1 || request.week > division.total_weeks {
        return Err(StatusCode::BAD_REQUEST);
    }
    let payment_date = match clean_text(request.payment_date) {
        Some(raw) => parse_calendar_date(&raw).ok_or(StatusCode::BAD_REQUEST)?,
        None => state.today(),
    };

    let paid = match request.paid {
        Some(PaidStatus::Unpaid) => {
            if !request.amount.is_finite() || request.amount < 0.0 {
                return Err(StatusCode::UNPROCESSABLE_ENTITY);
            }
            PaidStatus::Unpaid
        }
        Some(explicit) => {
            validate_payment_amount(request.amount, 0.0)
                .map_err(|_| StatusCode::UNPROCESSABLE_ENTITY)?;
            explicit
        }
        None => validate_payment_amount(request.amount, division.weekly_dues()).map_err(|e| {
            warn!(team_id = %id, error = %e, "rejected payment amount");
            StatusCode::UNPROCESSABLE_ENTITY
        })?,
    };

    let bca_sanction_players = request
        .bca_sanction_players
        .into_iter()
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty())
        .collect();
    team.weekly_payments.push(Payment {
        week: request.week,
        paid,
        amount: request.amount,
        payment_date: Some(format_calendar_date(payment_date)),
        bca_sanction_players,
        payment_method: clean_text(request.payment_method),
        notes: clean_text(request.notes),
    });
    team.updated_at = Some(now_rfc3339());

    persistence::save_team(&state, &team).await?;
    league.put_team(team.clone());
    state.observability.record_payment();
    info!(
        team_id = %id,
        week = request.week,
        paid = paid.as_str(),
        amount = request.amount,
        "payment recorded"
    );

    Ok(Json(team))
}

/// `GET /api/teams/{id}/sanctions`
pub async fn team_sanctions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TeamSanctions>, StatusCode> {
    let league = state.league.read().await;
    let team = league.team(&id).ok_or(StatusCode::NOT_FOUND)?;

    let mut paid_players: Vec<String> = sanction_paid_set(team)
        .into_iter()
        .map(|key| key.to_string())
        .collect();
    paid_players.sort();
    let unpaid_members = unpaid_sanction_players(team).into_iter().cloned().collect();

    Ok(Json(TeamSanctions {
        team_id: team.id.clone(),
        paid_players,
        unpaid_members,
    }))
}
