use axum::http::StatusCode;
use dues_shared::{Division, Team};
use sqlx_postgres::PgConnection;
use tracing::warn;

use crate::state::{AppState, LeagueData};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Load every stored division and team document. Rows that no longer
/// deserialize are logged and skipped.
pub async fn load_league(pool: &sqlx::PgPool) -> Result<LeagueData, BoxError> {
    let division_rows: Vec<(String, serde_json::Value)> =
        sqlx::query_as("SELECT id, document FROM divisions")
            .fetch_all(pool)
            .await?;
    let team_rows: Vec<(String, serde_json::Value)> =
        sqlx::query_as("SELECT id, document FROM teams")
            .fetch_all(pool)
            .await?;

    let divisions = division_rows
        .into_iter()
        .filter_map(|(id, document)| match serde_json::from_value::<Division>(document) {
            Ok(mut division) => {
                division.id = id;
                Some(division)
            }
            Err(e) => {
                warn!(division_id = %id, error = %e, "skipping unreadable division document");
                None
            }
        })
        .collect();
    let teams = team_rows
        .into_iter()
        .filter_map(|(id, document)| match serde_json::from_value::<Team>(document) {
            Ok(mut team) => {
                team.id = id;
                Some(team)
            }
            Err(e) => {
                warn!(team_id = %id, error = %e, "skipping unreadable team document");
                None
            }
        })
        .collect();

    Ok(LeagueData::from_documents(divisions, teams))
}

async fn upsert_division(conn: &mut PgConnection, division: &Division) -> Result<(), BoxError> {
    let document = serde_json::to_value(division)?;
    sqlx::query(
        "INSERT INTO divisions (id, name, document, updated_at) VALUES ($1, $2, $3, NOW()) \
         ON CONFLICT (id) DO UPDATE \
         SET name = EXCLUDED.name, document = EXCLUDED.document, updated_at = NOW()",
    )
    .bind(&division.id)
    .bind(&division.name)
    .bind(document)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn upsert_team(conn: &mut PgConnection, team: &Team) -> Result<(), BoxError> {
    let document = serde_json::to_value(team)?;
    sqlx::query(
        "INSERT INTO teams (id, division, document, updated_at) VALUES ($1, $2, $3, NOW()) \
         ON CONFLICT (id) DO UPDATE \
         SET division = EXCLUDED.division, document = EXCLUDED.document, updated_at = NOW()",
    )
    .bind(&team.id)
    .bind(&team.division)
    .bind(document)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn upsert_division_with_teams(
    pool: &sqlx::PgPool,
    division: &Division,
    teams: &[Team],
) -> Result<(), BoxError> {
    let mut tx = pool.begin().await?;
    upsert_division(&mut tx, division).await?;
    for team in teams {
        upsert_team(&mut tx, team).await?;
    }
    tx.commit().await?;
    Ok(())
}

async fn delete_row(pool: &sqlx::PgPool, table: Table, id: &str) -> Result<(), BoxError> {
    let sql = match table {
        Table::Divisions => "DELETE FROM divisions WHERE id = $1",
        Table::Teams => "DELETE FROM teams WHERE id = $1",
    };
    sqlx::query(sql).bind(id).execute(pool).await?;
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub enum Table {
    Divisions,
    Teams,
}

fn persist_failed(state: &AppState, what: &str, id: &str, e: &BoxError) -> StatusCode {
    state.observability.record_persist_failure();
    warn!(id, error = %e, "failed to persist {what}");
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Write-through for a full division document. No-op without a database.
pub async fn save_division(state: &AppState, division: &Division) -> Result<(), StatusCode> {
    let Some(pool) = state.db.as_ref() else {
        return Ok(());
    };
    let result = match pool.acquire().await {
        Ok(mut conn) => upsert_division(&mut conn, division).await,
        Err(e) => Err(e.into()),
    };
    result.map_err(|e| persist_failed(state, "division", &division.id, &e))
}

/// Division plus the teams that reference it, written in one transaction.
/// Nothing is stored unless every document is.
pub async fn save_division_with_teams(
    state: &AppState,
    division: &Division,
    teams: &[Team],
) -> Result<(), StatusCode> {
    let Some(pool) = state.db.as_ref() else {
        return Ok(());
    };
    upsert_division_with_teams(pool, division, teams)
        .await
        .map_err(|e| persist_failed(state, "division rename", &division.id, &e))
}

/// Write-through for a full team document. No-op without a database.
pub async fn save_team(state: &AppState, team: &Team) -> Result<(), StatusCode> {
    let Some(pool) = state.db.as_ref() else {
        return Ok(());
    };
    let result = match pool.acquire().await {
        Ok(mut conn) => upsert_team(&mut conn, team).await,
        Err(e) => Err(e.into()),
    };
    result.map_err(|e| persist_failed(state, "team", &team.id, &e))
}

pub async fn delete(state: &AppState, table: Table, id: &str) -> Result<(), StatusCode> {
    let Some(pool) = state.db.as_ref() else {
        return Ok(());
    };
    delete_row(pool, table, id)
        .await
        .map_err(|e| persist_failed(state, "deletion", id, &e))
}
