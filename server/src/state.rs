use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dues_shared::{Division, Team};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::warn;

use crate::config::{
    auth_userinfo_url, grace_period_days, operator_emails, operator_session_ttl_secs,
    require_operator_auth, sanction_fee, upstream_connect_timeout, upstream_http_timeout,
};

/// Teams and divisions keyed by id. All access goes through these methods.
#[derive(Debug, Default)]
pub struct LeagueData {
    divisions: HashMap<String, Division>,
    teams: HashMap<String, Team>,
}

impl LeagueData {
    pub fn from_documents(divisions: Vec<Division>, teams: Vec<Team>) -> Self {
        Self {
            divisions: divisions
                .into_iter()
                .map(|division| (division.id.clone(), division))
                .collect(),
            teams: teams.into_iter().map(|team| (team.id.clone(), team)).collect(),
        }
    }

    pub fn division_count(&self) -> usize {
        self.divisions.len()
    }

    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    /// Divisions ordered by name.
    pub fn divisions(&self) -> Vec<Division> {
        let mut divisions: Vec<Division> = self.divisions.values().cloned().collect();
        divisions.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        divisions
    }

    pub fn division(&self, id: &str) -> Option<&Division> {
        self.divisions.get(id)
    }

    pub fn division_by_name(&self, name: &str) -> Option<&Division> {
        let name = name.trim();
        self.divisions
            .values()
            .find(|division| division.name.trim() == name)
    }

    /// True when another division (not `except_id`) already uses `name`.
    pub fn division_name_taken(&self, name: &str, except_id: Option<&str>) -> bool {
        let name = name.trim();
        self.divisions.values().any(|division| {
            division.name.trim().eq_ignore_ascii_case(name)
                && Some(division.id.as_str()) != except_id
        })
    }

    pub fn put_division(&mut self, division: Division) {
        self.divisions.insert(division.id.clone(), division);
    }

    pub fn remove_division(&mut self, id: &str) -> Option<Division> {
        self.divisions.remove(id)
    }

    /// Teams ordered by division then name, optionally filtered.
    pub fn teams(&self, division: Option<&str>, include_archived: bool) -> Vec<Team> {
        let mut teams: Vec<Team> = self
            .teams
            .values()
            .filter(|team| include_archived || !team.archived)
            .filter(|team| division.is_none_or(|name| team.division.trim() == name.trim()))
            .cloned()
            .collect();
        teams.sort_by(|a, b| {
            a.division
                .cmp(&b.division)
                .then_with(|| a.team_name.cmp(&b.team_name))
                .then_with(|| a.id.cmp(&b.id))
        });
        teams
    }

    pub fn team(&self, id: &str) -> Option<&Team> {
        self.teams.get(id)
    }

    pub fn active_teams_in(&self, division_name: &str) -> usize {
        self.teams
            .values()
            .filter(|team| !team.archived && team.division.trim() == division_name.trim())
            .count()
    }

    pub fn put_team(&mut self, team: Team) {
        self.teams.insert(team.id.clone(), team);
    }

    pub fn remove_team(&mut self, id: &str) -> Option<Team> {
        self.teams.remove(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OperatorSession {
    pub operator: Operator,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AppState {
    pub league: Arc<RwLock<LeagueData>>,
    /// Session id -> signed-in operator.
    pub operator_sessions: Arc<DashMap<String, OperatorSession>>,
    pub http_client: reqwest::Client,
    /// PostgreSQL pool for persistence. None if DATABASE_URL is not set.
    pub db: Option<PgPool>,
    pub grace_days: u32,
    pub sanction_fee: f64,
    pub require_operator_auth: bool,
    pub auth_userinfo_url: String,
    pub allowed_operators: Arc<Vec<String>>,
    pub session_ttl_secs: i64,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    payments_recorded_total: AtomicU64,
    persist_failures_total: AtomicU64,
    report_requests_total: AtomicU64,
    auth_attempts_total: AtomicU64,
    auth_failures_total: AtomicU64,
    unauthorized_requests_total: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct ObservabilitySnapshot {
    pub payments_recorded_total: u64,
    pub persist_failures_total: u64,
    pub report_requests_total: u64,
    pub auth_attempts_total: u64,
    pub auth_failures_total: u64,
    pub unauthorized_requests_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            payments_recorded_total: self.payments_recorded_total.load(Ordering::Relaxed),
            persist_failures_total: self.persist_failures_total.load(Ordering::Relaxed),
            report_requests_total: self.report_requests_total.load(Ordering::Relaxed),
            auth_attempts_total: self.auth_attempts_total.load(Ordering::Relaxed),
            auth_failures_total: self.auth_failures_total.load(Ordering::Relaxed),
            unauthorized_requests_total: self
                .unauthorized_requests_total
                .load(Ordering::Relaxed),
        }
    }

    pub fn record_payment(&self) {
        self.payments_recorded_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persist_failure(&self) {
        self.persist_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_report_request(&self) {
        self.report_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auth_attempt(&self) {
        self.auth_attempts_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auth_failure(&self) {
        self.auth_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unauthorized_request(&self) {
        self.unauthorized_requests_total
            .fetch_add(1, Ordering::Relaxed);
    }
}

impl AppState {
    pub fn new(db: Option<PgPool>) -> Self {
        Self::with_league(db, LeagueData::default())
    }

    pub fn with_league(db: Option<PgPool>, league: LeagueData) -> Self {
        let request_timeout = upstream_http_timeout();
        let connect_timeout = upstream_connect_timeout();
        let http_client = reqwest::Client::builder()
            .user_agent("dues-tracker/0.1")
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(
                    error = %e,
                    "failed to build configured HTTP client, falling back to defaults"
                );
                reqwest::Client::new()
            });
        Self {
            league: Arc::new(RwLock::new(league)),
            operator_sessions: Arc::new(DashMap::new()),
            http_client,
            db,
            grace_days: grace_period_days(),
            sanction_fee: sanction_fee(),
            require_operator_auth: require_operator_auth(),
            auth_userinfo_url: auth_userinfo_url(),
            allowed_operators: Arc::new(operator_emails()),
            session_ttl_secs: operator_session_ttl_secs(),
            observability: Arc::new(ObservabilityCounters::default()),
        }
    }

    /// Local calendar date used as "today" by the week calculators.
    pub fn today(&self) -> chrono::NaiveDate {
        chrono::Local::now().date_naive()
    }
}
