use axum::Json;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::state::{AppState, Operator, OperatorSession};

const MAX_TOKEN_LEN: usize = 4096;

#[derive(Debug, Deserialize)]
pub struct GoogleAuthRequest {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GoogleAuthResponse {
    pub session_token: String,
    pub operator: Operator,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    email: Option<String>,
    #[serde(default, alias = "verified_email")]
    email_verified: Option<bool>,
    #[serde(default)]
    name: Option<String>,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = raw.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Operator bound to the request's bearer session, if still within its TTL.
pub fn operator_for_headers(state: &AppState, headers: &HeaderMap) -> Option<Operator> {
    let token = bearer_token(headers)?;
    let session = state.operator_sessions.get(token)?;
    let age = Utc::now()
        .signed_duration_since(session.created_at)
        .num_seconds();
    (age < state.session_ttl_secs).then(|| session.operator.clone())
}

fn operator_allowed(allowed: &[String], email: &str) -> bool {
    allowed.is_empty() || allowed.iter().any(|entry| entry.eq_ignore_ascii_case(email))
}

/// `POST /api/dues-tracker/google-auth`: Exchange a provider access token for
/// an operator session.
pub async fn google_auth(
    State(state): State<AppState>,
    Json(body): Json<GoogleAuthRequest>,
) -> Result<Json<GoogleAuthResponse>, StatusCode> {
    state.observability.record_auth_attempt();

    let access_token = body.access_token.trim();
    if access_token.is_empty() || access_token.len() > MAX_TOKEN_LEN {
        state.observability.record_auth_failure();
        return Err(StatusCode::BAD_REQUEST);
    }

    let resp = state
        .http_client
        .get(&state.auth_userinfo_url)
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|e| {
            warn!(error = %e, "auth provider request failed");
            state.observability.record_auth_failure();
            StatusCode::BAD_GATEWAY
        })?;

    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        state.observability.record_auth_failure();
        return Err(StatusCode::UNAUTHORIZED);
    }
    if !status.is_success() {
        warn!(status = status.as_u16(), "auth provider returned an error");
        state.observability.record_auth_failure();
        return Err(StatusCode::BAD_GATEWAY);
    }

    let user: UserInfo = resp.json().await.map_err(|e| {
        warn!(error = %e, "auth provider returned an unreadable profile");
        state.observability.record_auth_failure();
        StatusCode::BAD_GATEWAY
    })?;

    let Some(email) = user
        .email
        .map(|email| email.trim().to_ascii_lowercase())
        .filter(|email| !email.is_empty())
    else {
        state.observability.record_auth_failure();
        return Err(StatusCode::FORBIDDEN);
    };
    if user.email_verified == Some(false) || !operator_allowed(&state.allowed_operators, &email) {
        warn!(%email, "rejected operator sign-in");
        state.observability.record_auth_failure();
        return Err(StatusCode::FORBIDDEN);
    }

    let operator = Operator {
        email,
        name: user.name.filter(|name| !name.trim().is_empty()),
    };
    let session_token = uuid::Uuid::new_v4().simple().to_string();
    state.operator_sessions.insert(
        session_token.clone(),
        OperatorSession {
            operator: operator.clone(),
            created_at: Utc::now(),
        },
    );
    info!(
        email = %operator.email,
        has_refresh_token = body.refresh_token.is_some(),
        "operator signed in"
    );

    Ok(Json(GoogleAuthResponse {
        session_token,
        operator,
    }))
}

/// `GET /api/operator`: The operator behind the bearer session.
pub async fn current_operator(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Operator>, StatusCode> {
    operator_for_headers(&state, &headers)
        .map(Json)
        .ok_or(StatusCode::UNAUTHORIZED)
}

/// Rejects mutating requests without a live operator session.
pub async fn require_operator(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if state.require_operator_auth && operator_for_headers(&state, request.headers()).is_none() {
        state.observability.record_unauthorized_request();
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(request).await)
}
