use std::time::Duration;

use chrono::Utc;
use tracing::info;

use crate::config::SESSION_EVICTION_INTERVAL_SECS;
use crate::state::AppState;

pub async fn run(state: AppState) {
    let mut interval = tokio::time::interval(Duration::from_secs(SESSION_EVICTION_INTERVAL_SECS));

    loop {
        interval.tick().await;
        let evicted = evict_expired(&state);
        if evicted > 0 {
            info!(
                "evicted {evicted} expired operator sessions ({} remaining)",
                state.operator_sessions.len()
            );
        }
    }
}

fn evict_expired(state: &AppState) -> usize {
    let before = state.operator_sessions.len();
    let now = Utc::now();
    let ttl = state.session_ttl_secs;

    state.operator_sessions.retain(|_, session| {
        now.signed_duration_since(session.created_at).num_seconds() < ttl
    });

    before.saturating_sub(state.operator_sessions.len())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, Utc};

    use super::evict_expired;
    use crate::state::{AppState, Operator, OperatorSession};

    fn session(age_secs: i64) -> OperatorSession {
        OperatorSession {
            operator: Operator {
                email: "treasurer@league.org".to_string(),
                name: None,
            },
            created_at: Utc::now() - TimeDelta::seconds(age_secs),
        }
    }

    #[test]
    fn evicts_only_sessions_past_their_ttl() {
        let mut state = AppState::new(None);
        state.session_ttl_secs = 600;
        state
            .operator_sessions
            .insert("fresh".to_string(), session(10));
        state
            .operator_sessions
            .insert("stale".to_string(), session(601));

        assert_eq!(evict_expired(&state), 1);
        assert!(state.operator_sessions.contains_key("fresh"));
        assert!(!state.operator_sessions.contains_key("stale"));
    }
}
