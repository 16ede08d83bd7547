use std::fmt::Write as _;

use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use crate::state::{AppState, ObservabilitySnapshot};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let (division_count, team_count) = {
        let league = state.league.read().await;
        (league.division_count(), league.team_count())
    };
    let observability = state.observability.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "divisions": division_count,
        "teams": team_count,
        "operator_sessions": state.operator_sessions.len(),
        "persistence_available": state.db.is_some(),
        "grace_period_days": state.grace_days,
        "observability": {
            "payments_recorded_total": observability.payments_recorded_total,
            "persist_failures_total": observability.persist_failures_total,
            "report_requests_total": observability.report_requests_total,
            "auth_attempts_total": observability.auth_attempts_total,
            "auth_failures_total": observability.auth_failures_total,
            "unauthorized_requests_total": observability.unauthorized_requests_total,
        }
    }))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let (division_count, team_count) = {
        let league = state.league.read().await;
        (league.division_count(), league.team_count())
    };
    let body = render_prometheus_metrics(
        division_count,
        team_count,
        state.operator_sessions.len(),
        state.db.is_some(),
        state.observability.snapshot(),
    );

    (
        [
            (header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}

fn write_metric(body: &mut String, name: &str, kind: &str, help: &str, value: u64) {
    let _ = writeln!(body, "# HELP {name} {help}");
    let _ = writeln!(body, "# TYPE {name} {kind}");
    let _ = writeln!(body, "{name} {value}");
}

fn render_prometheus_metrics(
    division_count: usize,
    team_count: usize,
    session_count: usize,
    persistence_available: bool,
    observability: ObservabilitySnapshot,
) -> String {
    let mut body = String::new();
    write_metric(
        &mut body,
        "dues_divisions",
        "gauge",
        "Current number of divisions.",
        division_count as u64,
    );
    write_metric(
        &mut body,
        "dues_teams",
        "gauge",
        "Current number of teams, archived included.",
        team_count as u64,
    );
    write_metric(
        &mut body,
        "dues_operator_sessions",
        "gauge",
        "Operator sessions currently cached.",
        session_count as u64,
    );
    write_metric(
        &mut body,
        "dues_persistence_available",
        "gauge",
        "Whether PostgreSQL persistence is configured (1 or 0).",
        u64::from(persistence_available),
    );
    write_metric(
        &mut body,
        "dues_payments_recorded_total",
        "counter",
        "Total payments appended through pay-dues.",
        observability.payments_recorded_total,
    );
    write_metric(
        &mut body,
        "dues_persist_failures_total",
        "counter",
        "Total failures while persisting league documents.",
        observability.persist_failures_total,
    );
    write_metric(
        &mut body,
        "dues_report_requests_total",
        "counter",
        "Total date-range report requests.",
        observability.report_requests_total,
    );
    write_metric(
        &mut body,
        "dues_auth_attempts_total",
        "counter",
        "Total operator sign-in attempts.",
        observability.auth_attempts_total,
    );
    write_metric(
        &mut body,
        "dues_auth_failures_total",
        "counter",
        "Total rejected operator sign-in attempts.",
        observability.auth_failures_total,
    );
    write_metric(
        &mut body,
        "dues_unauthorized_requests_total",
        "counter",
        "Total mutating requests rejected for a missing operator session.",
        observability.unauthorized_requests_total,
    );
    body
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::render_prometheus_metrics;
    use crate::state::{AppState, ObservabilitySnapshot};

    async fn spawn_test_server(state: AppState) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let app = crate::app::build_app(state);
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test app");
        });
        (addr, handle)
    }

    #[test]
    fn metrics_output_contains_prometheus_help_type_and_values() {
        let observability = ObservabilitySnapshot {
            payments_recorded_total: 12,
            persist_failures_total: 3,
            report_requests_total: 7,
            auth_attempts_total: 5,
            auth_failures_total: 2,
            unauthorized_requests_total: 1,
        };

        let metrics = render_prometheus_metrics(4, 30, 2, true, observability);

        assert!(metrics.contains("# HELP dues_divisions"));
        assert!(metrics.contains("# TYPE dues_payments_recorded_total counter"));
        assert!(metrics.contains("dues_divisions 4"));
        assert!(metrics.contains("dues_teams 30"));
        assert!(metrics.contains("dues_operator_sessions 2"));
        assert!(metrics.contains("dues_persistence_available 1"));
        assert!(metrics.contains("dues_payments_recorded_total 12"));
        assert!(metrics.contains("dues_persist_failures_total 3"));
        assert!(metrics.contains("dues_report_requests_total 7"));
        assert!(metrics.contains("dues_auth_attempts_total 5"));
        assert!(metrics.contains("dues_auth_failures_total 2"));
        assert!(metrics.contains("dues_unauthorized_requests_total 1"));
    }

    #[tokio::test]
    async fn health_and_metrics_expose_expected_contract() {
        let state = AppState::new(None);
        let (addr, server_handle) = spawn_test_server(state).await;
        let base_url = format!("http://{addr}");
        let client = reqwest::Client::new();

        let health = client
            .get(format!("{base_url}/api/health"))
            .send()
            .await
            .expect("health request")
            .error_for_status()
            .expect("health status")
            .json::<serde_json::Value>()
            .await
            .expect("parse health");

        assert_eq!(health.get("status").and_then(|v| v.as_str()), Some("ok"));
        assert_eq!(
            health.get("persistence_available").and_then(|v| v.as_bool()),
            Some(false)
        );
        assert_eq!(health.get("teams").and_then(|v| v.as_u64()), Some(0));
        assert!(
            health
                .get("observability")
                .and_then(|v| v.get("payments_recorded_total"))
                .and_then(|v| v.as_u64())
                .is_some()
        );

        let metrics = client
            .get(format!("{base_url}/api/metrics"))
            .send()
            .await
            .expect("metrics request")
            .error_for_status()
            .expect("metrics status")
            .text()
            .await
            .expect("parse metrics text");

        assert!(metrics.contains("# TYPE dues_persistence_available gauge"));
        assert!(metrics.contains("dues_persistence_available 0"));
        assert!(metrics.contains("dues_payments_recorded_total 0"));

        server_handle.abort();
        let _ = server_handle.await;
    }
}
