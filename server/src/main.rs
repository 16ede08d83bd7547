mod app;
mod config;
mod db_migrations;
mod db_sqlx;
mod persistence;
mod routes;
mod services;
mod state;

extern crate self as sqlx;
pub use crate::db_sqlx::{PgPool, postgres, query, query_as};

use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::state::{AppState, LeagueData};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let (db, league) = match std::env::var("DATABASE_URL") {
        Ok(database_url) => match connect_and_load(&database_url).await {
            Some(loaded) => loaded,
            None => return,
        },
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; league data will only live in memory");
            (None, LeagueData::default())
        }
    };
    tracing::info!(
        divisions = league.division_count(),
        teams = league.team_count(),
        "League data ready"
    );

    let state = AppState::with_league(db, league);
    if !state.require_operator_auth {
        tracing::warn!("operator auth is disabled; mutating routes are open");
    } else if state.allowed_operators.is_empty() {
        tracing::warn!("OPERATOR_EMAILS is empty; any verified account may sign in");
    }

    tokio::spawn(services::session_evictor::run(state.clone()));

    let app = app::build_app(state);

    let addr = format!("0.0.0.0:{}", config::server_port());
    tracing::info!("Dues tracker listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind TCP listener");
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server failed");
    }

    tracing::info!("Server shut down gracefully");
}

async fn connect_and_load(database_url: &str) -> Option<(Option<PgPool>, LeagueData)> {
    let db_max_connections = config::db_max_connections();
    tracing::info!(db_max_connections, "Connecting to PostgreSQL...");
    let db = match PgPoolOptions::new()
        .max_connections(db_max_connections)
        .connect(database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to PostgreSQL");
            return None;
        }
    };
    if let Err(e) = db_migrations::run(&db).await {
        tracing::error!(error = %e, "failed to run migrations");
        return None;
    }
    tracing::info!("Database connected and migrations applied");

    match persistence::load_league(&db).await {
        Ok(league) => Some((Some(db), league)),
        Err(e) => {
            tracing::error!(error = %e, "failed to load league documents");
            None
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
