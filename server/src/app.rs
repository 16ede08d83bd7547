use std::path::Path;

use axum::{
    Router,
    extract::Request,
    http::{HeaderValue, Method, header},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;

use crate::config;
use crate::routes;
use crate::state::AppState;

pub(crate) fn build_app(state: AppState) -> Router {
    let static_assets = Router::new()
        .fallback_service(
            ServeDir::new(config::static_dir())
                .precompressed_br()
                .precompressed_gzip(),
        )
        .layer(middleware::from_fn(set_static_cache_control));

    let reads = Router::new()
        .route("/api/health", get(routes::api::health))
        .route("/api/metrics", get(routes::api::metrics))
        .route(
            "/api/dues-tracker/google-auth",
            post(routes::auth::google_auth),
        )
        .route("/api/operator", get(routes::auth::current_operator))
        .route("/api/divisions", get(routes::divisions::list_divisions))
        .route(
            "/api/divisions/{id}/weeks",
            get(routes::divisions::division_weeks),
        )
        .route("/api/teams", get(routes::teams::list_teams))
        .route("/api/teams/{id}", get(routes::teams::get_team))
        .route(
            "/api/teams/{id}/sanctions",
            get(routes::teams::team_sanctions),
        )
        .route(
            "/api/reports/date-range",
            get(routes::reports::date_range_report),
        )
        .route(
            "/api/export/teams.csv",
            get(routes::reports::export_teams_csv),
        );

    let writes = Router::new()
        .route("/api/divisions", post(routes::divisions::create_division))
        .route(
            "/api/divisions/{id}",
            put(routes::divisions::update_division).delete(routes::divisions::delete_division),
        )
        .route("/api/teams", post(routes::teams::create_team))
        .route(
            "/api/teams/{id}",
            put(routes::teams::update_team).delete(routes::teams::delete_team),
        )
        .route(
            "/api/teams/{id}/archive",
            post(routes::teams::archive_team),
        )
        .route(
            "/api/teams/{id}/restore",
            post(routes::teams::restore_team),
        )
        .route("/api/teams/{id}/pay-dues", post(routes::teams::pay_dues))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            routes::auth::require_operator,
        ));

    let mut app = reads.merge(writes).layer(CompressionLayer::new());
    if let Some(cors) = cors_layer(&config::cors_allowed_origins()) {
        app = app.layer(cors);
    }

    app.fallback_service(static_assets).with_state(state)
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(%origin, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if allowed.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    )
}

async fn set_static_cache_control(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let mut response = next.run(request).await;

    if response.status().is_success()
        && let Some(cache_control) = cache_control_for_path(&path)
    {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(cache_control),
        );
    }

    response
}

fn cache_control_for_path(path: &str) -> Option<&'static str> {
    if is_hashed_bundle_asset(path) {
        return Some("public, max-age=31536000, immutable");
    }

    if path.starts_with("/images/") || path.starts_with("/fonts/") || path == "/favicon.ico" {
        return Some("public, max-age=86400");
    }

    None
}

/// Bundler output such as `/assets/index-3f9a1c2b.js` never changes under the same name.
fn is_hashed_bundle_asset(path: &str) -> bool {
    let path = Path::new(path);
    if !matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("js" | "css" | "map")
    ) {
        return false;
    }

    let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
        return false;
    };

    stem.split(['-', '_', '.']).skip(1).any(|segment| {
        segment.len() >= 8
            && segment.chars().all(|c| c.is_ascii_alphanumeric())
            && segment.chars().any(|c| c.is_ascii_digit())
    })
}
