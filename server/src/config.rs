use std::time::Duration;

use dues_shared::report::DEFAULT_SANCTION_FEE;
use dues_shared::schedule::DEFAULT_GRACE_DAYS;

pub const SERVER_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_STATIC_DIR: &str = "public";
pub const DEFAULT_AUTH_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
pub const DEFAULT_OPERATOR_SESSION_TTL_SECS: i64 = 43_200; // 12 hours
pub const SESSION_EVICTION_INTERVAL_SECS: u64 = 300; // 5 minutes
pub const DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS: u64 = 3;

fn env_positive<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<T>().ok())
        .filter(|value| *value > T::default())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
        })
        .unwrap_or(default)
}

pub fn server_port() -> u16 {
    env_positive("PORT").unwrap_or(SERVER_PORT)
}

pub fn db_max_connections() -> u32 {
    env_positive("DB_MAX_CONNECTIONS").unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
}

/// Days after a play date before that week counts as overdue. Zero is allowed.
pub fn grace_period_days() -> u32 {
    std::env::var("GRACE_PERIOD_DAYS")
        .ok()
        .and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(DEFAULT_GRACE_DAYS)
}

pub fn sanction_fee() -> f64 {
    env_positive::<f64>("SANCTION_FEE")
        .filter(|fee| fee.is_finite())
        .unwrap_or(DEFAULT_SANCTION_FEE)
}

pub fn static_dir() -> String {
    std::env::var("STATIC_DIR")
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_owned())
}

pub fn auth_userinfo_url() -> String {
    std::env::var("AUTH_USERINFO_URL")
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_AUTH_USERINFO_URL.to_owned())
}

/// Lowercased operator emails allowed to sign in. Empty allows any verified account.
pub fn operator_emails() -> Vec<String> {
    let raw = std::env::var("OPERATOR_EMAILS").unwrap_or_default();
    let mut emails: Vec<String> = raw
        .split(',')
        .map(|email| email.trim().to_ascii_lowercase())
        .filter(|email| !email.is_empty())
        .collect();
    emails.sort();
    emails.dedup();
    emails
}

/// Origins allowed to call the API from a separately hosted admin UI.
pub fn cors_allowed_origins() -> Vec<String> {
    std::env::var("CORS_ALLOWED_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_owned())
        .filter(|origin| !origin.is_empty())
        .collect()
}

pub fn require_operator_auth() -> bool {
    env_flag("REQUIRE_OPERATOR_AUTH", true)
}

pub fn operator_session_ttl_secs() -> i64 {
    env_positive("OPERATOR_SESSION_TTL_SECS").unwrap_or(DEFAULT_OPERATOR_SESSION_TTL_SECS)
}

pub fn upstream_http_timeout() -> Duration {
    env_positive("UPSTREAM_HTTP_TIMEOUT_SECS")
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS))
}

pub fn upstream_connect_timeout() -> Duration {
    env_positive("UPSTREAM_CONNECT_TIMEOUT_SECS")
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_UPSTREAM_CONNECT_TIMEOUT_SECS))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn numeric_settings_fall_back_on_invalid_or_zero_values() {
        temp_env::with_vars(
            [
                ("DB_MAX_CONNECTIONS", Some("0")),
                ("PORT", Some("not-a-port")),
                ("UPSTREAM_HTTP_TIMEOUT_SECS", Some("-3")),
                ("SANCTION_FEE", Some("NaN")),
            ],
            || {
                assert_eq!(db_max_connections(), DEFAULT_DB_MAX_CONNECTIONS);
                assert_eq!(server_port(), SERVER_PORT);
                assert_eq!(
                    upstream_http_timeout(),
                    Duration::from_secs(DEFAULT_UPSTREAM_HTTP_TIMEOUT_SECS)
                );
                assert!((sanction_fee() - DEFAULT_SANCTION_FEE).abs() < 1e-9);
            },
        );
    }

    #[test]
    fn numeric_settings_read_valid_values() {
        temp_env::with_vars(
            [
                ("DB_MAX_CONNECTIONS", Some("4")),
                ("PORT", Some("8080")),
                ("GRACE_PERIOD_DAYS", Some("0")),
                ("SANCTION_FEE", Some("30")),
            ],
            || {
                assert_eq!(db_max_connections(), 4);
                assert_eq!(server_port(), 8080);
                assert_eq!(grace_period_days(), 0);
                assert!((sanction_fee() - 30.0).abs() < 1e-9);
            },
        );
    }

    #[test]
    fn grace_period_defaults_to_two_days() {
        temp_env::with_var_unset("GRACE_PERIOD_DAYS", || {
            assert_eq!(grace_period_days(), 2);
        });
    }

    #[test]
    fn operator_emails_are_normalized_and_deduplicated() {
        temp_env::with_var(
            "OPERATOR_EMAILS",
            Some(" Admin@League.org, treasurer@league.org ,admin@league.org,, "),
            || {
                assert_eq!(
                    operator_emails(),
                    vec![
                        "admin@league.org".to_string(),
                        "treasurer@league.org".to_string()
                    ]
                );
            },
        );
    }

    #[test]
    fn operator_auth_flag_defaults_on_and_parses_off() {
        temp_env::with_var_unset("REQUIRE_OPERATOR_AUTH", || {
            assert!(require_operator_auth());
        });
        temp_env::with_var("REQUIRE_OPERATOR_AUTH", Some("off"), || {
            assert!(!require_operator_auth());
        });
    }

    #[test]
    fn cors_origins_are_trimmed() {
        temp_env::with_var(
            "CORS_ALLOWED_ORIGINS",
            Some("https://admin.league.org/, ,http://localhost:5173"),
            || {
                assert_eq!(
                    cors_allowed_origins(),
                    vec![
                        "https://admin.league.org".to_string(),
                        "http://localhost:5173".to_string()
                    ]
                );
            },
        );
    }

    #[test]
    fn blank_string_settings_use_defaults() {
        temp_env::with_vars(
            [("STATIC_DIR", Some("  ")), ("AUTH_USERINFO_URL", Some(""))],
            || {
                assert_eq!(static_dir(), DEFAULT_STATIC_DIR);
                assert_eq!(auth_userinfo_url(), DEFAULT_AUTH_USERINFO_URL);
            },
        );
    }
}
