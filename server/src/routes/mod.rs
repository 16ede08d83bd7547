pub mod api;
pub mod auth;
pub mod divisions;
pub mod reports;
pub mod teams;

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
