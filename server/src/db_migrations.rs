use std::path::PathBuf;

const WORKSPACE_MIGRATIONS_DIR: &str = "server/migrations";
const CRATE_MIGRATIONS_DIR: &str = "./migrations";

/// `MIGRATIONS_DIR` wins; otherwise prefer the workspace layout when run from
/// the repository root.
fn migrations_path() -> PathBuf {
    if let Ok(dir) = std::env::var("MIGRATIONS_DIR")
        && !dir.trim().is_empty()
    {
        return PathBuf::from(dir.trim());
    }
    let workspace_path = PathBuf::from(WORKSPACE_MIGRATIONS_DIR);
    if workspace_path.exists() {
        return workspace_path;
    }
    PathBuf::from(CRATE_MIGRATIONS_DIR)
}

pub async fn run(pool: &sqlx::PgPool) -> Result<(), sqlx_core::migrate::MigrateError> {
    let path = migrations_path();
    tracing::debug!(path = %path.display(), "applying migrations");
    let migrator = sqlx_core::migrate::Migrator::new(path).await?;
    migrator.run(pool).await
}
