use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::time::Duration;

/// Opens a fresh pooled connection for the given DSN. The caller owns the resulting handle (no
/// process-global singleton, per the composition-root ownership model this gateway uses in place of
/// `OnceLock<RwLock<Option<SharedDb>>>`).
pub async fn connect(dsn: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opts = ConnectOptions::new(dsn.to_owned());
    opts.connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .max_connections(16);
    Database::connect(opts).await
}
