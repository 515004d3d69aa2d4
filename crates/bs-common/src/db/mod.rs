pub mod connections;
pub mod daily_matches;
pub mod feedback;
pub mod migrations;
pub mod notifications;
pub mod pool;
pub mod profiles;
pub mod redirections;
pub mod ships;
pub mod store;
pub mod util;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool_from_url, DbPoolError, PgPool};
pub use store::PgStore;

/// Declares a storage error enum carrying the pool and driver failures every
/// Postgres-backed operation can hit, plus caller-specific variants.
macro_rules! db_error {
    ($name:ident { $($variants:tt)* }) => {
        #[derive(Debug, thiserror::Error)]
        pub enum $name {
            #[error("failed to get postgres connection: {0}")]
            Pool(#[from] deadpool_postgres::PoolError),
            #[error("postgres error: {0}")]
            Postgres(#[from] tokio_postgres::Error),
            $($variants)*
        }
    };
}

pub(crate) use db_error;

/// Parses a text column into one of the strum-backed enums.
pub(crate) fn parse_column<T: std::str::FromStr>(
    value: &str,
    column: &'static str,
) -> Result<T, crate::store::StoreError> {
    value
        .parse()
        .map_err(|_| crate::store::StoreError::Mapping(format!("{column}: unexpected value {value:?}")))
}

pub(crate) fn parse_optional_column<T: std::str::FromStr>(
    value: Option<String>,
    column: &'static str,
) -> Result<Option<T>, crate::store::StoreError> {
    value.map(|v| parse_column(&v, column)).transpose()
}

/// Maps a unique-violation into [`crate::store::StoreError::Duplicate`].
pub(crate) fn map_unique_violation(
    err: tokio_postgres::Error,
    what: &'static str,
) -> crate::store::StoreError {
    if err.code() == Some(&tokio_postgres::error::SqlState::UNIQUE_VIOLATION) {
        crate::store::StoreError::Duplicate(what)
    } else {
        crate::store::StoreError::Postgres(err)
    }
}
