//! Translation of database errors into storage errors.

use sea_orm::{DbErr, RuntimeErr, SqlErr};
use tally_core::StoreError;

/// Maps a `SeaORM` error onto the storage error the services understand.
///
/// Unique violations keep the constraint name so callers can tell a duplicate
/// source key from any other clash. Connection-level sqlx failures become
/// [`StoreError::Connection`] so a sync run aborts instead of marking every
/// remaining record failed.
pub(crate) fn store_error(err: DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) => {
            return StoreError::UniqueViolation {
                constraint: constraint_name(&message).to_string(),
            };
        }
        Some(SqlErr::ForeignKeyConstraintViolation(message)) => {
            return StoreError::NotFound(message);
        }
        _ => {}
    }

    match &err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => StoreError::Connection(err.to_string()),
        DbErr::Exec(RuntimeErr::SqlxError(inner)) | DbErr::Query(RuntimeErr::SqlxError(inner))
            if is_connection_error(inner) =>
        {
            StoreError::Connection(err.to_string())
        }
        DbErr::RecordNotFound(what) => StoreError::NotFound(what.clone()),
        _ => StoreError::Query(err.to_string()),
    }
}

fn is_connection_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

/// Pulls the quoted constraint name out of a PostgreSQL unique violation
/// message, falling back to the whole message.
fn constraint_name(message: &str) -> &str {
    message
        .split('"')
        .nth(1)
        .filter(|name| !name.is_empty())
        .unwrap_or(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_name_from_postgres_message() {
        let message = r#"duplicate key value violates unique constraint "uq_transactions_active_source""#;
        assert_eq!(constraint_name(message), "uq_transactions_active_source");
    }

    #[test]
    fn test_constraint_name_falls_back_to_message() {
        assert_eq!(constraint_name("unique violation"), "unique violation");
    }

    #[test]
    fn test_connection_errors_are_systemic() {
        let err = store_error(DbErr::Conn(RuntimeErr::Internal("refused".to_string())));
        assert!(err.is_systemic());

        let err = store_error(DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::PoolTimedOut)));
        assert!(err.is_systemic());
    }

    #[test]
    fn test_other_errors_are_query_errors() {
        let err = store_error(DbErr::Custom("boom".to_string()));
        assert!(matches!(err, StoreError::Query(_)));
        assert!(!err.is_systemic());
    }
}
