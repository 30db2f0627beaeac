// sqlx::Error -> AppError
//
// Conversion lives here because of the orphan rule (core cannot know sqlx).

use waitline_core::error::AppError;

/// Map a sqlx error onto the store error taxonomy
///
/// Lock contention (SQLITE_BUSY / SQLITE_LOCKED and their extended codes)
/// is retryable and becomes `Conflict`; everything else is `StoreUnavailable`
/// except constraint violations, which indicate a bug and become `Internal`.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            // SQLite result codes: https://www.sqlite.org/rescode.html
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            match code.as_str() {
                // SQLITE_BUSY, SQLITE_LOCKED, SQLITE_LOCKED_SHAREDCACHE, SQLITE_BUSY_SNAPSHOT
                "5" | "6" | "262" | "517" => {
                    AppError::Conflict(format!("database locked ({}): {}", code, db_err.message()))
                }
                // UNIQUE / PRIMARY KEY / CHECK constraint failed
                "2067" | "1555" | "275" => AppError::Internal(format!(
                    "constraint violation ({}): {}",
                    code,
                    db_err.message()
                )),
                "" => AppError::StoreUnavailable(format!("database error: {}", db_err.message())),
                _ => AppError::StoreUnavailable(format!(
                    "database error [{}]: {}",
                    code,
                    db_err.message()
                )),
            }
        }
        sqlx::Error::PoolTimedOut => AppError::StoreUnavailable("connection pool timed out".to_string()),
        _ => AppError::StoreUnavailable(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_unavailable() {
        let err = map_sqlx_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, AppError::StoreUnavailable(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_row_not_found_is_unavailable() {
        let err = map_sqlx_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::StoreUnavailable(_)));
    }
}
