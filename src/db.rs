use std::time::Duration;

use sqlx::MySqlPool;
use tracing::warn;

const MAX_CONNECT_ATTEMPTS: u32 = 5;

/// Connect with bounded backoff. Transient storage failures are retried
/// here at the collaborator boundary, never inside the domain logic.
pub async fn init_db(database_url: &str) -> MySqlPool {
    let mut attempt = 0;
    loop {
        match MySqlPool::connect(database_url).await {
            Ok(pool) => return pool,
            Err(e) if attempt + 1 < MAX_CONNECT_ATTEMPTS => {
                attempt += 1;
                let backoff = Duration::from_millis(500 * 2u64.pow(attempt));
                warn!(error = %e, attempt, "Database connect failed, retrying");
                actix_web::rt::time::sleep(backoff).await;
            }
            Err(e) => panic!("Failed to connect to database: {e}"),
        }
    }
}

/// True when the error is a MySQL duplicate-key violation (ER_DUP_ENTRY,
/// error 1062). SQLSTATE 23000 is too broad: it also covers foreign-key
/// violations, which must not read as "already exists".
pub fn is_duplicate_key(e: &sqlx::Error) -> bool {
    let sqlx::Error::Database(db) = e else {
        return false;
    };
    db.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
        .map(|mysql| mysql.number() == 1062)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_are_not_duplicates() {
        assert!(!is_duplicate_key(&sqlx::Error::RowNotFound));
        assert!(!is_duplicate_key(&sqlx::Error::PoolClosed));
    }
}
