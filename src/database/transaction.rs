use sqlx::{PgPool, Postgres, Transaction};

use crate::error::AppError;

pub async fn begin(pool: &PgPool) -> Result<Transaction<'static, Postgres>, AppError> {
    Ok(pool.begin().await?)
}

/// Commit on success; roll back and log on failure. Returns the original outcome.
pub async fn finish<T>(
    tx: Transaction<'static, Postgres>,
    outcome: Result<T, AppError>,
) -> Result<T, AppError> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            log::warn!("Transaction failed with error: {}, rolling back", err);
            if let Err(rollback_err) = tx.rollback().await {
                log::error!(
                    "Rollback failed after error (orig: {}, rollback: {})",
                    err,
                    rollback_err
                );
            }
            Err(err)
        }
    }
}
