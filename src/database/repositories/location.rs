use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{models::Location, utils::sql};

#[derive(Clone)]
pub struct LocationRepository {
    pool: PgPool,
}

impl LocationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an office location by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Location>, sqlx::Error> {
        sqlx::query_as::<_, Location>(&sql(r#"
            SELECT
                id,
                name,
                address,
                latitude,
                longitude,
                allowed_radius,
                location_validation_enabled,
                created_at,
                updated_at
            FROM
                locations
            WHERE
                id = ?
        "#))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}
