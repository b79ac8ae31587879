#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::env;
use uuid::Uuid;

use hrms::config::{AttendanceSettings, Config};
use hrms::database::init_database;
use hrms::database::models::Role;
use hrms::services::Claims;

pub fn setup_test_env() {
    unsafe {
        env::set_var("RUST_LOG", "debug");
    }
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn test_config() -> Config {
    Config::test_config()
}

/// Pool that never connects unless a query runs. Covers every path that
/// fails before touching the database.
pub fn lazy_pool() -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(1))
        .connect_lazy(&test_config().database_url)
        .expect("lazy pool")
}

/// Migrated pool for database-backed tests. Run them with
/// `TEST_DATABASE_URL=... cargo test -- --ignored`.
pub async fn live_pool() -> PgPool {
    let url = env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set for database-backed tests");
    init_database(&url).await.expect("test database")
}

pub fn config_with(attendance: AttendanceSettings) -> Config {
    Config {
        attendance,
        ..test_config()
    }
}

pub fn token(user_id: Uuid, role: Role) -> String {
    let claims = Claims::new(user_id, format!("{}@example.com", user_id), role, Duration::hours(1));
    claims.encode(&test_config().jwt_secret).expect("token")
}

pub fn bearer(user_id: Uuid, role: Role) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token(user_id, role)))
}

pub async fn seed_user(pool: &PgPool, role: Role) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, name, email, role) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(format!("User {}", &id.to_string()[..8]))
        .bind(format!("{}@example.com", id))
        .bind(role)
        .execute(pool)
        .await
        .expect("seed user");
    id
}

pub async fn seed_location(
    pool: &PgPool,
    coordinates: Option<(f64, f64)>,
    radius: i32,
    validation_enabled: bool,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO locations (id, name, latitude, longitude, allowed_radius, location_validation_enabled) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(id)
    .bind("Head Office")
    .bind(coordinates.map(|c| c.0))
    .bind(coordinates.map(|c| c.1))
    .bind(radius)
    .bind(validation_enabled)
    .execute(pool)
    .await
    .expect("seed location");
    id
}

pub async fn seed_employee(
    pool: &PgPool,
    user_id: Uuid,
    reporting_manager_id: Option<Uuid>,
    location_id: Option<Uuid>,
    visa_start_date: Option<NaiveDate>,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO employees (id, user_id, employee_name, reporting_manager_id, location_id, visa_start_date) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(id)
    .bind(user_id)
    .bind(format!("Employee {}", &id.to_string()[..8]))
    .bind(reporting_manager_id)
    .bind(location_id)
    .bind(visa_start_date)
    .execute(pool)
    .await
    .expect("seed employee");
    id
}
