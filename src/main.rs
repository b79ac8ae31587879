use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, middleware::Logger};
use anyhow::Result;

use hrms::database::init_database;
use hrms::{AppState, Config};

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now()
    }))
}

#[actix_web::main]
async fn main() -> Result<()> {
    // Load configuration (reads .env first)
    let config = Config::from_env()?;

    // Initialize logger
    env_logger::init();

    log::info!(
        "Starting HRMS API server (environment: {}, timezone: {})",
        config.environment,
        config.timezone
    );
    if config.attendance.auto_checkout_enabled {
        log::info!(
            "Auto checkout enabled: sessions close {} hours after check-in",
            config.attendance.hours_after_checkin
        );
    }

    // Initialize database
    let pool = init_database(&config.database_url).await?;
    log::info!("Database initialized");

    let server_address = config.server_address();
    let state = AppState::new(pool, config);

    log::info!("Server starting on http://{}", server_address);

    HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                    .allowed_headers(vec!["Authorization", "Content-Type", "Accept"])
                    .max_age(3600),
            )
            .wrap(Logger::new(
                r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T"#,
            ))
            .service(health)
            .configure(|cfg| state.configure(cfg))
    })
    .bind(&server_address)?
    .run()
    .await
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
