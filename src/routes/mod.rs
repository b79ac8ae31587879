use actix_web::web;

use crate::handlers::shared::{json_config, path_config, query_config};

pub mod admin;
pub mod attendance;
pub mod leave;
pub mod payroll;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .service(
            web::scope("/api/v1")
                .configure(attendance::configure)
                .configure(leave::configure)
                .configure(payroll::configure)
                .configure(admin::configure),
        );
}
