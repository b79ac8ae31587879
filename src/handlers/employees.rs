use actix_web::{HttpResponse, web};
use chrono::Utc;

use crate::database::models::EmployeeInput;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::{Claims, EmployeeService};

/// Create an employee record for an existing user
pub async fn create(
    claims: Claims,
    service: web::Data<EmployeeService>,
    input: web::Json<EmployeeInput>,
) -> Result<HttpResponse, AppError> {
    let employee = service
        .create(&claims, input.into_inner(), Utc::now())
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(employee)))
}
