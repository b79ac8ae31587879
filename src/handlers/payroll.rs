use actix_web::{HttpResponse, web};
use chrono::Utc;
use uuid::Uuid;

use crate::database::models::{GeneratePayrollInput, PayrollInput};
use crate::database::repositories::PayrollFilter;
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::{Claims, PayrollService};

pub async fn list(
    claims: Claims,
    service: web::Data<PayrollService>,
    filter: web::Query<PayrollFilter>,
) -> Result<HttpResponse, AppError> {
    let lines = service.list(&claims, filter.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(lines)))
}

pub async fn get(
    claims: Claims,
    service: web::Data<PayrollService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let line = service.get(&claims, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(line)))
}

pub async fn create(
    claims: Claims,
    service: web::Data<PayrollService>,
    input: web::Json<PayrollInput>,
) -> Result<HttpResponse, AppError> {
    let line = service
        .create(&claims, input.into_inner(), Utc::now())
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
        Some(line),
        "Payroll created successfully",
    )))
}

pub async fn update(
    claims: Claims,
    service: web::Data<PayrollService>,
    path: web::Path<Uuid>,
    input: web::Json<PayrollInput>,
) -> Result<HttpResponse, AppError> {
    let line = service
        .update(&claims, path.into_inner(), input.into_inner(), Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        Some(line),
        "Payroll updated successfully",
    )))
}

pub async fn delete(
    claims: Claims,
    service: web::Data<PayrollService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    service.delete(&claims, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::success_with_message(
        None,
        "Payroll deleted successfully",
    )))
}

pub async fn mark_paid(
    claims: Claims,
    service: web::Data<PayrollService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let line = service
        .mark_as_paid(&claims, path.into_inner(), Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        Some(line),
        "Payroll marked as paid",
    )))
}

pub async fn cancel(
    claims: Claims,
    service: web::Data<PayrollService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let line = service
        .cancel(&claims, path.into_inner(), Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        Some(line),
        "Payroll cancelled",
    )))
}

/// Create default lines for the selected employees, skipping existing ones
pub async fn generate(
    claims: Claims,
    service: web::Data<PayrollService>,
    input: web::Json<GeneratePayrollInput>,
) -> Result<HttpResponse, AppError> {
    let summary = service
        .generate(&claims, input.into_inner(), Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(summary)))
}
