use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::database::models::{
    AttendanceFilter, AttendanceReportQuery, CheckInInput, CheckOutInput,
};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::{AttendanceService, Claims};

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub month: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AutoCheckoutResult {
    pub processed: usize,
}

/// Check in to today's shift
pub async fn check_in(
    claims: Claims,
    config: web::Data<Config>,
    service: web::Data<AttendanceService>,
    input: web::Json<CheckInInput>,
) -> Result<HttpResponse, AppError> {
    let outcome = service
        .check_in(&claims, input.into_inner(), &config.attendance, Utc::now())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        Some(outcome),
        "Checked in successfully",
    )))
}

/// Check out of the open session for today
pub async fn check_out(
    claims: Claims,
    service: web::Data<AttendanceService>,
    input: web::Json<CheckOutInput>,
) -> Result<HttpResponse, AppError> {
    let outcome = service
        .check_out(&claims, input.into_inner(), Utc::now())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        Some(outcome),
        "Checked out successfully",
    )))
}

pub async fn start_break(
    _claims: Claims,
    service: web::Data<AttendanceService>,
) -> Result<HttpResponse, AppError> {
    service.start_break()?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn end_break(
    _claims: Claims,
    service: web::Data<AttendanceService>,
) -> Result<HttpResponse, AppError> {
    service.end_break()?;
    Ok(HttpResponse::NoContent().finish())
}

/// Own records and stats for a month (defaults to the current one)
pub async fn monthly(
    claims: Claims,
    service: web::Data<AttendanceService>,
    query: web::Query<MonthQuery>,
) -> Result<HttpResponse, AppError> {
    let view = service
        .monthly(&claims, query.month.as_deref(), Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(view)))
}

pub async fn today(
    claims: Claims,
    service: web::Data<AttendanceService>,
) -> Result<HttpResponse, AppError> {
    let records = service.today(&claims, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(records)))
}

/// Close sessions left open past the cutoff. Meant to be triggered by a scheduler.
pub async fn auto_checkout(
    claims: Claims,
    config: web::Data<Config>,
    service: web::Data<AttendanceService>,
) -> Result<HttpResponse, AppError> {
    claims.require_admin()?;
    let processed = service
        .auto_checkout(&config.attendance, Utc::now())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(AutoCheckoutResult { processed })))
}

/// All employees' records, filtered and paginated
pub async fn list_all(
    claims: Claims,
    service: web::Data<AttendanceService>,
    query: web::Query<AttendanceFilter>,
) -> Result<HttpResponse, AppError> {
    let page = service.list_all(&claims, &query).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(page)))
}

/// Per-employee attendance totals over a date range
pub async fn report(
    claims: Claims,
    service: web::Data<AttendanceService>,
    query: web::Query<AttendanceReportQuery>,
) -> Result<HttpResponse, AppError> {
    let report = service.report(&claims, &query, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(report)))
}
