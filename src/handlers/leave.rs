use actix_web::{HttpResponse, web};
use chrono::Utc;
use uuid::Uuid;

use crate::database::models::{
    LeaveBalanceOverrideInput, LeaveDecisionInput, LeaveRequestFilter, LeaveRequestInput,
};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::{Claims, LeaveService};

/// Submit a leave request
pub async fn submit(
    claims: Claims,
    service: web::Data<LeaveService>,
    input: web::Json<LeaveRequestInput>,
) -> Result<HttpResponse, AppError> {
    let request = service
        .submit(&claims, input.into_inner(), Utc::now())
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::success_with_message(
        Some(request),
        "Leave request submitted successfully",
    )))
}

/// Requests visible to the caller's role
pub async fn list(
    claims: Claims,
    service: web::Data<LeaveService>,
    filter: web::Query<LeaveRequestFilter>,
) -> Result<HttpResponse, AppError> {
    let requests = service.list(&claims, &filter).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(requests)))
}

pub async fn list_own(
    claims: Claims,
    service: web::Data<LeaveService>,
    filter: web::Query<LeaveRequestFilter>,
) -> Result<HttpResponse, AppError> {
    let requests = service.list_own(&claims, &filter).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(requests)))
}

pub async fn get(
    claims: Claims,
    service: web::Data<LeaveService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let request = service.get(&claims, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(request)))
}

pub async fn balance(
    claims: Claims,
    service: web::Data<LeaveService>,
) -> Result<HttpResponse, AppError> {
    let balance = service.balance(&claims, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(balance)))
}

async fn decide(
    claims: Claims,
    service: web::Data<LeaveService>,
    id: Uuid,
    input: LeaveDecisionInput,
    admin: bool,
    approve: bool,
) -> Result<HttpResponse, AppError> {
    let now = Utc::now();
    let comments = input.comments.as_deref();
    let request = if admin {
        service.admin_decide(&claims, id, approve, comments, now).await?
    } else {
        service.manager_decide(&claims, id, approve, comments, now).await?
    };

    let message = if approve {
        "Leave request approved"
    } else {
        "Leave request rejected"
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(Some(request), message)))
}

pub async fn manager_approve(
    claims: Claims,
    service: web::Data<LeaveService>,
    path: web::Path<Uuid>,
    input: Option<web::Json<LeaveDecisionInput>>,
) -> Result<HttpResponse, AppError> {
    let input = input.map(|json| json.into_inner()).unwrap_or_default();
    decide(claims, service, path.into_inner(), input, false, true).await
}

pub async fn manager_reject(
    claims: Claims,
    service: web::Data<LeaveService>,
    path: web::Path<Uuid>,
    input: web::Json<LeaveDecisionInput>,
) -> Result<HttpResponse, AppError> {
    decide(claims, service, path.into_inner(), input.into_inner(), false, false).await
}

pub async fn admin_approve(
    claims: Claims,
    service: web::Data<LeaveService>,
    path: web::Path<Uuid>,
    input: Option<web::Json<LeaveDecisionInput>>,
) -> Result<HttpResponse, AppError> {
    let input = input.map(|json| json.into_inner()).unwrap_or_default();
    decide(claims, service, path.into_inner(), input, true, true).await
}

pub async fn admin_reject(
    claims: Claims,
    service: web::Data<LeaveService>,
    path: web::Path<Uuid>,
    input: web::Json<LeaveDecisionInput>,
) -> Result<HttpResponse, AppError> {
    decide(claims, service, path.into_inner(), input.into_inner(), true, false).await
}

/// Balance view for every active employee
pub async fn report(
    claims: Claims,
    service: web::Data<LeaveService>,
) -> Result<HttpResponse, AppError> {
    let entries = service.report(&claims, Utc::now()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(entries)))
}

/// Refresh cached balances. Meant to be triggered by a scheduler.
pub async fn sync_balances(
    claims: Claims,
    service: web::Data<LeaveService>,
) -> Result<HttpResponse, AppError> {
    claims.require_admin()?;
    let summary = service.sync_balances(Utc::now()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(summary)))
}

pub async fn override_balance(
    claims: Claims,
    service: web::Data<LeaveService>,
    path: web::Path<Uuid>,
    input: web::Json<LeaveBalanceOverrideInput>,
) -> Result<HttpResponse, AppError> {
    let employee = service
        .override_balance(&claims, path.into_inner(), input.into_inner(), Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        Some(employee),
        "Leave balance updated",
    )))
}
