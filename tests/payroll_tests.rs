use actix_web::{App, http::StatusCode, test};
use chrono::{Datelike, Utc};
use hrms::AppState;
use hrms::database::models::Role;
use pretty_assertions::assert_eq;
use serde_json::json;
use serial_test::serial;
use uuid::Uuid;

mod common;

fn this_year() -> i32 {
    Utc::now().year()
}

fn line_for(employee_id: Uuid, month: i32) -> serde_json::Value {
    json!({
        "employeeId": employee_id,
        "basicSalary": "4000.00",
        "accommodation": "1500.00",
        "allowances": "250.50",
        "overtimeAmount": "120.25",
        "deductions": "300.00",
        "month": month,
        "year": this_year()
    })
}

#[actix_web::test]
async fn test_create_rejects_invalid_month() {
    common::setup_test_env();
    let state = AppState::new(common::lazy_pool(), common::test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/payroll")
        .insert_header(common::bearer(Uuid::new_v4(), Role::Admin))
        .set_json(line_for(Uuid::new_v4(), 13))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Validation failed: Month must be between 1 and 12");
}

#[actix_web::test]
async fn test_create_rejects_negative_amounts() {
    common::setup_test_env();
    let state = AppState::new(common::lazy_pool(), common::test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    let mut payload = line_for(Uuid::new_v4(), 3);
    payload["deductions"] = json!("-10");

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/payroll")
        .insert_header(common::bearer(Uuid::new_v4(), Role::Admin))
        .set_json(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "validation_error");
}

#[actix_web::test]
async fn test_create_rejects_amounts_that_overflow_storage() {
    common::setup_test_env();
    let state = AppState::new(common::lazy_pool(), common::test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    let mut payload = line_for(Uuid::new_v4(), 3);
    payload["basicSalary"] = json!("123456789012345.00");

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/payroll")
        .insert_header(common::bearer(Uuid::new_v4(), Role::Admin))
        .set_json(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "validation_error");
}

#[actix_web::test]
async fn test_payroll_mutations_are_admin_only() {
    common::setup_test_env();
    let state = AppState::new(common::lazy_pool(), common::test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/payroll")
        .insert_header(common::bearer(Uuid::new_v4(), Role::Manager))
        .set_json(line_for(Uuid::new_v4(), 3))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/admin/payroll/{}/mark-paid", Uuid::new_v4()))
        .insert_header(common::bearer(Uuid::new_v4(), Role::Employee))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_generate_requires_employees() {
    common::setup_test_env();
    let state = AppState::new(common::lazy_pool(), common::test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/payroll/generate")
        .insert_header(common::bearer(Uuid::new_v4(), Role::Admin))
        .set_json(json!({ "month": 5, "year": this_year(), "employeeIds": [] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
#[ignore = "requires TEST_DATABASE_URL"]
#[serial]
async fn test_payroll_lifecycle() {
    common::setup_test_env();
    let pool = common::live_pool().await;

    // Arrange
    let user_id = common::seed_user(&pool, Role::Employee).await;
    let employee_id = common::seed_employee(&pool, user_id, None, None, None).await;
    let admin = common::bearer(Uuid::new_v4(), Role::Admin);

    let state = AppState::new(pool.clone(), common::test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    // Act
    let req = test::TestRequest::post()
        .uri("/api/v1/admin/payroll")
        .insert_header(admin.clone())
        .set_json(line_for(employee_id, 4))
        .to_request();
    let resp = test::call_service(&app, req).await;

    // Assert
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["grossSalary"], "5870.75");
    assert_eq!(body["data"]["netSalary"], "5570.75");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    // Same employee and period again
    let req = test::TestRequest::post()
        .uri("/api/v1/admin/payroll")
        .insert_header(admin.clone())
        .set_json(line_for(employee_id, 4))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "duplicate_payroll");

    // Paying twice leaves the line as it was
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/admin/payroll/{}/mark-paid", id))
        .insert_header(admin.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let first: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(first["data"]["status"], "paid");
    assert!(first["data"]["paymentDate"].is_string());

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/admin/payroll/{}/mark-paid", id))
        .insert_header(admin.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let second: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(second["data"]["paymentDate"], first["data"]["paymentDate"]);
    assert_eq!(second["data"]["updatedAt"], first["data"]["updatedAt"]);

    // Paid lines are frozen
    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/admin/payroll/{}", id))
        .insert_header(admin.clone())
        .set_json(line_for(employee_id, 4))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "already_paid");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/admin/payroll/{}", id))
        .insert_header(admin.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "cannot_delete_paid");

    // The employee sees their own line
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/payroll/{}", id))
        .insert_header(common::bearer(user_id, Role::Employee))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
#[ignore = "requires TEST_DATABASE_URL"]
#[serial]
async fn test_cancelled_payroll_cannot_be_paid() {
    common::setup_test_env();
    let pool = common::live_pool().await;

    let user_id = common::seed_user(&pool, Role::Employee).await;
    let employee_id = common::seed_employee(&pool, user_id, None, None, None).await;
    let admin = common::bearer(Uuid::new_v4(), Role::Admin);

    let state = AppState::new(pool.clone(), common::test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/payroll")
        .insert_header(admin.clone())
        .set_json(line_for(employee_id, 6))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: serde_json::Value = test::read_body_json(resp).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/admin/payroll/{}/cancel", id))
        .insert_header(admin.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "cancelled");

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/admin/payroll/{}/mark-paid", id))
        .insert_header(admin.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "payroll_cancelled");

    // Unpaid lines may be removed
    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/admin/payroll/{}", id))
        .insert_header(admin.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
#[ignore = "requires TEST_DATABASE_URL"]
#[serial]
async fn test_generate_skips_existing_lines() {
    common::setup_test_env();
    let pool = common::live_pool().await;

    let first_user = common::seed_user(&pool, Role::Employee).await;
    let first = common::seed_employee(&pool, first_user, None, None, None).await;
    let second_user = common::seed_user(&pool, Role::Employee).await;
    let second = common::seed_employee(&pool, second_user, None, None, None).await;
    let admin = common::bearer(Uuid::new_v4(), Role::Admin);

    let state = AppState::new(pool.clone(), common::test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/payroll")
        .insert_header(admin.clone())
        .set_json(line_for(first, 8))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/payroll/generate")
        .insert_header(admin.clone())
        .set_json(json!({ "month": 8, "year": this_year(), "employeeIds": [first, second] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["generated"], 1);
    assert_eq!(body["data"]["skipped"], 1);

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/payroll/generate")
        .insert_header(admin.clone())
        .set_json(json!({ "month": 8, "year": this_year(), "employeeIds": [Uuid::new_v4()] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
