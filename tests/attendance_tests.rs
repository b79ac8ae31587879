use actix_web::{App, http::StatusCode, test};
use chrono::NaiveDate;
use hrms::AppState;
use hrms::config::AttendanceSettings;
use hrms::database::models::Role;
use pretty_assertions::assert_eq;
use serde_json::json;
use serial_test::serial;
use uuid::Uuid;

mod common;

const OFFICE: (f64, f64) = (25.2048, 55.2708);

#[actix_web::test]
async fn test_check_in_requires_bearer_token() {
    common::setup_test_env();
    let state = AppState::new(common::lazy_pool(), common::test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/attendance/check-in")
        .set_json(json!({ "latitude": OFFICE.0, "longitude": OFFICE.1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "unauthorized");

    let req = test::TestRequest::post()
        .uri("/api/v1/attendance/check-in")
        .insert_header(("Authorization", "Bearer not-a-token"))
        .set_json(json!({ "latitude": OFFICE.0, "longitude": OFFICE.1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_check_in_rejects_invalid_coordinates() {
    common::setup_test_env();
    let state = AppState::new(common::lazy_pool(), common::test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/attendance/check-in")
        .insert_header(common::bearer(Uuid::new_v4(), Role::Employee))
        .set_json(json!({ "latitude": 91.0, "longitude": OFFICE.1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "validation_error");
}

#[actix_web::test]
async fn test_malformed_body_is_a_validation_error() {
    common::setup_test_env();
    let state = AppState::new(common::lazy_pool(), common::test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/attendance/check-out")
        .insert_header(common::bearer(Uuid::new_v4(), Role::Employee))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"latitude\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "validation_error");
}

#[actix_web::test]
async fn test_admin_cannot_check_in() {
    common::setup_test_env();
    let state = AppState::new(common::lazy_pool(), common::test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/attendance/check-in")
        .insert_header(common::bearer(Uuid::new_v4(), Role::Admin))
        .set_json(json!({ "latitude": OFFICE.0, "longitude": OFFICE.1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_breaks_are_not_supported() {
    common::setup_test_env();
    let state = AppState::new(common::lazy_pool(), common::test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    for uri in ["/api/v1/attendance/start-break", "/api/v1/attendance/end-break"] {
        let req = test::TestRequest::post()
            .uri(uri)
            .insert_header(common::bearer(Uuid::new_v4(), Role::Employee))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "unsupported");
    }
}

#[actix_web::test]
async fn test_auto_checkout_is_a_no_op_when_disabled() {
    common::setup_test_env();
    let state = AppState::new(common::lazy_pool(), common::test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/attendance/auto-checkout")
        .insert_header(common::bearer(Uuid::new_v4(), Role::Admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["processed"], 0);
}

#[actix_web::test]
async fn test_auto_checkout_is_admin_only() {
    common::setup_test_env();
    let state = AppState::new(common::lazy_pool(), common::test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/attendance/auto-checkout")
        .insert_header(common::bearer(Uuid::new_v4(), Role::Employee))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "permission_denied");
}

#[actix_web::test]
async fn test_monthly_rejects_malformed_month() {
    common::setup_test_env();
    let state = AppState::new(common::lazy_pool(), common::test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    for month in ["2026-13", "March", "2026-3-1"] {
        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/attendance?month={}", month))
            .insert_header(common::bearer(Uuid::new_v4(), Role::Employee))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "month {}", month);
    }
}

#[actix_web::test]
async fn test_auto_checkout_rejects_an_unrepresentable_cutoff() {
    common::setup_test_env();
    let config = common::config_with(AttendanceSettings {
        auto_checkout_enabled: true,
        hours_after_checkin: i64::MAX,
        ..AttendanceSettings::default()
    });
    let state = AppState::new(common::lazy_pool(), config);
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/attendance/auto-checkout")
        .insert_header(common::bearer(Uuid::new_v4(), Role::Admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "validation_error");
}

#[actix_web::test]
async fn test_admin_attendance_views_reject_other_roles() {
    common::setup_test_env();
    let state = AppState::new(common::lazy_pool(), common::test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    for uri in ["/api/v1/admin/attendance", "/api/v1/admin/attendance/report"] {
        for role in [Role::Employee, Role::Manager] {
            let req = test::TestRequest::get()
                .uri(uri)
                .insert_header(common::bearer(Uuid::new_v4(), role))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{} as {:?}", uri, role);
        }
    }
}

#[actix_web::test]
async fn test_admin_attendance_views_validate_ranges() {
    common::setup_test_env();
    let state = AppState::new(common::lazy_pool(), common::test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    for uri in [
        "/api/v1/admin/attendance?month=2026-13",
        "/api/v1/admin/attendance?dateFrom=2026-03-10&dateTo=2026-03-01",
        "/api/v1/admin/attendance?perPage=500",
        "/api/v1/admin/attendance/report?startDate=2026-03-10&endDate=2026-03-01",
    ] {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header(common::bearer(Uuid::new_v4(), Role::Admin))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "validation_error", "{}", uri);
    }
}

#[actix_web::test]
#[ignore = "requires TEST_DATABASE_URL"]
#[serial]
async fn test_check_in_and_check_out_flow() {
    common::setup_test_env();
    let pool = common::live_pool().await;

    // Arrange
    let user_id = common::seed_user(&pool, Role::Employee).await;
    let location_id = common::seed_location(&pool, Some(OFFICE), 100, true).await;
    common::seed_employee(
        &pool,
        user_id,
        None,
        Some(location_id),
        NaiveDate::from_ymd_opt(2025, 1, 1),
    )
    .await;

    let state = AppState::new(pool.clone(), common::test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    // Act: check in at the office
    let req = test::TestRequest::post()
        .uri("/api/v1/attendance/check-in")
        .insert_header(common::bearer(user_id, Role::Employee))
        .set_json(json!({
            "latitude": OFFICE.0,
            "longitude": OFFICE.1,
            "accuracy": 8.0,
            "address": "Main Gate"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    // Assert
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["record"]["status"], "checked_in");
    assert_eq!(body["data"]["record"]["shift"], "morning");
    assert_eq!(body["data"]["record"]["checkInAddress"], "Main Gate");
    assert_eq!(body["data"]["withinOfficeRadius"], true);
    assert!(body["data"]["checkInTime"].is_string());

    // Act: second check-in for the same shift
    let req = test::TestRequest::post()
        .uri("/api/v1/attendance/check-in")
        .insert_header(common::bearer(user_id, Role::Employee))
        .set_json(json!({ "latitude": OFFICE.0, "longitude": OFFICE.1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "already_checked_in");

    // Act: check out with a note
    let req = test::TestRequest::post()
        .uri("/api/v1/attendance/check-out")
        .insert_header(common::bearer(user_id, Role::Employee))
        .set_json(json!({
            "latitude": OFFICE.0,
            "longitude": OFFICE.1,
            "notes": "Left for a site visit"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["record"]["status"], "present");
    assert_eq!(body["data"]["record"]["notes"], "Left for a site visit");
    assert!(body["data"]["record"]["checkOutTime"].is_string());
    assert!(!body["data"]["totalHours"].is_null());

    // Act: nothing left open to close
    let req = test::TestRequest::post()
        .uri("/api/v1/attendance/check-out")
        .insert_header(common::bearer(user_id, Role::Employee))
        .set_json(json!({ "latitude": OFFICE.0, "longitude": OFFICE.1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "no_active_check_in");

    // Today's view lists the closed session
    let req = test::TestRequest::get()
        .uri("/api/v1/attendance/today")
        .insert_header(common::bearer(user_id, Role::Employee))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
}

#[actix_web::test]
#[ignore = "requires TEST_DATABASE_URL"]
#[serial]
async fn test_check_out_without_check_in_is_a_conflict() {
    common::setup_test_env();
    let pool = common::live_pool().await;

    let user_id = common::seed_user(&pool, Role::Employee).await;
    common::seed_employee(&pool, user_id, None, None, None).await;

    let state = AppState::new(pool.clone(), common::test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/attendance/check-out")
        .insert_header(common::bearer(user_id, Role::Employee))
        .set_json(json!({ "latitude": OFFICE.0, "longitude": OFFICE.1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "no_active_check_in");
}

#[actix_web::test]
#[ignore = "requires TEST_DATABASE_URL"]
#[serial]
async fn test_check_in_outside_geofence_is_rejected() {
    common::setup_test_env();
    let pool = common::live_pool().await;

    let user_id = common::seed_user(&pool, Role::Employee).await;
    let location_id = common::seed_location(&pool, Some(OFFICE), 100, true).await;
    common::seed_employee(&pool, user_id, None, Some(location_id), None).await;

    let state = AppState::new(pool.clone(), common::test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    // Roughly 1.1 km north of the office.
    let req = test::TestRequest::post()
        .uri("/api/v1/attendance/check-in")
        .insert_header(common::bearer(user_id, Role::Employee))
        .set_json(json!({ "latitude": OFFICE.0 + 0.01, "longitude": OFFICE.1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "outside_geofence");

    let open: Option<(Uuid,)> =
        sqlx::query_as("SELECT a.id FROM attendance a JOIN employees e ON e.id = a.employee_id WHERE e.user_id = $1")
            .bind(user_id)
            .fetch_optional(&pool)
            .await
            .unwrap();
    assert!(open.is_none());
}

#[actix_web::test]
#[ignore = "requires TEST_DATABASE_URL"]
#[serial]
async fn test_auto_checkout_closes_overdue_sessions() {
    common::setup_test_env();
    let pool = common::live_pool().await;

    let user_id = common::seed_user(&pool, Role::Employee).await;
    let employee_id = common::seed_employee(&pool, user_id, None, None, None).await;
    sqlx::query(
        "INSERT INTO attendance (id, employee_id, date, shift, check_in_time, check_in_latitude, \
         check_in_longitude, check_in_address, status) \
         VALUES ($1, $2, CURRENT_DATE - 1, 'morning', NOW() - INTERVAL '13 hours', $3, $4, 'Gate', 'checked_in')",
    )
    .bind(Uuid::new_v4())
    .bind(employee_id)
    .bind(OFFICE.0)
    .bind(OFFICE.1)
    .execute(&pool)
    .await
    .unwrap();

    let config = common::config_with(AttendanceSettings {
        auto_checkout_enabled: true,
        ..AttendanceSettings::default()
    });
    let state = AppState::new(pool.clone(), config);
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/attendance/auto-checkout")
        .insert_header(common::bearer(Uuid::new_v4(), Role::Admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["data"]["processed"].as_u64().unwrap_or(0) >= 1);

    let (status, address, notes): (String, Option<String>, Option<String>) = sqlx::query_as(
        "SELECT status, check_out_address, notes FROM attendance WHERE employee_id = $1",
    )
    .bind(employee_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(status, "present");
    assert_eq!(address.as_deref(), Some("System Auto Checkout"));
    assert!(notes.unwrap_or_default().contains("12 hours"));
}

#[actix_web::test]
#[ignore = "requires TEST_DATABASE_URL"]
#[serial]
async fn test_auto_checkout_closes_sessions_open_for_weeks() {
    common::setup_test_env();
    let pool = common::live_pool().await;

    let user_id = common::seed_user(&pool, Role::Employee).await;
    let employee_id = common::seed_employee(&pool, user_id, None, None, None).await;
    for (days_ago, opened) in [(45, "45 days"), (1, "13 hours")] {
        sqlx::query(&format!(
            "INSERT INTO attendance (id, employee_id, date, shift, check_in_time, check_in_latitude, \
             check_in_longitude, check_in_address, status) \
             VALUES ($1, $2, CURRENT_DATE - {}, 'morning', NOW() - INTERVAL '{}', $3, $4, 'Gate', 'checked_in')",
            days_ago, opened
        ))
        .bind(Uuid::new_v4())
        .bind(employee_id)
        .bind(OFFICE.0)
        .bind(OFFICE.1)
        .execute(&pool)
        .await
        .unwrap();
    }

    let config = common::config_with(AttendanceSettings {
        auto_checkout_enabled: true,
        ..AttendanceSettings::default()
    });
    let state = AppState::new(pool.clone(), config);
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/admin/attendance/auto-checkout")
        .insert_header(common::bearer(Uuid::new_v4(), Role::Admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["data"]["processed"].as_u64().unwrap_or(0) >= 2);

    let (closed, longest): (i64, Option<f64>) = sqlx::query_as(
        "SELECT COUNT(*), MAX(total_hours)::float8 FROM attendance \
         WHERE employee_id = $1 AND status = 'present' AND check_out_time IS NOT NULL",
    )
    .bind(employee_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(closed, 2);
    assert!(longest.unwrap_or_default() >= 45.0 * 24.0);

    // A later sweep has nothing of this employee's left to close
    let req = test::TestRequest::post()
        .uri("/api/v1/admin/attendance/auto-checkout")
        .insert_header(common::bearer(Uuid::new_v4(), Role::Admin))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

async fn seed_attendance(
    pool: &sqlx::PgPool,
    employee_id: Uuid,
    date: NaiveDate,
    shift: &str,
    status: &str,
    hours: Option<f64>,
) {
    sqlx::query(
        "INSERT INTO attendance (id, employee_id, date, shift, status, total_hours) \
         VALUES ($1, $2, $3, $4, $5, $6::float8)",
    )
    .bind(Uuid::new_v4())
    .bind(employee_id)
    .bind(date)
    .bind(shift)
    .bind(status)
    .bind(hours)
    .execute(pool)
    .await
    .unwrap();
}

#[actix_web::test]
#[ignore = "requires TEST_DATABASE_URL"]
#[serial]
async fn test_admin_listing_and_report_cover_all_employees() {
    common::setup_test_env();
    let pool = common::live_pool().await;

    let user_id = common::seed_user(&pool, Role::Employee).await;
    let employee_id = common::seed_employee(&pool, user_id, None, None, None).await;
    let name_fragment = &employee_id.to_string()[..8];
    let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    seed_attendance(&pool, employee_id, start, "morning", "present", Some(8.0)).await;
    seed_attendance(&pool, employee_id, start.succ_opt().unwrap(), "evening", "late", Some(6.0)).await;
    seed_attendance(&pool, employee_id, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(), "morning", "half_day", None).await;
    seed_attendance(&pool, employee_id, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(), "morning", "absent", None).await;

    let state = AppState::new(pool.clone(), common::test_config());
    let app = test::init_service(App::new().configure(|cfg| state.configure(cfg))).await;
    let admin = common::bearer(Uuid::new_v4(), Role::Admin);

    // Listing filtered by name, month and status
    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/v1/admin/attendance?employee={}&month=2024-03&status=late",
            name_fragment
        ))
        .insert_header(admin.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["records"][0]["shift"], "evening");
    assert_eq!(body["data"]["records"][0]["employeeId"], employee_id.to_string());
    assert!(body["data"]["records"][0]["employeeName"]
        .as_str()
        .unwrap_or_default()
        .contains(name_fragment));

    // Shift filter with pagination
    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/v1/admin/attendance?employee={}&shift=morning&perPage=2&page=1",
            name_fragment
        ))
        .insert_header(admin.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["records"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["data"]["records"][0]["date"], "2024-03-05");

    // Report counts late days as present
    let req = test::TestRequest::get()
        .uri("/api/v1/admin/attendance/report?startDate=2024-03-01&endDate=2024-03-31")
        .insert_header(admin)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    let entry = body["data"]["employees"]
        .as_array()
        .and_then(|rows| {
            rows.iter()
                .find(|row| row["employeeId"] == employee_id.to_string())
        })
        .cloned()
        .unwrap();
    assert_eq!(entry["totalDays"], 4);
    assert_eq!(entry["presentDays"], 2);
    assert_eq!(entry["lateDays"], 1);
    assert_eq!(entry["absentDays"], 1);
    assert_eq!(entry["halfDays"], 1);
    assert_eq!(entry["totalHours"], "14.00");
    assert_eq!(entry["averageHours"], "7.00");
}
