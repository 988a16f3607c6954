//! Integration tests for the library management API
//!
//! These tests drive whole workflows through the router: catalog
//! management, the issue/reservation state machine, extensions, fines
//! and simulated payments, suggestions, reviews, and notifications.

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tower::ServiceExt;

use bookhive::database::{init_db, AppState};
use bookhive::payment::SimulatedGateway;
use bookhive::route::create_app;

/// Helper function to create a test application with a temporary database
/// and a zero-delay payment gateway.
fn setup_test_app() -> (axum::Router, NamedTempFile) {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = temp_db.path().to_str().unwrap();

    let db = init_db(db_path).expect("Failed to initialize test database");
    let state = AppState::new(db, Arc::new(SimulatedGateway::instant()));

    (create_app(state), temp_db)
}

/// Helper function to parse response body as JSON
async fn response_json(body: Body) -> Value {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

/// Cookies captured from a login response, replayed on later requests.
#[derive(Clone)]
struct Session {
    sessionid: String,
    csrftoken: String,
}

fn session_from(response: &Response<Body>) -> Session {
    let mut sessionid = None;
    let mut csrftoken = None;
    for value in response.headers().get_all(header::SET_COOKIE) {
        let raw = value.to_str().expect("cookie not utf-8");
        let pair = raw.split(';').next().unwrap_or_default();
        if let Some((name, value)) = pair.split_once('=') {
            match name {
                "sessionid" => sessionid = Some(value.to_string()),
                "csrftoken" => csrftoken = Some(value.to_string()),
                _ => {}
            }
        }
    }
    Session {
        sessionid: sessionid.expect("no sessionid cookie"),
        csrftoken: csrftoken.expect("no csrftoken cookie"),
    }
}

/// Sends one request through the router, attaching session and CSRF
/// headers when a session is given.
async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    session: Option<&Session>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(session) = session {
        builder = builder
            .header(
                header::COOKIE,
                format!(
                    "sessionid={}; csrftoken={}",
                    session.sessionid, session.csrftoken
                ),
            )
            .header("X-CSRFToken", session.csrftoken.clone());
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    app.clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

async fn login(app: &axum::Router, username: &str, password: &str) -> Session {
    let response = send(
        app,
        "POST",
        "/api/auth/login/",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK, "login failed for {username}");
    session_from(&response)
}

async fn register_student(app: &axum::Router, username: &str) -> Session {
    let response = send(
        app,
        "POST",
        "/api/auth/register/",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "hunter2222",
            "roll_number": "R-100"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    session_from(&response)
}

/// Owner logs in with the seeded bootstrap account and creates an admin.
async fn setup_admin(app: &axum::Router) -> Session {
    let owner = login(app, "owner", "owner12345").await;
    let response = send(
        app,
        "POST",
        "/api/users/register_admin/",
        Some(&owner),
        Some(json!({
            "username": "librarian",
            "password": "stacks1234",
            "email": "librarian@example.com"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    login(app, "librarian", "stacks1234").await
}

/// Creates one author, one category, and a book with the given quantity;
/// returns the book id.
async fn setup_book(app: &axum::Router, admin: &Session, title: &str, quantity: u32) -> u64 {
    let response = send(
        app,
        "POST",
        "/api/authors/",
        Some(admin),
        Some(json!({ "name": format!("{title} author"), "bio": "" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let author_id = response_json(response.into_body()).await["id"].as_u64().unwrap();

    let response = send(
        app,
        "POST",
        "/api/categories/",
        Some(admin),
        Some(json!({ "name": format!("{title} category") })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let category_id = response_json(response.into_body()).await["id"].as_u64().unwrap();

    let response = send(
        app,
        "POST",
        "/api/books/",
        Some(admin),
        Some(json!({
            "title": title,
            "isbn": format!("isbn-{title}"),
            "author_id": author_id,
            "category_id": category_id,
            "quantity": quantity,
            "description": ""
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response_json(response.into_body()).await["id"].as_u64().unwrap()
}

#[tokio::test]
async fn test_book_search_and_pagination_envelope() {
    let (app, _temp_db) = setup_test_app();
    let admin = setup_admin(&app).await;

    setup_book(&app, &admin, "Dune", 2).await;
    setup_book(&app, &admin, "Emma", 1).await;

    let response = send(&app, "GET", "/api/books/?search=dune", Some(&admin), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["count"], 1);
    assert!(body["next"].is_null());
    assert!(body["previous"].is_null());
    assert_eq!(body["results"][0]["title"], "Dune");
    assert_eq!(body["results"][0]["available_count"], 2);
}

#[tokio::test]
async fn test_issue_request_approve_and_reserve_gating() {
    let (app, _temp_db) = setup_test_app();
    let admin = setup_admin(&app).await;
    let book_id = setup_book(&app, &admin, "Dune", 1).await;

    let alice = register_student(&app, "alice").await;
    let bob = register_student(&app, "bob").await;

    // While a copy is on the shelf, reserving is rejected
    let response = send(
        &app,
        "POST",
        "/api/reservations/",
        Some(&alice),
        Some(json!({ "book_id": book_id })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Alice requests the last copy
    let response = send(
        &app,
        "POST",
        "/api/issues/",
        Some(&alice),
        Some(json!({ "book_id": book_id })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let issue = response_json(response.into_body()).await;
    assert_eq!(issue["status"], "REQUESTED");
    let issue_id = issue["id"].as_u64().unwrap();

    // Approval decrements stock and stamps the dates
    let response = send(
        &app,
        "POST",
        &format!("/api/issues/{issue_id}/approve/"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let issue = response_json(response.into_body()).await;
    assert_eq!(issue["status"], "ISSUED");
    assert!(!issue["due_date"].is_null());

    // Now the book is exhausted: Bob cannot request, but can reserve
    let response = send(
        &app,
        "POST",
        "/api/issues/",
        Some(&bob),
        Some(json!({ "book_id": book_id })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        "/api/reservations/",
        Some(&bob),
        Some(json!({ "book_id": book_id })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let reservation = response_json(response.into_body()).await;
    assert_eq!(reservation["status"], "ACTIVE");

    // A second active reservation for the same book is a conflict
    let response = send(
        &app,
        "POST",
        "/api/reservations/",
        Some(&bob),
        Some(json!({ "book_id": book_id })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_return_restores_stock_and_is_terminal() {
    let (app, _temp_db) = setup_test_app();
    let admin = setup_admin(&app).await;
    let book_id = setup_book(&app, &admin, "Emma", 1).await;
    let alice = register_student(&app, "alice").await;

    let response = send(
        &app,
        "POST",
        "/api/issues/",
        Some(&alice),
        Some(json!({ "book_id": book_id })),
    )
    .await;
    let issue_id = response_json(response.into_body()).await["id"].as_u64().unwrap();

    send(
        &app,
        "POST",
        &format!("/api/issues/{issue_id}/approve/"),
        Some(&admin),
        None,
    )
    .await;

    let response = send(
        &app,
        "POST",
        &format!("/api/issues/{issue_id}/return_book/"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let issue = response_json(response.into_body()).await;
    assert_eq!(issue["status"], "RETURNED");
    assert!(!issue["return_date"].is_null());

    // Returning twice must not inflate stock
    let response = send(
        &app,
        "POST",
        &format!("/api/issues/{issue_id}/return_book/"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, "GET", &format!("/api/books/{book_id}/"), Some(&admin), None).await;
    let book = response_json(response.into_body()).await;
    assert_eq!(book["available_count"], 1);
}

/// Finds a setting id by key through the admin settings listing.
async fn setting_id(app: &axum::Router, admin: &Session, key: &str) -> u64 {
    let response = send(app, "GET", "/api/settings/", Some(admin), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let settings = response_json(response.into_body()).await;
    settings
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["key"] == key)
        .expect("setting missing")["id"]
        .as_u64()
        .unwrap()
}

#[tokio::test]
async fn test_overdue_return_creates_fine_and_payment_settles_it() {
    let (app, _temp_db) = setup_test_app();
    let admin = setup_admin(&app).await;
    let book_id = setup_book(&app, &admin, "Dune", 1).await;
    let alice = register_student(&app, "alice").await;

    // A negative return period makes the issue overdue the moment it is
    // approved, so the return accrues a one-day fine.
    let id = setting_id(&app, &admin, "return_period_days").await;
    let response = send(
        &app,
        "PATCH",
        &format!("/api/settings/{id}/"),
        Some(&admin),
        Some(json!({ "value": "-1" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        "POST",
        "/api/issues/",
        Some(&alice),
        Some(json!({ "book_id": book_id })),
    )
    .await;
    let issue_id = response_json(response.into_body()).await["id"].as_u64().unwrap();
    send(
        &app,
        "POST",
        &format!("/api/issues/{issue_id}/approve/"),
        Some(&admin),
        None,
    )
    .await;
    send(
        &app,
        "POST",
        &format!("/api/issues/{issue_id}/return_book/"),
        Some(&admin),
        None,
    )
    .await;

    let response = send(&app, "GET", "/api/fines/", Some(&alice), None).await;
    let fines = response_json(response.into_body()).await;
    assert_eq!(fines.as_array().unwrap().len(), 1);
    assert_eq!(fines[0]["amount"], "2.00");
    assert_eq!(fines[0]["status"], "UNPAID");
    let fine_id = fines[0]["id"].as_u64().unwrap();

    // A bad card never reaches the ledger
    let response = send(
        &app,
        "POST",
        "/api/fine_payments/",
        Some(&alice),
        Some(json!({
            "fine_id": fine_id,
            "card_number": "1234",
            "cvv": "123",
            "expiry": "12/30"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        "/api/fine_payments/",
        Some(&alice),
        Some(json!({
            "fine_id": fine_id,
            "card_number": "4111 1111 1111 1111",
            "cvv": "123",
            "expiry": "12/30"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let payment = response_json(response.into_body()).await;
    assert_eq!(payment["status"], "PAID");
    assert!(payment["reference"].as_str().unwrap().starts_with("SIM-"));

    // Paying again is a conflict, and the fine now reads PAID
    let response = send(
        &app,
        "POST",
        "/api/fine_payments/",
        Some(&alice),
        Some(json!({
            "fine_id": fine_id,
            "card_number": "4111 1111 1111 1111",
            "cvv": "123",
            "expiry": "12/30"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(&app, "GET", "/api/fines/", Some(&alice), None).await;
    let fines = response_json(response.into_body()).await;
    assert_eq!(fines[0]["status"], "PAID");
}

#[tokio::test]
async fn test_extension_moves_due_date() {
    let (app, _temp_db) = setup_test_app();
    let admin = setup_admin(&app).await;
    let book_id = setup_book(&app, &admin, "Dune", 1).await;
    let alice = register_student(&app, "alice").await;

    let response = send(
        &app,
        "POST",
        "/api/issues/",
        Some(&alice),
        Some(json!({ "book_id": book_id })),
    )
    .await;
    let issue_id = response_json(response.into_body()).await["id"].as_u64().unwrap();

    // Extensions only apply to issued books
    let response = send(
        &app,
        "POST",
        "/api/return_extensions/",
        Some(&alice),
        Some(json!({ "issue_id": issue_id, "days_requested": 7, "reason": "exams" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        &format!("/api/issues/{issue_id}/approve/"),
        Some(&admin),
        None,
    )
    .await;
    let old_due = response_json(response.into_body()).await["due_date"]
        .as_str()
        .unwrap()
        .to_string();

    // Out-of-range day counts are rejected outright
    let response = send(
        &app,
        "POST",
        "/api/return_extensions/",
        Some(&alice),
        Some(json!({ "issue_id": issue_id, "days_requested": 15, "reason": "" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        "/api/return_extensions/",
        Some(&alice),
        Some(json!({ "issue_id": issue_id, "days_requested": 7, "reason": "exams" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let extension = response_json(response.into_body()).await;
    let extension_id = extension["id"].as_u64().unwrap();
    assert_eq!(extension["status"], "PENDING");

    // Only one pending request per issue
    let response = send(
        &app,
        "POST",
        "/api/return_extensions/",
        Some(&alice),
        Some(json!({ "issue_id": issue_id, "days_requested": 3, "reason": "" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(
        &app,
        "POST",
        &format!("/api/return_extensions/{extension_id}/approve/"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, "GET", "/api/issues/", Some(&alice), None).await;
    let issues = response_json(response.into_body()).await;
    let new_due = issues[0]["due_date"].as_str().unwrap();
    assert!(new_due > old_due.as_str(), "due date did not move: {new_due} <= {old_due}");
}

#[tokio::test]
async fn test_suggestion_lifecycle_and_terminal_states() {
    let (app, _temp_db) = setup_test_app();
    let admin = setup_admin(&app).await;
    let alice = register_student(&app, "alice").await;

    let response = send(
        &app,
        "POST",
        "/api/suggestions/",
        Some(&alice),
        Some(json!({
            "title": "Snow Crash",
            "author": "Neal Stephenson",
            "category": "SF",
            "reason": "missing from the catalog"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let suggestion = response_json(response.into_body()).await;
    let id = suggestion["id"].as_u64().unwrap();
    assert_eq!(suggestion["status"], "PENDING");

    // Students cannot moderate
    let response = send(
        &app,
        "PATCH",
        &format!("/api/suggestions/{id}/"),
        Some(&alice),
        Some(json!({ "status": "APPROVED" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &app,
        "PATCH",
        &format!("/api/suggestions/{id}/"),
        Some(&admin),
        Some(json!({ "status": "APPROVED", "admin_note": "ordering" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        "PATCH",
        &format!("/api/suggestions/{id}/"),
        Some(&admin),
        Some(json!({ "status": "ADDED" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // ADDED is terminal
    let response = send(
        &app,
        "PATCH",
        &format!("/api/suggestions/{id}/"),
        Some(&admin),
        Some(json!({ "status": "REJECTED" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_review_moderation_visibility() {
    let (app, _temp_db) = setup_test_app();
    let admin = setup_admin(&app).await;
    let book_id = setup_book(&app, &admin, "Dune", 1).await;
    let alice = register_student(&app, "alice").await;
    let bob = register_student(&app, "bob").await;

    let response = send(
        &app,
        "POST",
        "/api/reviews/",
        Some(&alice),
        Some(json!({ "book_id": book_id, "rating": 6, "text": "" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        "/api/reviews/",
        Some(&alice),
        Some(json!({ "book_id": book_id, "rating": 5, "text": "a classic" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let review_id = response_json(response.into_body()).await["id"].as_u64().unwrap();

    // One review per user and book
    let response = send(
        &app,
        "POST",
        "/api/reviews/",
        Some(&alice),
        Some(json!({ "book_id": book_id, "rating": 4, "text": "again" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Pending reviews are invisible to other students but not the author
    let response = send(&app, "GET", "/api/reviews/", Some(&bob), None).await;
    assert_eq!(response_json(response.into_body()).await.as_array().unwrap().len(), 0);
    let response = send(&app, "GET", "/api/reviews/", Some(&alice), None).await;
    assert_eq!(response_json(response.into_body()).await.as_array().unwrap().len(), 1);

    let response = send(
        &app,
        "PATCH",
        &format!("/api/reviews/{review_id}/"),
        Some(&admin),
        Some(json!({ "status": "APPROVED" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, "GET", "/api/reviews/", Some(&bob), None).await;
    assert_eq!(response_json(response.into_body()).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_notifications_flow_and_mark_all_read_idempotence() {
    let (app, _temp_db) = setup_test_app();
    let admin = setup_admin(&app).await;
    let book_id = setup_book(&app, &admin, "Dune", 1).await;
    let alice = register_student(&app, "alice").await;

    let response = send(
        &app,
        "POST",
        "/api/issues/",
        Some(&alice),
        Some(json!({ "book_id": book_id })),
    )
    .await;
    let issue_id = response_json(response.into_body()).await["id"].as_u64().unwrap();
    send(
        &app,
        "POST",
        &format!("/api/issues/{issue_id}/approve/"),
        Some(&admin),
        None,
    )
    .await;

    let response = send(&app, "GET", "/api/notifications/unread_count/", Some(&alice), None).await;
    assert_eq!(response_json(response.into_body()).await["unread_count"], 1);

    let response = send(&app, "GET", "/api/notifications/", Some(&alice), None).await;
    let notifications = response_json(response.into_body()).await;
    assert!(notifications[0]["message"]
        .as_str()
        .unwrap()
        .contains("approved"));
    assert_eq!(notifications[0]["is_read"], false);

    let response = send(
        &app,
        "POST",
        "/api/notifications/mark_all_read/",
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response_json(response.into_body()).await["status"],
        "marked all as read"
    );

    // Second call is a no-op with the same shape
    let response = send(
        &app,
        "POST",
        "/api/notifications/mark_all_read/",
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, "GET", "/api/notifications/unread_count/", Some(&alice), None).await;
    assert_eq!(response_json(response.into_body()).await["unread_count"], 0);
}

#[tokio::test]
async fn test_reports_download_as_attachments() {
    let (app, _temp_db) = setup_test_app();
    let admin = setup_admin(&app).await;
    let book_id = setup_book(&app, &admin, "Dune", 1).await;
    let alice = register_student(&app, "alice").await;

    let response = send(
        &app,
        "POST",
        "/api/issues/",
        Some(&alice),
        Some(json!({ "book_id": book_id })),
    )
    .await;
    let issue_id = response_json(response.into_body()).await["id"].as_u64().unwrap();
    send(
        &app,
        "POST",
        &format!("/api/issues/{issue_id}/approve/"),
        Some(&admin),
        None,
    )
    .await;

    // Students cannot export
    let response = send(&app, "GET", "/api/reports/issued/csv/", Some(&alice), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app, "GET", "/api/reports/issued/csv/", Some(&admin), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"issued_books.csv\""
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(csv.starts_with("Book,User,Issue Date,Due Date\n"));
    assert!(csv.contains("Dune,alice,"));

    let response = send(&app, "GET", "/api/reports/issued/pdf/", Some(&admin), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert!(bytes.starts_with(b"%PDF-1.4"));
}

#[tokio::test]
async fn test_dashboard_stats_scoped_by_role() {
    let (app, _temp_db) = setup_test_app();
    let admin = setup_admin(&app).await;
    let book_id = setup_book(&app, &admin, "Dune", 1).await;
    let alice = register_student(&app, "alice").await;

    let response = send(
        &app,
        "POST",
        "/api/issues/",
        Some(&alice),
        Some(json!({ "book_id": book_id })),
    )
    .await;
    let issue_id = response_json(response.into_body()).await["id"].as_u64().unwrap();
    let response = send(
        &app,
        "POST",
        &format!("/api/issues/{issue_id}/approve/"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Admins get the global aggregates
    let response = send(&app, "GET", "/api/analytics/dashboard/stats/", Some(&admin), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["total_titles"], 1);
    assert_eq!(body["total_students"], 1);
    assert_eq!(body["active_issues"], 1);

    // Students see only their own counters; the global aggregates are
    // absent from the payload entirely
    let response = send(&app, "GET", "/api/analytics/dashboard/stats/", Some(&alice), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["issued_books"], 1);
    assert_eq!(body["pending_requests"], 0);
    assert_eq!(body["overdue_count"], 0);
    assert_eq!(body["current_issues"][0]["book_title"], "Dune");
    assert!(body.get("total_students").is_none());
    assert!(body.get("unpaid_fines_total").is_none());
    assert!(body.get("unpaid_fines_count").is_none());
}
