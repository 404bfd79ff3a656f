//! In-process scenario tests for sf-daemon HTTP endpoints.
//!
//! These tests spin up the Axum router **without** binding a TCP socket.
//! Each test calls `routes::build_router` and drives it via
//! `tower::ServiceExt::oneshot`. The pool is lazily connected to an address
//! nobody listens on, so every request exercised here must be answered
//! before storage is touched.
//!
//! # Invariants under test
//!
//! 1. Health answers without a database.
//! 2. No identity → 401; authenticated non-staff on a staff route → 403.
//! 3. A malformed `x-user-id` is refused, not treated as anonymous.
//! 4. An unknown status is 400 for the staff listing and the status change.
//! 5. Bad cart and checkout input is 422 with `success: false`.
//! 6. A browser with no session has a zero cart count and gets no cookie.
//! 7. The login merge only folds the caller's own session into the caller's
//!    own account.
//! 8. Bodies and paths the extractors cannot parse still answer with the
//!    JSON error envelope.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sf_config::ShopConfig;
use sf_daemon::{routes, state};
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn make_router() -> axum::Router {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(200))
        .connect_lazy("postgres://sf:sf@127.0.0.1:1/sf")
        .expect("lazy pool");
    let st = Arc::new(state::AppState::new(pool, ShopConfig::default(), "test-hash".to_string()));
    routes::build_router(st)
}

async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

fn get(uri: &str, headers: &[(&str, &str)]) -> Request<axum::body::Body> {
    let mut b = Request::builder().method("GET").uri(uri);
    for (k, v) in headers {
        b = b.header(*k, *v);
    }
    b.body(axum::body::Body::empty()).unwrap()
}

fn post_form(uri: &str, headers: &[(&str, &str)], body: &str) -> Request<axum::body::Body> {
    let mut b = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded");
    for (k, v) in headers {
        b = b.header(*k, *v);
    }
    b.body(axum::body::Body::from(body.to_string())).unwrap()
}

const CUSTOMER: &[(&str, &str)] = &[("x-user-id", "41")];
const STAFF: &[(&str, &str)] = &[("x-user-id", "1"), ("x-user-staff", "true")];

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_ok_true() {
    let (status, body) = call(make_router(), get("/v1/health", &[])).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "sf-daemon");
    assert_eq!(json["config_hash"], "test-hash");
}

// ---------------------------------------------------------------------------
// Identity gates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn checkout_without_identity_is_401() {
    let (status, body) = call(make_router(), post_form("/checkout/", &[], "full_name=A")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let json = parse_json(body);
    assert_eq!(json["success"], false);
    assert_eq!(json["kind"], "unauthorized");
}

#[tokio::test]
async fn my_orders_without_identity_is_401() {
    let (status, _) = call(make_router(), get("/my-orders/", &[])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn order_detail_without_identity_is_401() {
    let (status, _) = call(make_router(), get("/order/5/", &[])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn staff_routes_refuse_customers_with_403() {
    let (status, body) = call(make_router(), get("/owner/orders/", CUSTOMER)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(parse_json(body)["kind"], "forbidden");

    let (status, _) = call(
        make_router(),
        post_form("/owner/order/5/status/", CUSTOMER, "status=DELIVERED"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        make_router(),
        post_form("/owner/product/5/delete", CUSTOMER, ""),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn staff_routes_refuse_anonymous_with_401() {
    let (status, _) = call(make_router(), get("/owner/orders/", &[])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_user_header_is_401() {
    let (status, _) = call(make_router(), get("/my-orders/", &[("x-user-id", "abc")])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn staff_flag_without_user_is_anonymous() {
    let (status, _) = call(make_router(), get("/owner/orders/", &[("x-user-staff", "true")])).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Status validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn staff_listing_with_unknown_status_is_400() {
    let (status, body) = call(make_router(), get("/owner/orders/?status=SHIPPED", STAFF)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse_json(body)["kind"], "invalid_status");
}

#[tokio::test]
async fn status_change_to_unknown_value_is_400() {
    let (status, body) = call(
        make_router(),
        post_form("/owner/order/5/status/", STAFF, "status=PACKED&note=x"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse_json(body)["kind"], "invalid_status");
}

#[tokio::test]
async fn status_change_without_status_is_400() {
    let (status, _) = call(make_router(), post_form("/owner/order/5/status/", STAFF, "")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tracking_with_bad_date_is_422() {
    let (status, body) = call(
        make_router(),
        post_form("/owner/order/5/tracking/", STAFF, "estimated_delivery=soon"),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(parse_json(body)["kind"], "validation");
}

// ---------------------------------------------------------------------------
// Cart and checkout input
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cart_add_with_zero_quantity_is_422() {
    let (status, body) = call(
        make_router(),
        post_form("/cart/add", &[], "product_id=3&quantity=0"),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let json = parse_json(body);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("quantity"));
}

#[tokio::test]
async fn cart_add_without_product_is_422() {
    let (status, body) = call(make_router(), post_form("/cart/add", &[], "quantity=2")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(parse_json(body)["error"].as_str().unwrap().contains("product_id"));
}

#[tokio::test]
async fn cart_update_with_non_numeric_quantity_is_422() {
    let (status, _) = call(
        make_router(),
        post_form("/cart/update", &[], "item_id=3&quantity=lots"),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn cart_count_without_session_is_zero_and_sets_no_cookie() {
    let resp = make_router()
        .oneshot(get("/cart/count", &[]))
        .await
        .expect("oneshot failed");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get("set-cookie").is_none());
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(parse_json(body)["cart_count"], 0);
}

#[tokio::test]
async fn checkout_with_missing_fields_is_422() {
    let (status, body) = call(
        make_router(),
        post_form("/checkout/", CUSTOMER, "full_name=Asha+Rao&email=asha%40example.in"),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(parse_json(body)["error"].as_str().unwrap().contains("phone"));
}

#[tokio::test]
async fn checkout_with_bad_email_is_422() {
    let form = "full_name=Asha&email=not-an-email&phone=9876543210&address_line1=1+Main+St\
                &city=Pune&state=MH&postal_code=411001";
    let (status, body) = call(make_router(), post_form("/checkout/", CUSTOMER, form)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(parse_json(body)["error"].as_str().unwrap().contains("email"));
}

fn post_json(uri: &str, headers: &[(&str, &str)], body: &str) -> Request<axum::body::Body> {
    let mut b = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    for (k, v) in headers {
        b = b.header(*k, *v);
    }
    b.body(axum::body::Body::from(body.to_string())).unwrap()
}

// ---------------------------------------------------------------------------
// POST /session/login
// ---------------------------------------------------------------------------

#[tokio::test]
async fn login_event_with_blank_session_is_422() {
    let (status, _) = call(
        make_router(),
        post_json(
            "/session/login",
            &[("x-user-id", "4"), ("cookie", "sf_session=abc")],
            r#"{"user_id": 4, "session_key": "  "}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn login_event_without_identity_is_401() {
    let (status, body) = call(
        make_router(),
        post_json(
            "/session/login",
            &[("cookie", "sf_session=abc")],
            r#"{"user_id": 777, "session_key": "abc"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(parse_json(body)["kind"], "unauthorized");
}

#[tokio::test]
async fn login_event_for_another_user_is_403() {
    let (status, body) = call(
        make_router(),
        post_json(
            "/session/login",
            &[("x-user-id", "4"), ("cookie", "sf_session=abc")],
            r#"{"user_id": 777, "session_key": "abc"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(parse_json(body)["kind"], "forbidden");
}

#[tokio::test]
async fn login_event_for_another_browser_session_is_403() {
    let (status, _) = call(
        make_router(),
        post_json(
            "/session/login",
            &[("x-user-id", "4"), ("cookie", "sf_session=mine")],
            r#"{"user_id": 4, "session_key": "theirs"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        make_router(),
        post_json("/session/login", &[("x-user-id", "4")], r#"{"user_id": 4, "session_key": "theirs"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Extractor rejections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cart_add_with_json_body_gets_error_envelope() {
    let (status, body) = call(
        make_router(),
        post_json("/cart/add", &[], r#"{"product_id": 3}"#),
    )
    .await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let json = parse_json(body);
    assert_eq!(json["success"], false);
    assert_eq!(json["kind"], "unsupported_media_type");
}

#[tokio::test]
async fn non_integer_order_id_gets_error_envelope() {
    let (status, body) = call(make_router(), get("/order/abc/", CUSTOMER)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json = parse_json(body);
    assert_eq!(json["success"], false);
    assert_eq!(json["kind"], "bad_request");
}

#[tokio::test]
async fn malformed_json_gets_error_envelope() {
    let (status, body) = call(
        make_router(),
        post_json("/owner/categories/", STAFF, r#"{"name": "#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json = parse_json(body);
    assert_eq!(json["success"], false);
    assert!(!json["error"].as_str().unwrap().is_empty());
}
