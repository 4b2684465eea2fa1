use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Utc};
use courier_dispatch::api::rest::router;
use courier_dispatch::config::Config;
use courier_dispatch::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

fn setup() -> axum::Router {
    router(Arc::new(AppState::new(&Config::default())))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn seed(app: &axum::Router) {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/couriers",
            json!({
                "data": [
                    { "courier_id": 1, "courier_type": "bike", "regions": [1, 12], "working_hours": ["09:00-18:00"] },
                    { "courier_id": 2, "courier_type": "foot", "regions": [1], "working_hours": ["09:00-18:00"] }
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({
                "data": [
                    { "order_id": 1, "weight": 10, "region": 1, "delivery_hours": ["10:00-12:00"] },
                    { "order_id": 2, "weight": 0.23, "region": 12, "delivery_hours": ["09:00-18:00"] },
                    { "order_id": 3, "weight": 1.5, "region": 1, "delivery_hours": ["20:00-22:00"] }
                ]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["couriers"], 0);
    assert_eq!(body["orders"], 0);
    assert_eq!(body["batches"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("dispatch_open_batches"));
}

#[tokio::test]
async fn register_couriers_returns_created_ids() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/couriers",
            json!({
                "data": [
                    { "courier_id": 1, "courier_type": "foot", "regions": [1, 12, 22], "working_hours": ["11:35-14:05", "09:00-11:00"] },
                    { "courier_id": 2, "courier_type": "bike", "regions": [22], "working_hours": ["09:00-18:00"] }
                ]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body, json!({ "couriers": [{ "id": 1 }, { "id": 2 }] }));
}

#[tokio::test]
async fn register_couriers_lists_invalid_ids() {
    let app = setup();
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/couriers",
            json!({
                "data": [
                    { "courier_id": 1, "courier_type": "foot", "regions": [1], "working_hours": ["09:00-11:00"] },
                    { "courier_id": 2, "courier_type": "plane", "regions": [1], "working_hours": ["09:00-11:00"] }
                ]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body, json!({ "validation_error": { "couriers": [{ "id": 2 }] } }));

    let response = app.oneshot(get_request("/couriers/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_fields_are_rejected() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/couriers",
            json!({
                "data": [
                    { "courier_id": 1, "courier_type": "foot", "regions": [1], "working_hours": [], "rating": 5 }
                ]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_registration_elements_are_listed_by_id() {
    let app = setup();
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/couriers",
            json!({
                "data": [
                    { "courier_id": 1, "courier_type": "foot", "regions": [1], "working_hours": ["09:00-11:00"] },
                    { "courier_id": 2, "courier_type": "foot", "regions": [1], "working_hours": ["09:00-11:00"], "extra": 1 },
                    { "courier_id": 3, "courier_type": "foot", "regions": [1] }
                ]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({ "validation_error": { "couriers": [{ "id": 2 }, { "id": 3 }] } })
    );

    let response = app
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({
                "data": [
                    { "order_id": 1, "weight": "heavy", "region": 1, "delivery_hours": ["10:00-12:00"] },
                    { "order_id": 2, "weight": 1.0, "region": 1, "delivery_hours": ["10:00-12:00"] }
                ]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body, json!({ "validation_error": { "orders": [{ "id": 1 }] } }));
}

#[tokio::test]
async fn non_numeric_path_id_returns_json_error() {
    let app = setup();
    let response = app.oneshot(get_request("/couriers/abc")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().starts_with("bad request"));
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn get_courier_returns_projection() {
    let app = setup();
    seed(&app).await;

    let response = app.oneshot(get_request("/couriers/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({
            "courier_id": 1,
            "courier_type": "bike",
            "regions": [1, 12],
            "working_hours": ["09:00-18:00"]
        })
    );
}

#[tokio::test]
async fn assign_and_complete_flow() {
    let app = setup();
    seed(&app).await;

    let res = app
        .clone()
        .oneshot(json_request("POST", "/orders/assign", json!({ "courier_id": 1 })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let assigned = body_json(res).await;
    assert_eq!(assigned["orders"], json!([{ "id": 1 }, { "id": 2 }]));
    let assign_time = assigned["assign_time"].as_str().unwrap().to_string();

    let res = app
        .clone()
        .oneshot(json_request("POST", "/orders/assign", json!({ "courier_id": 1 })))
        .await
        .unwrap();
    let again = body_json(res).await;
    assert_eq!(again["assign_time"], assign_time.as_str());
    assert_eq!(again["orders"], assigned["orders"]);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/orders/complete",
            json!({ "courier_id": 1, "order_id": 1, "complete_time": "2021-01-10T10:33:01.42Z" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await, json!({ "order_id": 1 }));

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/orders/complete",
            json!({ "courier_id": 1, "order_id": 1, "complete_time": "2021-01-10T11:00:00Z" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(res).await["retryable"], false);

    let res = app.oneshot(get_request("/orders/1")).await.unwrap();
    let order = body_json(res).await;
    assert_eq!(order["status"], "completed");
    assert_eq!(order["assigned_courier"], 1);
    let completed_at: DateTime<Utc> = order["completed_at"].as_str().unwrap().parse().unwrap();
    assert_eq!(completed_at, "2021-01-10T10:33:01.42Z".parse::<DateTime<Utc>>().unwrap());
}

#[tokio::test]
async fn assign_with_nothing_eligible_omits_assign_time() {
    let app = setup();
    seed(&app).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/couriers/2",
            json!({ "working_hours": ["19:00-19:30"] }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(json_request("POST", "/orders/assign", json!({ "courier_id": 2 })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await, json!({ "orders": [] }));
}

#[tokio::test]
async fn assign_for_unknown_courier_returns_404() {
    let app = setup();
    let res = app
        .oneshot(json_request("POST", "/orders/assign", json!({ "courier_id": 77 })))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn completing_someone_elses_order_is_forbidden() {
    let app = setup();
    seed(&app).await;

    app.clone()
        .oneshot(json_request("POST", "/orders/assign", json!({ "courier_id": 1 })))
        .await
        .unwrap();

    let res = app
        .oneshot(json_request(
            "POST",
            "/orders/complete",
            json!({ "courier_id": 2, "order_id": 1, "complete_time": "2021-01-10T10:33:01Z" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn patch_courier_revokes_and_returns_projection() {
    let app = setup();
    seed(&app).await;

    app.clone()
        .oneshot(json_request("POST", "/orders/assign", json!({ "courier_id": 1 })))
        .await
        .unwrap();

    let res = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/couriers/1",
            json!({ "regions": [1], "courier_type": "foot" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["courier_type"], "foot");
    assert_eq!(body["regions"], json!([1]));

    let res = app.clone().oneshot(get_request("/orders/2")).await.unwrap();
    let revoked = body_json(res).await;
    assert_eq!(revoked["status"], "pending");
    assert!(revoked["assigned_courier"].is_null());
    assert!(revoked["batch"].is_null());

    let res = app.oneshot(get_request("/orders/1")).await.unwrap();
    assert_eq!(body_json(res).await["status"], "assigned");
}

#[tokio::test]
async fn patch_courier_rejects_bad_values() {
    let app = setup();
    seed(&app).await;

    let res = app
        .clone()
        .oneshot(json_request("PATCH", "/couriers/1", json!({ "courier_type": "boat" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .clone()
        .oneshot(json_request("PATCH", "/couriers/1", json!({ "working_hours": ["18:00-09:00"] })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .clone()
        .oneshot(json_request("PATCH", "/couriers/1", json!({ "name": "Bob" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .oneshot(json_request("PATCH", "/couriers/99", json!({ "regions": [1] })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_nonexistent_order_returns_404() {
    let app = setup();
    let response = app.oneshot(get_request("/orders/12345")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
