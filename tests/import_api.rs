// tests/import_api.rs

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use commerce_import::{
    config::{AppState, ImportSettings},
    db::InMemoryStore,
    routes::build_router,
};

fn app() -> (Router, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let state = AppState::with_store(store.clone(), ImportSettings::default());
    (build_router(state), store)
}

fn json_request(method: &str, uri: &str, tenant: Option<Uuid>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(tenant) = tenant {
        builder = builder.header("x-tenant-id", tenant.to_string());
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, tenant: Uuid) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-tenant-id", tenant.to_string())
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn import_payload() -> Value {
    json!({
        "fileName": "orders_export.csv",
        "targetSchema": "ORDERS",
        "content": "Email,Name,Order,Total\nalice@x.com,Alice,A100,10\nalice@x.com,Alice,A100,5\nbob@y.com,Bob,B200,20\n",
        "mappings": [
            { "sourceColumn": "Email", "target": { "mode": "standard", "field": "email" } },
            { "sourceColumn": "Name", "target": { "mode": "standard", "field": "full_name" } },
            { "sourceColumn": "Order", "target": { "mode": "standard", "field": "order_number" } },
            { "sourceColumn": "Total", "target": { "mode": "standard", "field": "line_item_price" } }
        ]
    })
}

#[tokio::test]
async fn health_is_public() {
    let (app, _) = app();
    let response = app
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn requests_without_tenant_header_are_rejected() {
    let (app, _) = app();
    let response = app
        .oneshot(json_request("POST", "/api/imports", None, import_payload()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("X-Tenant-ID"));
}

#[tokio::test]
async fn preview_suggests_a_mapping() {
    let (app, _) = app();
    let payload = json!({
        "targetSchema": "orders",
        "content": "E-mail,Order,Lineitem quantity,Gift Wrap\nana@x.com,A1,2,yes\n"
    });

    let response = app
        .oneshot(json_request("POST", "/api/imports/preview", Some(Uuid::new_v4()), payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["totalRows"], 1);
    assert_eq!(body["headers"].as_array().unwrap().len(), 4);

    let suggested = body["suggestedMappings"].as_array().unwrap();
    assert_eq!(suggested[0]["target"], json!({ "mode": "standard", "field": "email" }));
    assert_eq!(suggested[1]["target"]["field"], "order_number");
    assert_eq!(suggested[2]["target"]["field"], "line_item_quantity");
    assert_eq!(suggested[3]["target"]["mode"], "extension");
    assert_eq!(suggested[3]["target"]["fieldType"], "BOOLEAN");
}

#[tokio::test]
async fn unknown_schema_is_a_bad_request() {
    let (app, _) = app();
    let response = app
        .oneshot(get("/api/imports/schemas/products/fields", Uuid::new_v4()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn customer_schema_marks_email_as_required() {
    let (app, _) = app();
    let response = app
        .oneshot(get("/api/imports/schemas/customers/fields", Uuid::new_v4()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let fields = body_json(response).await;
    let email = fields
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["key"] == "email")
        .unwrap();
    assert_eq!(email["required"], true);
}

#[tokio::test]
async fn start_import_returns_the_finished_run() {
    let (app, store) = app();
    let tenant = Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/imports", Some(tenant), import_payload()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let run = body_json(response).await;
    assert_eq!(run["status"], "completed");
    assert_eq!(run["totalRows"], 3);
    assert_eq!(run["importedRows"], 3);
    assert_eq!(store.orders(tenant).await.len(), 2);

    let id = run["id"].as_str().unwrap();
    let response = app
        .clone()
        .oneshot(get(&format!("/api/imports/{id}"), tenant))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/api/imports", tenant)).await.unwrap();
    let runs = body_json(response).await;
    assert_eq!(runs.as_array().unwrap().len(), 1);

    let response = app.oneshot(get("/api/activity?limit=5", tenant)).await.unwrap();
    let activity = body_json(response).await;
    assert_eq!(activity[0]["kind"], "import.completed");
}

#[tokio::test]
async fn runs_are_invisible_to_other_tenants() {
    let (app, _) = app();
    let tenant = Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/imports", Some(tenant), import_payload()))
        .await
        .unwrap();
    let run = body_json(response).await;
    let id = run["id"].as_str().unwrap();

    let response = app
        .oneshot(get(&format!("/api/imports/{id}"), Uuid::new_v4()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_required_field_is_listed_in_the_response() {
    let (app, _) = app();
    let payload = json!({
        "fileName": "clientes.csv",
        "targetSchema": "CUSTOMERS",
        "content": "Name\nAna\n",
        "mappings": [
            { "sourceColumn": "Name", "target": { "mode": "standard", "field": "full_name" } }
        ]
    });

    let response = app
        .oneshot(json_request("POST", "/api/imports", Some(Uuid::new_v4()), payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["fields"], json!(["email"]));
}

#[tokio::test]
async fn invalid_payload_reports_field_details() {
    let (app, _) = app();
    let mut payload = import_payload();
    payload["fileName"] = json!("");

    let response = app
        .oneshot(json_request("POST", "/api/imports", Some(Uuid::new_v4()), payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["details"]["file_name"].is_array());
}

#[tokio::test]
async fn stream_ends_with_a_completed_event() {
    let (app, _) = app();

    let response = app
        .oneshot(json_request("POST", "/api/imports/stream", Some(Uuid::new_v4()), import_payload()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    // O stream fecha quando a tarefa termina e solta o último sender
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("event: progress"));
    assert!(text.contains("event: completed"));
    assert!(text.find("event: progress").unwrap() < text.find("event: completed").unwrap());
}
