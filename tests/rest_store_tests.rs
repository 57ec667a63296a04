/// REST store tests
///
/// Runs `RestStore` against a small PostgREST stand-in served by axum.
/// Run with: cargo test --test rest_store_tests
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
};
use pipeline_tracker::core::{FieldValue, NewOpportunity, OpportunityField, Phase, TrackerError};
use pipeline_tracker::store::{RemoteStore, RestStore};
use pipeline_tracker::{AppState, TrackerConfig, TrackerSession};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct Captured {
    method: &'static str,
    query: HashMap<String, String>,
    apikey: Option<String>,
    authorization: Option<String>,
    prefer: Option<String>,
    body: Option<Value>,
}

type Log = Arc<Mutex<Vec<Captured>>>;

const KNOWN_ID: &str = "opp-1";

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn capture(
    log: &Log,
    method: &'static str,
    headers: &HeaderMap,
    query: HashMap<String, String>,
    body: Option<Value>,
) {
    log.lock().unwrap().push(Captured {
        method,
        query,
        apikey: header(headers, "apikey"),
        authorization: header(headers, "authorization"),
        prefer: header(headers, "prefer"),
        body,
    });
}

fn row() -> Value {
    json!({
        "id": KNOWN_ID,
        "name": "Route optimisation",
        "phase": 3,
        "status": "in_progress",
        "estimated_som": 150000,
        "target_date": "2025-03-01",
        "demo_links": null,
        "attachments": null,
        "messaging_indicator": "green",
        "sort_order": 0,
        "company_id": "co-1",
        "companies": { "id": "co-1", "name": "Northwind", "slug": "northwind" }
    })
}

/// Rows matching an `id=eq.<id>` filter.
fn matching(query: &HashMap<String, String>) -> Value {
    let wanted = format!("eq.{}", KNOWN_ID);
    if query.get("id") == Some(&wanted) {
        json!([row()])
    } else {
        json!([])
    }
}

async fn list(State(log): State<Log>, headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    capture(&log, "GET", &headers, query, None);
    Json(json!([
        row(),
        { "id": "opp-2", "name": "Legacy row", "phase": 9, "status": null, "sort_order": 1 }
    ]))
}

async fn update(
    State(log): State<Log>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let rows = matching(&query);
    capture(&log, "PATCH", &headers, query, Some(body));
    Json(rows)
}

async fn remove(State(log): State<Log>, headers: HeaderMap, Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let rows = matching(&query);
    capture(&log, "DELETE", &headers, query, None);
    Json(rows)
}

async fn insert(State(log): State<Log>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    capture(&log, "POST", &headers, HashMap::new(), Some(body.clone()));
    Json(json!([body]))
}

async fn companies() -> Json<Value> {
    Json(json!([{ "id": "co-1", "name": "Northwind", "slug": "northwind" }]))
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "database unavailable")
}

async fn serve() -> (String, Log) {
    let log: Log = Arc::default();
    let app = Router::new()
        .route("/rest/v1/opportunities", get(list).patch(update).delete(remove).post(insert))
        .route("/rest/v1/companies", get(companies))
        .route("/rest/v1/broken", get(broken).patch(broken))
        .with_state(log.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), log)
}

fn store(base_url: &str) -> RestStore {
    RestStore::new(TrackerConfig::new(base_url, "anon-key").access_token("user-jwt")).unwrap()
}

fn last(log: &Log) -> Captured {
    log.lock().unwrap().last().cloned().unwrap()
}

#[tokio::test]
async fn test_list_all_joins_companies_and_sends_credentials() {
    let (url, log) = serve().await;

    let opportunities = store(&url).list_all().await.unwrap();

    assert_eq!(opportunities.len(), 2);
    assert_eq!(opportunities[0].company_name(), "Northwind");
    assert_eq!(opportunities[0].phase, Phase::MvpPilot);
    assert_eq!(opportunities[0].estimated_som, Some(150000.0));
    assert!(opportunities[0].demo_links.is_empty());
    // Out-of-range phase and null status are tolerated.
    assert_eq!(opportunities[1].phase, Phase::Identification);
    assert_eq!(opportunities[1].status, "");

    let request = last(&log);
    assert_eq!(request.method, "GET");
    assert_eq!(request.query.get("select").map(String::as_str), Some("*,companies:companies(*)"));
    assert_eq!(request.query.get("order").map(String::as_str), Some("sort_order.asc"));
    assert_eq!(request.apikey.as_deref(), Some("anon-key"));
    assert_eq!(request.authorization.as_deref(), Some("Bearer user-jwt"));
}

#[tokio::test]
async fn test_update_sends_one_key_filtered_by_id() {
    let (url, log) = serve().await;

    store(&url)
        .update_field(KNOWN_ID, OpportunityField::EstimatedSom, &FieldValue::Number(250000.0))
        .await
        .unwrap();

    let request = last(&log);
    assert_eq!(request.method, "PATCH");
    assert_eq!(request.query.get("id").map(String::as_str), Some("eq.opp-1"));
    assert_eq!(request.body, Some(json!({ "estimated_som": 250000.0 })));
    assert_eq!(request.prefer.as_deref(), Some("return=representation"));
}

#[tokio::test]
async fn test_update_matching_no_row_is_not_found() {
    let (url, _log) = serve().await;

    let err = store(&url)
        .update_field("ghost", OpportunityField::Name, &FieldValue::Text("x".into()))
        .await
        .unwrap_err();

    assert_eq!(err, TrackerError::NotFound("ghost".to_string()));
}

#[tokio::test]
async fn test_server_errors_map_to_remote_errors() {
    let (url, _log) = serve().await;
    let broken = RestStore::new(TrackerConfig::new(&url, "anon-key").opportunities_table("broken")).unwrap();

    let read = broken.list_all().await.unwrap_err();
    assert!(matches!(read, TrackerError::RemoteRead(ref message) if message.contains("500")));

    let write = broken
        .update_field(KNOWN_ID, OpportunityField::Name, &FieldValue::Text("x".into()))
        .await
        .unwrap_err();
    assert!(matches!(write, TrackerError::RemoteWrite(_)));
}

#[tokio::test]
async fn test_insert_and_confirmed_delete() {
    let (url, log) = serve().await;
    let mut session = TrackerSession::new(Arc::new(store(&url)), AppState::default());
    session.refetch().await.unwrap();

    let id = session
        .create_opportunity(NewOpportunity::named("Warehouse vision").phase(Phase::Poc))
        .await
        .unwrap();
    let insert = log
        .lock()
        .unwrap()
        .iter()
        .find(|request| request.method == "POST")
        .cloned()
        .unwrap();
    let body = insert.body.unwrap();
    assert_eq!(body["id"], json!(id));
    assert_eq!(body["phase"], json!(2));
    assert!(body.get("companies").is_none());

    let pending = session.request_delete(KNOWN_ID).unwrap();
    session.delete(pending.confirm()).await.unwrap();
    let delete = log
        .lock()
        .unwrap()
        .iter()
        .find(|request| request.method == "DELETE")
        .cloned()
        .unwrap();
    assert_eq!(delete.query.get("id").map(String::as_str), Some("eq.opp-1"));
}
