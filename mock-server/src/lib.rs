use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

/// Records of one collection, keyed by numeric id.
#[derive(Default, Debug)]
pub struct Collection {
    next_id: u64,
    records: HashMap<u64, Map<String, Value>>,
}

pub type Db = Arc<RwLock<HashMap<String, Collection>>>;

#[derive(Clone)]
pub struct AppState {
    db: Db,
    token: Option<Arc<str>>,
}

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

/// Build the router. When `token` is set, every request must carry
/// `Authorization: Bearer <token>`.
pub fn app(token: Option<String>) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(HashMap::new())),
        token: token.map(Arc::from),
    };
    Router::new()
        .route("/api/v1/broken", get(broken))
        .route("/api/v1/teapot", get(teapot))
        .route("/api/v1/{collection}", post(create_record))
        .route(
            "/api/v1/{collection}/{id}",
            get(get_record).put(update_record),
        )
        .with_state(state)
}

pub async fn run(listener: TcpListener, token: Option<String>) -> Result<(), std::io::Error> {
    axum::serve(listener, app(token)).await
}

fn success(id: u64, record: &Map<String, Value>) -> Json<Value> {
    let mut body = record.clone();
    body.insert("id".to_string(), json!(id));
    body.insert("meta".to_string(), json!({"status": "success"}));
    Json(Value::Object(body))
}

fn failure(message: &str) -> Json<Value> {
    Json(json!({"meta": {"status": "error", "message": message}}))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    let Some(expected) = state.token.as_deref() else {
        return Ok(());
    };
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if presented == Some(expected) {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, failure("invalid access token")))
    }
}

/// Pull the `data` object out of a write envelope.
fn envelope_data(envelope: &Value) -> Result<Map<String, Value>, (StatusCode, Json<Value>)> {
    match envelope.get("data") {
        Some(Value::Object(data)) => Ok(data.clone()),
        None => Ok(Map::new()),
        Some(_) => Err((StatusCode::BAD_REQUEST, failure("data must be an object"))),
    }
}

/// Application-level validation, reported inside a 200 envelope.
fn validation_error(data: &Map<String, Value>) -> Option<&'static str> {
    match data.get("name") {
        Some(Value::String(name)) if name.trim().is_empty() => Some("name can't be blank"),
        _ => None,
    }
}

async fn create_record(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    headers: HeaderMap,
    Json(envelope): Json<Value>,
) -> ApiResult {
    authorize(&state, &headers)?;
    let data = envelope_data(&envelope)?;
    if let Some(message) = validation_error(&data) {
        return Ok(failure(message));
    }

    let mut db = state.db.write().await;
    let collection = db.entry(collection).or_default();
    collection.next_id += 1;
    let id = collection.next_id;
    let response = success(id, &data);
    collection.records.insert(id, data);
    Ok(response)
}

async fn get_record(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, u64)>,
    headers: HeaderMap,
) -> ApiResult {
    authorize(&state, &headers)?;
    let db = state.db.read().await;
    db.get(&collection)
        .and_then(|c| c.records.get(&id))
        .map(|record| success(id, record))
        .ok_or((StatusCode::NOT_FOUND, failure("record not found")))
}

async fn update_record(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, u64)>,
    headers: HeaderMap,
    Json(envelope): Json<Value>,
) -> ApiResult {
    authorize(&state, &headers)?;
    let data = envelope_data(&envelope)?;

    let mut db = state.db.write().await;
    let record = db
        .get_mut(&collection)
        .and_then(|c| c.records.get_mut(&id))
        .ok_or((StatusCode::NOT_FOUND, failure("record not found")))?;
    if let Some(message) = validation_error(&data) {
        return Ok(failure(message));
    }
    record.extend(data);
    Ok(success(id, record))
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::OK, "<html>upstream proxy error</html>")
}

async fn teapot() -> (StatusCode, Json<Value>) {
    (StatusCode::IM_A_TEAPOT, failure("short and stout"))
}
