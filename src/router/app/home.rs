use axum::Json;
use serde_json::{json, Value};

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to Vakeel API", "status": "online" }))
}

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "API is running" }))
}
