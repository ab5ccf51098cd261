use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(root))
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "Welcome to Risk API!",
        "endpoint": {"/risk": "Оценка по координатам"},
        "model": state.model_version(),
    }))
}
