pub mod health;
pub mod risk;
pub mod root;

use axum::Router;

use crate::state::AppState;

/// Every route the scoring service exposes.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(root::router())
        .merge(health::router())
        .merge(risk::router())
}
