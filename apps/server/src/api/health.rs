use std::sync::Arc;

use advisory_core::analytics::{AnalyticsHealth, AnalyticsQueryTrait};
use axum::{extract::State, routing::get, Json, Router};

use crate::main_lib::AppState;

/// Refresh health of the analytics cache over the recent window.
async fn get_health_check(State(state): State<Arc<AppState>>) -> Json<AnalyticsHealth> {
    Json(state.analytics.get_health_check())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/analytics/health", get(get_health_check))
}
