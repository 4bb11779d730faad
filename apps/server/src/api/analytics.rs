use std::sync::Arc;

use advisory_core::analytics::{AnalyticsQueryTrait, AnalyticsResponse, RefreshSummary};
use advisory_core::events::DomainEvent;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{error::ApiResult, main_lib::AppState};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyticsQuery {
    as_of: Option<NaiveDate>,
}

async fn get_analytics(
    State(state): State<Arc<AppState>>,
    Path((report, scope)): Path<(String, String)>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<Json<AnalyticsResponse>> {
    let response = state
        .analytics
        .get_analytics(&report, &scope, query.as_of)
        .await?;
    Ok(Json(response))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Notification {
    One(DomainEvent),
    Many(Vec<DomainEvent>),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NotifyAccepted {
    accepted: usize,
}

/// Queues change notifications; affected entries go stale once the
/// debounced batch is applied.
async fn notify_changes(
    State(state): State<Arc<AppState>>,
    Json(notification): Json<Notification>,
) -> (StatusCode, Json<NotifyAccepted>) {
    let events = match notification {
        Notification::One(event) => vec![event],
        Notification::Many(events) => events,
    };
    let accepted = events.len();
    state.domain_event_sink.emit_batch(events);
    (StatusCode::ACCEPTED, Json(NotifyAccepted { accepted }))
}

async fn refresh_stale(State(state): State<Arc<AppState>>) -> Json<RefreshSummary> {
    Json(state.analytics.refresh_stale().await)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analytics/notify", post(notify_changes))
        .route("/analytics/refresh", post(refresh_stale))
        .route("/analytics/{report}/{scope}", get(get_analytics))
}
