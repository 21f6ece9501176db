use std::sync::Arc;

use axum::Json;
use axum::extract::State;

use domain::QueueSummary;

use super::state::AppState;

pub async fn get_queues(State(state): State<Arc<AppState>>) -> Json<Vec<QueueSummary>> {
    Json(state.service.queue_summaries().await)
}
