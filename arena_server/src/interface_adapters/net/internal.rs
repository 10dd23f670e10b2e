use crate::interface_adapters::protocol::RoomSummaryDto;
use crate::interface_adapters::state::AppState;

use axum::{
    extract::{Json, State},
    response::IntoResponse,
};
use std::sync::Arc;

/// Operator listing of live rooms, sorted by room id.
pub async fn list_rooms_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rooms: Vec<RoomSummaryDto> = state
        .gateway
        .rooms()
        .await
        .into_iter()
        .map(RoomSummaryDto::from)
        .collect();
    Json(rooms)
}
