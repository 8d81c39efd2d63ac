//! Read-only HTTP diagnostics
//!
//! - `GET /health`: liveness with the active room count
//! - `GET /rooms`: room ids and participant counts
//!
//! Participant ids are never exposed.

use std::io;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;

use crate::constants::MSG_HEALTH;
use crate::rooms::RoomRegistry;

/// Body of `GET /health`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub active_rooms: usize,
    /// RFC 3339 time the response was produced
    pub timestamp: String,
}

/// One entry of `GET /rooms`
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomEntry {
    pub room_id: String,
    pub participant_count: usize,
}

/// Body of `GET /rooms`
#[derive(Debug, Serialize)]
pub struct RoomsResponse {
    pub rooms: Vec<RoomEntry>,
}

async fn health(State(rooms): State<RoomRegistry>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: MSG_HEALTH,
        active_rooms: rooms.count().await,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn list_rooms(State(rooms): State<RoomRegistry>) -> Json<RoomsResponse> {
    let rooms = rooms
        .list()
        .await
        .into_iter()
        .map(|info| RoomEntry {
            room_id: info.room_id,
            participant_count: info.participant_count,
        })
        .collect();
    Json(RoomsResponse { rooms })
}

/// Build the diagnostics router
pub fn router(rooms: RoomRegistry) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/rooms", get(list_rooms))
        .with_state(rooms)
}

/// Serve diagnostics on an already-bound listener until the task is dropped
pub async fn serve(listener: TcpListener, rooms: RoomRegistry) -> io::Result<()> {
    axum::serve(listener, router(rooms)).await
}
