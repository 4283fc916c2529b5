//! 방 관리 핸들러

use super::deliver;
use crate::engine::SessionId;
use crate::protocol::{NoteStructure, ServerMessage};
use crate::state::AppState;
use std::sync::Arc;
use std::time::Instant;

/// 진행 중인 방 목록
pub async fn handle_get_all_rooms(state: Arc<AppState>, session_id: SessionId) {
    let game_rooms = state.engine.read().await.room_ids();
    state.send_to(session_id, ServerMessage::GetAllRooms { game_rooms });
}

/// 방 참가자 이름 목록. 방 ID가 null이면 null로 응답한다.
pub async fn handle_get_room_all_clients(
    state: Arc<AppState>,
    session_id: SessionId,
    room_id: Option<&str>,
) {
    let clients = match room_id {
        Some(room_id) => Some(state.engine.read().await.room_clients(room_id)),
        None => None,
    };
    state.send_to(session_id, ServerMessage::GetRoomAllClients(clients));
}

/// 노트 중계
pub async fn handle_note(state: Arc<AppState>, session_id: SessionId, note: NoteStructure) {
    let room_id = note.room_uuid.clone();
    let result = state.engine.write().await.relay_note(session_id, note);

    if result.is_ok() {
        tracing::debug!(from = %session_id, room_id = %room_id, "Relayed note");
    }
    deliver(&state, session_id, result);
}

/// 타이머 만료 알림 중계
pub async fn handle_timeout(state: Arc<AppState>, session_id: SessionId, room_id: &str) {
    let result = state.engine.write().await.timeout(session_id, room_id);
    deliver(&state, session_id, result);
}

/// 점수 보고 (응답 없음, 실패만 보고)
pub async fn handle_score(state: Arc<AppState>, session_id: SessionId, delta: i64) {
    let result = state.engine.write().await.add_score(session_id, delta);

    match result {
        Ok(total) => {
            tracing::debug!(session_id = %session_id, delta = delta, total = total, "Score added");
        }
        Err(error) => state.report(session_id, &error),
    }
}

/// 게임 종료 처리
pub async fn handle_game_end(state: Arc<AppState>, session_id: SessionId, room_id: &str) {
    let result = state.engine.write().await.end_game(session_id, room_id);

    if result.is_ok() {
        tracing::info!(session_id = %session_id, room_id = %room_id, "Game end broadcast");
    }
    deliver(&state, session_id, result);
}

/// 유휴 방과 만료된 도전 정리
pub async fn cleanup_idle_rooms(state: Arc<AppState>) {
    let idle_timeout = state.config.room.idle_timeout();
    let envelopes = state.engine.write().await.sweep(idle_timeout, Instant::now());

    if !envelopes.is_empty() {
        tracing::info!(notified = envelopes.len(), "Cleanup completed");
    }
    state.dispatch(envelopes);
}
