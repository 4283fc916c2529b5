//! 도전 핸드셰이크 핸들러

use super::deliver;
use crate::engine::SessionId;
use crate::state::AppState;
use std::sync::Arc;

/// 도전 처리
pub async fn handle_challenge(state: Arc<AppState>, session_id: SessionId, target_name: &str) {
    let result = state.engine.write().await.challenge(session_id, target_name);
    deliver(&state, session_id, result);
}

/// 도전 수락 처리 (방 생성)
pub async fn handle_accept(state: Arc<AppState>, session_id: SessionId, challenger_name: &str) {
    let result = state.engine.write().await.accept(session_id, challenger_name);
    deliver(&state, session_id, result);
}

/// 도전 거절 처리
pub async fn handle_decline(state: Arc<AppState>, session_id: SessionId, challenger_name: &str) {
    let result = state.engine.write().await.decline(session_id, challenger_name);
    deliver(&state, session_id, result);
}
