//! 이름 등록/조회 핸들러

use crate::engine::SessionId;
use crate::protocol::ServerMessage;
use crate::state::AppState;
use std::sync::Arc;

/// 이름 사용 가능 여부 조회
pub async fn handle_name_is_available(state: Arc<AppState>, session_id: SessionId, name: &str) {
    let available = state.engine.read().await.is_name_available(session_id, name);
    state.send_to(session_id, ServerMessage::NameIsAvailable(available));
}

/// 이름 등록
pub async fn handle_name_subscribe(state: Arc<AppState>, session_id: SessionId, name: &str) {
    let result = state.engine.write().await.claim_name(session_id, name);

    let subscribed = match result {
        Ok(previous) => {
            tracing::info!(
                session_id = %session_id,
                name = %name,
                previous = ?previous,
                "Name claimed"
            );
            true
        }
        Err(error) => {
            tracing::warn!(session_id = %session_id, name = %name, error = %error, "Name claim rejected");
            false
        }
    };
    state.send_to(session_id, ServerMessage::NameSubscribe(subscribed));
}

/// 접속 중인 플레이어 이름 목록
pub async fn handle_get_all_players(state: Arc<AppState>, session_id: SessionId) {
    let clients = state.engine.read().await.player_names();
    state.send_to(session_id, ServerMessage::GetAllPlayers { clients });
}
