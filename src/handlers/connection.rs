//! 연결 핸들러

use crate::engine::SessionId;
use crate::error::EngineError;
use crate::protocol::ServerMessage;
use crate::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// 새 연결 처리
pub async fn handle_connection(
    state: Arc<AppState>,
    sender: UnboundedSender<ServerMessage>,
    remote: SocketAddr,
) -> Result<SessionId, EngineError> {
    let session_id = SessionId::new();

    state
        .engine
        .write()
        .await
        .connect(session_id, &remote.to_string())?;
    state.outboxes.insert(session_id, sender.clone());

    let _ = sender.send(ServerMessage::Connected {
        socket_id: session_id.to_string(),
    });

    tracing::info!(session_id = %session_id, remote = %remote, "New connection established");
    Ok(session_id)
}

/// 연결 해제 처리
///
/// 엔진에서 세션을 제거한 뒤 송신 큐를 닫고, 같은 방에 있던 상대에게 알린다.
pub async fn handle_disconnect(state: Arc<AppState>, session_id: SessionId, reason: &str) {
    let result = state.engine.write().await.disconnect(session_id);
    state.outboxes.remove(&session_id);

    match result {
        Ok(envelopes) => state.dispatch(envelopes),
        Err(error) => {
            tracing::debug!(session_id = %session_id, error = %error, "Disconnect for unknown session");
        }
    }
    tracing::info!(session_id = %session_id, reason = %reason, "Connection closed");
}
