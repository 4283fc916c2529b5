//! 애플리케이션 상태 관리

use crate::config::Config;
use crate::engine::{Engine, Envelope, SessionId};
use crate::error::EngineError;
use crate::protocol::ServerMessage;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{mpsc::UnboundedSender, RwLock};

/// 전역 애플리케이션 상태
pub struct AppState {
    /// 세션/이름/방 상태. 모든 변경은 쓰기 락 하나로 직렬화된다.
    pub engine: RwLock<Engine>,
    /// 세션별 송신 큐 (session_id -> sender)
    pub outboxes: DashMap<SessionId, UnboundedSender<ServerMessage>>,
    /// 설정
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            engine: RwLock::new(Engine::new(&config)),
            outboxes: DashMap::new(),
            config: Arc::new(config),
        }
    }

    /// 특정 세션에게 메시지 전송. 이미 끊긴 세션이면 버린다.
    pub fn send_to(&self, session_id: SessionId, message: ServerMessage) {
        match self.outboxes.get(&session_id) {
            Some(outbox) => {
                if outbox.send(message).is_err() {
                    tracing::debug!(session_id = %session_id, "Outbox closed, message dropped");
                }
            }
            None => {
                tracing::debug!(session_id = %session_id, "Recipient gone, message dropped");
            }
        }
    }

    /// 엔진이 만든 메시지 전달. 엔진 락을 놓은 뒤에 호출해야 한다.
    pub fn dispatch(&self, envelopes: Vec<Envelope>) {
        for envelope in envelopes {
            self.send_to(envelope.to, envelope.message);
        }
    }

    /// 실패를 요청한 세션에게 보고
    pub fn report(&self, session_id: SessionId, error: &EngineError) {
        tracing::warn!(session_id = %session_id, code = error.code(), error = %error, "Request rejected");
        self.send_to(
            session_id,
            ServerMessage::Error {
                code: error.code().to_string(),
                message: error.to_string(),
            },
        );
    }
}
