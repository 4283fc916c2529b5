//! 핸들러 모듈

pub mod challenge;
pub mod connection;
pub mod identity;
pub mod room;

pub use challenge::*;
pub use connection::*;
pub use identity::*;
pub use room::*;

use crate::engine::{Envelope, SessionId};
use crate::error::EngineError;
use crate::state::AppState;

/// 엔진 결과 처리: 성공이면 메시지 전달, 실패면 요청한 세션에게 보고
fn deliver(state: &AppState, session_id: SessionId, result: Result<Vec<Envelope>, EngineError>) {
    match result {
        Ok(envelopes) => state.dispatch(envelopes),
        Err(error) => state.report(session_id, &error),
    }
}
