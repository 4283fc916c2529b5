//! 엔진 에러 정의

use crate::engine::SessionId;

/// 세션/방 조정 엔진에서 발생하는 에러
///
/// 모든 에러는 복구 가능하며, 호출한 세션에게 응답으로 보고된다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// 해당 이름을 가진 접속 중인 세션이 없음
    #[error("no connected player is named {0}")]
    TargetNotFound(String),

    /// 세션이 디렉터리에 없음
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// 방이 없거나 이미 해체됨
    #[error("room {0} not found")]
    RoomNotFound(String),

    /// 다른 세션이 이미 사용 중인 이름
    #[error("name {0} is already claimed")]
    NameTaken(String),

    /// 사용할 수 없는 이름 (빈 문자열, 길이 초과)
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// 이름을 먼저 등록해야 하는 요청
    #[error("session {0} has not claimed a name")]
    NameRequired(SessionId),

    /// 방 구성원 조건 위반
    #[error("invalid room membership: {0}")]
    InvalidMembership(String),

    /// 유효한 대기 중 도전이 없음
    #[error("no pending challenge from {0}")]
    NoPendingChallenge(String),

    /// 같은 세션 ID로 중복 등록 (방어적 검사)
    #[error("session {0} is already registered")]
    DuplicateConnection(SessionId),
}

impl EngineError {
    /// 클라이언트에게 전달되는 에러 코드
    pub fn code(&self) -> &'static str {
        match self {
            Self::TargetNotFound(_) | Self::SessionNotFound(_) | Self::NoPendingChallenge(_) => {
                "NOT_FOUND"
            }
            Self::RoomNotFound(_) => "ROOM_NOT_FOUND",
            Self::NameTaken(_) => "CONFLICT",
            Self::InvalidName(_) => "INVALID_NAME",
            Self::NameRequired(_) => "NAME_REQUIRED",
            Self::InvalidMembership(_) => "INVALID_MEMBERSHIP",
            Self::DuplicateConnection(_) => "STATE_INCONSISTENCY",
        }
    }
}
