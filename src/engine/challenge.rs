//! 도전/수락/거절 핸드셰이크

use super::directory::ConnectionDirectory;
use super::room::RoomManager;
use super::{Envelope, SessionId};
use crate::error::EngineError;
use crate::protocol::ServerMessage;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// 두 세션 사이의 도전 메시지 중계
///
/// 기본적으로 도전은 보내고 잊는 알림이며, 수락/거절은 실제 도전이 있었다고
/// 믿는다. `require_pending`이 켜져 있으면 (도전자, 대상) 쌍의 유효한 기록이
/// 있어야 수락/거절할 수 있다.
pub struct ChallengeCoordinator {
    /// (도전자, 대상) -> 도전 시각
    pending: HashMap<(SessionId, SessionId), Instant>,
    require_pending: bool,
    ttl: Duration,
}

impl ChallengeCoordinator {
    pub fn new(require_pending: bool, ttl: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            require_pending,
            ttl,
        }
    }

    /// `target_name`에게 도전 알림 전달
    pub fn challenge(
        &mut self,
        directory: &ConnectionDirectory,
        from: SessionId,
        target_name: &str,
    ) -> Result<Vec<Envelope>, EngineError> {
        let from_name = caller_name(directory, from)?;
        let target = resolve(directory, target_name)?;
        if target == from {
            return Err(EngineError::InvalidMembership(
                "cannot challenge yourself".to_string(),
            ));
        }

        self.pending.insert((from, target), Instant::now());
        tracing::info!(from = %from_name, to = %target_name, "Challenge issued");

        Ok(vec![Envelope::new(target, ServerMessage::Challenge(from_name))])
    }

    /// 도전 수락: 방을 만들고 두 구성원 모두에게 방 정보를 보낸다.
    pub fn accept(
        &mut self,
        directory: &ConnectionDirectory,
        rooms: &mut RoomManager,
        from: SessionId,
        challenger_name: &str,
    ) -> Result<Vec<Envelope>, EngineError> {
        caller_name(directory, from)?;
        let challenger = resolve(directory, challenger_name)?;
        self.check_pending(challenger, from, challenger_name)?;

        let room = rooms.create_room([from, challenger], directory)?;
        let room_uuid = room.id.to_string();
        let start_player = directory
            .name_of(room.starting_member)
            .map(str::to_string)
            .unwrap_or_else(|| room.starting_member.to_string());
        let envelopes = room
            .members
            .iter()
            .map(|to| {
                Envelope::new(
                    *to,
                    ServerMessage::GameRoomUuid {
                        room_uuid: room_uuid.clone(),
                        start_player: start_player.clone(),
                    },
                )
            })
            .collect();

        // 방에 들어간 세션의 남은 도전은 더 이상 의미가 없다
        self.forget(from);
        self.forget(challenger);
        tracing::info!(room_id = %room_uuid, start_player = %start_player, "Challenge accepted");

        Ok(envelopes)
    }

    /// 도전 거절: 도전자에게 거절한 세션의 이름을 알린다.
    pub fn decline(
        &mut self,
        directory: &ConnectionDirectory,
        from: SessionId,
        challenger_name: &str,
    ) -> Result<Vec<Envelope>, EngineError> {
        let from_name = caller_name(directory, from)?;
        let challenger = resolve(directory, challenger_name)?;
        self.check_pending(challenger, from, challenger_name)?;

        self.pending.remove(&(challenger, from));
        tracing::info!(from = %from_name, challenger = %challenger_name, "Challenge declined");

        Ok(vec![Envelope::new(challenger, ServerMessage::Decline(from_name))])
    }

    /// 세션이 관련된 모든 대기 중 도전 제거
    pub fn forget(&mut self, id: SessionId) {
        self.pending
            .retain(|(challenger, target), _| *challenger != id && *target != id);
    }

    /// 만료된 도전 제거. 제거된 개수를 반환한다.
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.pending.len();
        let ttl = self.ttl;
        self.pending
            .retain(|_, issued_at| now.saturating_duration_since(*issued_at) < ttl);
        before - self.pending.len()
    }

    #[allow(dead_code)]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn check_pending(
        &self,
        challenger: SessionId,
        target: SessionId,
        challenger_name: &str,
    ) -> Result<(), EngineError> {
        if !self.require_pending {
            return Ok(());
        }
        match self.pending.get(&(challenger, target)) {
            Some(issued_at) if issued_at.elapsed() < self.ttl => Ok(()),
            _ => Err(EngineError::NoPendingChallenge(challenger_name.to_string())),
        }
    }
}

fn caller_name(directory: &ConnectionDirectory, id: SessionId) -> Result<String, EngineError> {
    let session = directory
        .lookup_by_id(id)
        .ok_or(EngineError::SessionNotFound(id))?;
    session
        .display_name
        .clone()
        .ok_or(EngineError::NameRequired(id))
}

/// 이름으로 접속 중인 세션 조회. 없으면 `TargetNotFound`.
fn resolve(directory: &ConnectionDirectory, name: &str) -> Result<SessionId, EngineError> {
    directory
        .lookup_by_name(name)
        .map(|session| session.id)
        .ok_or_else(|| EngineError::TargetNotFound(name.to_string()))
}
