//! 방 생명주기 관리: 생성, 구성원, 메시지 중계, 해체

use super::directory::ConnectionDirectory;
use super::score::ScoreBoard;
use super::{Envelope, RoomId, SessionId};
use crate::error::EngineError;
use crate::protocol::{ScoreSummary, ServerMessage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// 방 하나의 인원 (1:1 대결)
pub const ROOM_SIZE: usize = 2;

/// 진행 중인 대결 방
#[derive(Debug)]
pub struct Room {
    pub id: RoomId,
    pub members: Vec<SessionId>,
    pub starting_member: SessionId,
    pub scores: ScoreBoard,
    #[allow(dead_code)]
    pub created_at: Instant,
    pub last_activity: Instant,
}

impl Room {
    pub fn contains(&self, id: SessionId) -> bool {
        self.members.contains(&id)
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    fn others(&self, except: SessionId) -> impl Iterator<Item = SessionId> + '_ {
        self.members.iter().copied().filter(move |id| *id != except)
    }
}

/// 종료된 방의 구성원과 최종 점수
#[derive(Debug)]
pub struct FinishedRoom {
    pub room_id: RoomId,
    pub members: Vec<SessionId>,
    pub scores: ScoreSummary,
}

/// 모든 방과 세션 -> 방 인덱스
///
/// 세션은 동시에 최대 하나의 방에만 속한다 (`membership`).
pub struct RoomManager {
    rooms: HashMap<RoomId, Room>,
    /// 생성 순서
    order: Vec<RoomId>,
    membership: HashMap<SessionId, RoomId>,
    rng: StdRng,
}

impl RoomManager {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            rooms: HashMap::new(),
            order: Vec::new(),
            membership: HashMap::new(),
            rng,
        }
    }

    /// 두 세션으로 방 생성. 시작 플레이어는 무작위로 고른다.
    pub fn create_room(
        &mut self,
        members: [SessionId; ROOM_SIZE],
        directory: &ConnectionDirectory,
    ) -> Result<&Room, EngineError> {
        let [first, second] = members;
        if first == second {
            return Err(EngineError::InvalidMembership(
                "a room needs two different sessions".to_string(),
            ));
        }
        for id in members {
            if !directory.contains(id) {
                return Err(EngineError::InvalidMembership(format!(
                    "session {id} is not connected"
                )));
            }
            if let Some(current) = self.membership.get(&id) {
                return Err(EngineError::InvalidMembership(format!(
                    "session {id} is already in room {current}"
                )));
            }
        }

        let room_id = RoomId::new();
        let starting_member = members[self.rng.gen_range(0..ROOM_SIZE)];
        let now = Instant::now();
        let room = Room {
            id: room_id,
            members: members.to_vec(),
            starting_member,
            scores: ScoreBoard::default(),
            created_at: now,
            last_activity: now,
        };

        for id in members {
            self.membership.insert(id, room_id);
        }
        self.order.push(room_id);
        self.rooms.insert(room_id, room);

        tracing::info!(room_id = %room_id, "Room created");
        self.rooms
            .get(&room_id)
            .ok_or_else(|| EngineError::RoomNotFound(room_id.to_string()))
    }

    pub fn get(&self, room_id: RoomId) -> Option<&Room> {
        self.rooms.get(&room_id)
    }

    pub fn room_of(&self, id: SessionId) -> Option<RoomId> {
        self.membership.get(&id).copied()
    }

    /// 생성 순서대로 방 ID 목록
    pub fn room_ids(&self) -> Vec<RoomId> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// 보낸 세션을 제외한 모든 구성원에게 메시지 전달
    pub fn relay(
        &mut self,
        room_id: RoomId,
        from: SessionId,
        message: ServerMessage,
    ) -> Result<Vec<Envelope>, EngineError> {
        let room = self.member_room_mut(room_id, from)?;
        room.touch();

        Ok(room
            .others(from)
            .map(|to| Envelope::new(to, message.clone()))
            .collect())
    }

    /// 보낸 세션의 타이머 만료를 다른 구성원에게 알림
    pub fn timeout(&mut self, room_id: RoomId, from: SessionId) -> Result<Vec<Envelope>, EngineError> {
        self.relay(room_id, from, ServerMessage::Timeout)
    }

    /// 세션이 속한 방의 점수에 누적
    pub fn add_score(&mut self, id: SessionId, delta: i64) -> Result<i64, EngineError> {
        let room_id = self
            .room_of(id)
            .ok_or_else(|| EngineError::RoomNotFound(format!("(no room for session {id})")))?;
        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| EngineError::RoomNotFound(room_id.to_string()))?;
        room.touch();
        Ok(room.scores.add_score(id, delta))
    }

    /// 게임 종료: 방을 해체하고 최종 점수를 반환한다.
    ///
    /// 이미 해체된 방이면 `RoomNotFound`.
    pub fn end_game(
        &mut self,
        room_id: RoomId,
        from: SessionId,
        directory: &ConnectionDirectory,
    ) -> Result<FinishedRoom, EngineError> {
        let room = self.member_room_mut(room_id, from)?;
        let scores = room.scores.summarize(&room.members, directory);

        let room = self.teardown(room_id)?;
        tracing::info!(room_id = %room_id, "Game ended");

        Ok(FinishedRoom {
            room_id,
            members: room.members,
            scores,
        })
    }

    /// 연결이 끊긴 세션의 방을 통째로 해체하고 남은 구성원에게 알린다.
    pub fn remove_member(&mut self, id: SessionId, name: Option<&str>) -> Vec<Envelope> {
        let Some(room_id) = self.room_of(id) else {
            return Vec::new();
        };
        let Ok(room) = self.teardown(room_id) else {
            return Vec::new();
        };

        tracing::info!(room_id = %room_id, session_id = %id, "Room closed by disconnect");
        let envelopes = room
            .others(id)
            .map(|to| {
                Envelope::new(
                    to,
                    ServerMessage::PeerDisconnected {
                        room_uuid: room_id.to_string(),
                        name: name.map(str::to_string),
                    },
                )
            })
            .collect();
        envelopes
    }

    /// `max_idle` 이상 활동이 없는 방 해체
    pub fn expire_idle(&mut self, max_idle: Duration, now: Instant) -> Vec<Envelope> {
        let idle: Vec<RoomId> = self
            .order
            .iter()
            .filter(|id| {
                self.rooms
                    .get(*id)
                    .is_some_and(|room| now.saturating_duration_since(room.last_activity) >= max_idle)
            })
            .copied()
            .collect();

        let mut envelopes = Vec::new();
        for room_id in idle {
            if let Ok(room) = self.teardown(room_id) {
                tracing::info!(room_id = %room_id, "Cleaned up idle room");
                envelopes.extend(room.members.iter().map(|to| {
                    Envelope::new(
                        *to,
                        ServerMessage::RoomClosed {
                            room_uuid: room_id.to_string(),
                            reason: "idle".to_string(),
                        },
                    )
                }));
            }
        }
        envelopes
    }

    fn member_room_mut(&mut self, room_id: RoomId, from: SessionId) -> Result<&mut Room, EngineError> {
        let room = self
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| EngineError::RoomNotFound(room_id.to_string()))?;
        if !room.contains(from) {
            return Err(EngineError::InvalidMembership(format!(
                "session {from} is not a member of room {room_id}"
            )));
        }
        Ok(room)
    }

    fn teardown(&mut self, room_id: RoomId) -> Result<Room, EngineError> {
        let room = self
            .rooms
            .remove(&room_id)
            .ok_or_else(|| EngineError::RoomNotFound(room_id.to_string()))?;

        self.order.retain(|id| *id != room_id);
        for id in &room.members {
            self.membership.remove(id);
        }
        Ok(room)
    }
}
