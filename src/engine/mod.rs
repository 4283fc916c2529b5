//! 세션 & 방 조정 엔진
//!
//! 연결 디렉터리, 이름 등록, 도전 핸드셰이크, 방 관리를 하나의 소유 구조체로
//! 묶는다. 엔진은 동기 코드이며 I/O를 하지 않는다. 모든 연산은 전달할 메시지
//! 목록(`Envelope`)을 반환하고, 실제 전송은 호출자가 락을 놓은 뒤에 한다.

pub mod challenge;
pub mod directory;
pub mod identity;
pub mod room;
pub mod score;

use crate::config::Config;
use crate::error::EngineError;
use crate::protocol::{NoteStructure, RoomClients, ServerMessage};
use challenge::ChallengeCoordinator;
use directory::{ConnectionDirectory, Session};
use identity::{IdentityRegistry, NamePolicy};
use room::RoomManager;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// 전송 계층이 연결마다 부여하는 세션 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// 방 ID (UUID v4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoomId(pub Uuid);

impl RoomId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for RoomId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| EngineError::RoomNotFound(s.to_string()))
    }
}

/// 특정 세션에게 보낼 메시지
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub to: SessionId,
    pub message: ServerMessage,
}

impl Envelope {
    pub fn new(to: SessionId, message: ServerMessage) -> Self {
        Self { to, message }
    }
}

/// 모든 공유 상태의 단일 소유자
pub struct Engine {
    directory: ConnectionDirectory,
    identity: IdentityRegistry,
    challenges: ChallengeCoordinator,
    rooms: RoomManager,
}

impl Engine {
    pub fn new(config: &Config) -> Self {
        let policy = NamePolicy {
            case_insensitive: config.names.case_insensitive,
            max_length: config.names.max_length,
        };
        Self::with_parts(
            policy,
            ChallengeCoordinator::new(
                config.challenge.require_pending,
                Duration::from_millis(config.challenge.ttl_ms),
            ),
            RoomManager::new(),
        )
    }

    pub fn with_parts(policy: NamePolicy, challenges: ChallengeCoordinator, rooms: RoomManager) -> Self {
        Self {
            directory: ConnectionDirectory::new(policy),
            identity: IdentityRegistry::new(policy),
            challenges,
            rooms,
        }
    }

    pub fn directory(&self) -> &ConnectionDirectory {
        &self.directory
    }

    pub fn rooms(&self) -> &RoomManager {
        &self.rooms
    }

    // ---------------------------------------------------------------
    // Connection
    // ---------------------------------------------------------------

    pub fn connect(&mut self, id: SessionId, remote_endpoint: &str) -> Result<(), EngineError> {
        self.directory.register(Session::new(id, remote_endpoint))
    }

    /// 연결 해제 정리: 방 해체, 대기 중 도전 제거, 디렉터리/이름 제거.
    ///
    /// 엔진 락 안에서 한 번에 수행되므로 중간 상태는 다른 세션에게 보이지 않는다.
    pub fn disconnect(&mut self, id: SessionId) -> Result<Vec<Envelope>, EngineError> {
        if !self.directory.contains(id) {
            return Err(EngineError::SessionNotFound(id));
        }
        let name = self.name_of(id).map(str::to_string);

        let envelopes = self.rooms.remove_member(id, name.as_deref());
        self.challenges.forget(id);
        let session = self.directory.unregister(id)?;
        tracing::debug!(
            session_id = %id,
            remote = %session.remote_endpoint,
            rooms_closed = envelopes.len(),
            "Session removed"
        );

        Ok(envelopes)
    }

    // ---------------------------------------------------------------
    // Identity
    // ---------------------------------------------------------------

    pub fn is_name_available(&self, id: SessionId, name: &str) -> bool {
        self.identity.is_name_available(&self.directory, id, name)
    }

    /// 이름 등록. 성공 시 이전 이름(있다면)을 반환한다.
    pub fn claim_name(&mut self, id: SessionId, name: &str) -> Result<Option<String>, EngineError> {
        self.identity.claim_name(&mut self.directory, id, name)
    }

    pub fn name_of(&self, id: SessionId) -> Option<&str> {
        self.identity.name_of(&self.directory, id)
    }

    /// 이름을 등록한 접속 세션 목록 (접속 순서)
    pub fn player_names(&self) -> Vec<String> {
        self.directory
            .all_sessions()
            .into_iter()
            .filter_map(|session| session.display_name)
            .collect()
    }

    // ---------------------------------------------------------------
    // Rooms (queries)
    // ---------------------------------------------------------------

    pub fn room_ids(&self) -> Vec<String> {
        self.rooms
            .room_ids()
            .iter()
            .map(RoomId::to_string)
            .collect()
    }

    /// 방 참가자 이름. 모르는 방이면 빈 목록.
    pub fn room_clients(&self, room_id: &str) -> RoomClients {
        let clients = room_id
            .parse::<RoomId>()
            .ok()
            .and_then(|room_id| self.rooms.get(room_id))
            .map(|room| {
                room.members
                    .iter()
                    .filter_map(|id| self.directory.name_of(*id))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        RoomClients { clients }
    }

    // ---------------------------------------------------------------
    // Challenge handshake
    // ---------------------------------------------------------------

    pub fn challenge(&mut self, from: SessionId, target_name: &str) -> Result<Vec<Envelope>, EngineError> {
        self.challenges.challenge(&self.directory, from, target_name)
    }

    pub fn accept(&mut self, from: SessionId, challenger_name: &str) -> Result<Vec<Envelope>, EngineError> {
        self.challenges
            .accept(&self.directory, &mut self.rooms, from, challenger_name)
    }

    pub fn decline(&mut self, from: SessionId, challenger_name: &str) -> Result<Vec<Envelope>, EngineError> {
        self.challenges.decline(&self.directory, from, challenger_name)
    }

    // ---------------------------------------------------------------
    // Gameplay
    // ---------------------------------------------------------------

    /// 노트를 같은 방의 다른 구성원에게 그대로 전달
    pub fn relay_note(&mut self, from: SessionId, note: NoteStructure) -> Result<Vec<Envelope>, EngineError> {
        let room_id = note.room_uuid.parse::<RoomId>()?;
        self.rooms.relay(room_id, from, ServerMessage::Note(note))
    }

    pub fn timeout(&mut self, from: SessionId, room_id: &str) -> Result<Vec<Envelope>, EngineError> {
        let room_id = room_id.parse::<RoomId>()?;
        self.rooms.timeout(room_id, from)
    }

    pub fn add_score(&mut self, from: SessionId, delta: i64) -> Result<i64, EngineError> {
        self.rooms.add_score(from, delta)
    }

    /// 게임 종료: 방을 해체하고 모든 구성원에게 최종 점수를 보낸다.
    pub fn end_game(&mut self, from: SessionId, room_id: &str) -> Result<Vec<Envelope>, EngineError> {
        let room_id = room_id.parse::<RoomId>()?;
        let finished = self.rooms.end_game(room_id, from, &self.directory)?;
        tracing::debug!(room_id = %finished.room_id, scores = ?finished.scores, "Score summary built");

        Ok(finished
            .members
            .iter()
            .map(|to| {
                Envelope::new(
                    *to,
                    ServerMessage::GameEnd {
                        scores: finished.scores.clone(),
                    },
                )
            })
            .collect())
    }

    // ---------------------------------------------------------------
    // Maintenance
    // ---------------------------------------------------------------

    /// 유휴 방과 만료된 도전 정리. `room_idle`이 None이면 방은 건드리지 않는다.
    pub fn sweep(&mut self, room_idle: Option<Duration>, now: Instant) -> Vec<Envelope> {
        let expired = self.challenges.expire(now);
        if expired > 0 {
            tracing::debug!(expired_challenges = expired, "Expired pending challenges");
        }

        match room_idle {
            Some(max_idle) => self.rooms.expire_idle(max_idle, now),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> Engine {
        Engine::with_parts(
            NamePolicy::default(),
            ChallengeCoordinator::new(false, Duration::from_secs(60)),
            RoomManager::new(),
        )
    }

    fn connect(engine: &mut Engine) -> SessionId {
        let id = SessionId::new();
        engine.connect(id, "127.0.0.1:8000").unwrap();
        id
    }

    /// Alice와 Bob이 같은 방에 들어간 상태
    fn paired() -> (Engine, SessionId, SessionId, String) {
        let mut engine = engine();
        let s1 = connect(&mut engine);
        let s2 = connect(&mut engine);
        engine.claim_name(s1, "Alice").unwrap();
        engine.claim_name(s2, "Bob").unwrap();
        engine.challenge(s1, "Bob").unwrap();
        let envelopes = engine.accept(s2, "Alice").unwrap();
        let ServerMessage::GameRoomUuid { room_uuid, .. } = &envelopes[0].message else {
            panic!("expected gameRoomUUID");
        };
        let room_uuid = room_uuid.clone();
        (engine, s1, s2, room_uuid)
    }

    fn note(room_uuid: &str) -> NoteStructure {
        let mut fields = serde_json::Map::new();
        fields.insert("note".into(), json!("C4"));
        NoteStructure {
            room_uuid: room_uuid.to_string(),
            fields,
        }
    }

    #[test]
    fn test_scenario_a_name_claims() {
        let mut engine = engine();
        let s1 = connect(&mut engine);
        let s2 = connect(&mut engine);

        assert!(engine.claim_name(s1, "Alice").is_ok());
        assert!(engine.claim_name(s2, "Alice").is_err());
        assert!(engine.claim_name(s2, "Bob").is_ok());
        assert_eq!(engine.player_names(), vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_scenario_b_challenge_and_accept() {
        let mut engine = engine();
        let s1 = connect(&mut engine);
        let s2 = connect(&mut engine);
        engine.claim_name(s1, "Alice").unwrap();
        engine.claim_name(s2, "Bob").unwrap();

        let challenge = engine.challenge(s1, "Bob").unwrap();
        assert_eq!(
            challenge,
            vec![Envelope::new(s2, ServerMessage::Challenge("Alice".into()))]
        );

        let accepted = engine.accept(s2, "Alice").unwrap();
        assert_eq!(accepted.len(), 2);
        let mut recipients: Vec<SessionId> = accepted.iter().map(|e| e.to).collect();
        recipients.sort_by_key(|id| id.0);
        let mut expected = vec![s1, s2];
        expected.sort_by_key(|id| id.0);
        assert_eq!(recipients, expected);
        assert_eq!(accepted[0].message, accepted[1].message);
        match &accepted[0].message {
            ServerMessage::GameRoomUuid {
                room_uuid,
                start_player,
            } => {
                assert_eq!(engine.room_ids(), vec![room_uuid.clone()]);
                assert!(start_player == "Alice" || start_player == "Bob");
                let mut clients = engine.room_clients(room_uuid).clients;
                clients.sort();
                assert_eq!(clients, vec!["Alice", "Bob"]);
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn test_scenario_c_note_goes_to_other_member_only() {
        let (mut engine, s1, s2, room_uuid) = paired();

        let envelopes = engine.relay_note(s1, note(&room_uuid)).unwrap();

        assert_eq!(
            envelopes,
            vec![Envelope::new(s2, ServerMessage::Note(note(&room_uuid)))]
        );
    }

    #[test]
    fn test_scenario_d_disconnect_mid_room() {
        let (mut engine, s1, s2, room_uuid) = paired();

        let envelopes = engine.disconnect(s1).unwrap();

        assert_eq!(
            envelopes,
            vec![Envelope::new(
                s2,
                ServerMessage::PeerDisconnected {
                    room_uuid: room_uuid.clone(),
                    name: Some("Alice".into()),
                }
            )]
        );
        assert!(matches!(
            engine.relay_note(s2, note(&room_uuid)),
            Err(EngineError::RoomNotFound(_))
        ));
        assert!(matches!(
            engine.end_game(s2, &room_uuid),
            Err(EngineError::RoomNotFound(_))
        ));
    }

    #[test]
    fn test_scenario_e_scores_on_game_end() {
        let (mut engine, s1, s2, room_uuid) = paired();
        engine.add_score(s1, 10).unwrap();
        engine.add_score(s2, 7).unwrap();

        let envelopes = engine.end_game(s2, &room_uuid).unwrap();

        let mut scores = crate::protocol::ScoreSummary::new();
        scores.insert("Alice".into(), 10);
        scores.insert("Bob".into(), 7);
        assert_eq!(envelopes.len(), 2);
        assert!(envelopes
            .iter()
            .all(|e| e.message == ServerMessage::GameEnd { scores: scores.clone() }));
        assert!(engine.room_ids().is_empty());
        assert!(matches!(
            engine.end_game(s1, &room_uuid),
            Err(EngineError::RoomNotFound(_))
        ));
    }

    #[test]
    fn test_disconnect_cleanup_is_complete() {
        let (mut engine, s1, s2, room_uuid) = paired();

        engine.disconnect(s1).unwrap();

        assert!(engine.directory().lookup_by_id(s1).is_none());
        assert!(engine.directory().lookup_by_name("Alice").is_none());
        assert_eq!(engine.rooms().room_of(s1), None);
        assert_eq!(engine.rooms().room_of(s2), None);
        assert!(engine.room_clients(&room_uuid).clients.is_empty());
        assert_eq!(engine.player_names(), vec!["Bob"]);
        assert!(matches!(
            engine.challenge(s2, "Alice"),
            Err(EngineError::TargetNotFound(_))
        ));
        // 해제된 이름은 다시 등록할 수 있다
        let s3 = connect(&mut engine);
        assert!(engine.claim_name(s3, "Alice").is_ok());
    }

    #[test]
    fn test_disconnect_twice_is_not_found() {
        let mut engine = engine();
        let s1 = connect(&mut engine);
        engine.disconnect(s1).unwrap();

        assert_eq!(engine.disconnect(s1), Err(EngineError::SessionNotFound(s1)));
    }

    #[test]
    fn test_malformed_room_id_is_room_not_found() {
        let (mut engine, s1, _, _) = paired();

        assert!(matches!(
            engine.timeout(s1, "not-a-uuid"),
            Err(EngineError::RoomNotFound(_))
        ));
        assert!(engine.room_clients("not-a-uuid").clients.is_empty());
    }

    #[test]
    fn test_unnamed_sessions_are_not_listed() {
        let mut engine = engine();
        let s1 = connect(&mut engine);
        connect(&mut engine);
        engine.claim_name(s1, "Alice").unwrap();

        assert_eq!(engine.player_names(), vec!["Alice"]);
    }

    #[test]
    fn test_sweep_closes_idle_rooms() {
        let (mut engine, s1, s2, room_uuid) = paired();
        let later = Instant::now() + Duration::from_secs(3600);

        assert!(engine.sweep(None, later).is_empty());
        let envelopes = engine.sweep(Some(Duration::from_secs(60)), later);

        let recipients: Vec<SessionId> = envelopes.iter().map(|e| e.to).collect();
        assert_eq!(recipients.len(), 2);
        assert!(recipients.contains(&s1) && recipients.contains(&s2));
        assert!(matches!(
            engine.timeout(s1, &room_uuid),
            Err(EngineError::RoomNotFound(_))
        ));
    }
}
