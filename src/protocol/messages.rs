//! 클라이언트-서버 메시지 프로토콜 정의

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 게임 종료 시 전송되는 점수 요약 (이름 -> 누적 점수)
pub type ScoreSummary = BTreeMap<String, i64>;

/// 클라이언트 → 서버 메시지
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ClientMessage {
    // Identity
    NameIsAvailable(String),
    NameSubscribe(String),

    // Directory Queries
    GetAllRooms,
    GetAllPlayers,
    GetRoomAllClients(Option<String>),

    // Challenge Handshake
    Challenge(String),
    Accept(String),
    Decline(String),

    // Gameplay
    Note(NoteStructure),
    Timeout(String),
    Score(i64),
    #[serde(rename = "game end")]
    GameEnd(String),
}

/// 서버 → 클라이언트 메시지
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ServerMessage {
    // Connection
    Connected {
        #[serde(rename = "socketId")]
        socket_id: String,
    },
    Error {
        code: String,
        message: String,
    },

    // Identity
    NameIsAvailable(bool),
    NameSubscribe(bool),

    // Directory Queries
    GetAllRooms {
        #[serde(rename = "gameRooms")]
        game_rooms: Vec<String>,
    },
    GetAllPlayers {
        clients: Vec<String>,
    },
    GetRoomAllClients(Option<RoomClients>),

    // Challenge Handshake
    Challenge(String),
    #[serde(rename = "gameRoomUUID")]
    GameRoomUuid {
        #[serde(rename = "roomUUID")]
        room_uuid: String,
        #[serde(rename = "startPlayer")]
        start_player: String,
    },
    Decline(String),

    // Gameplay
    Note(NoteStructure),
    Timeout,
    #[serde(rename = "game end")]
    GameEnd {
        scores: ScoreSummary,
    },

    // Room Teardown
    PeerDisconnected {
        #[serde(rename = "roomUUID")]
        room_uuid: String,
        name: Option<String>,
    },
    RoomClosed {
        #[serde(rename = "roomUUID")]
        room_uuid: String,
        reason: String,
    },
}

/// 방 참가자 이름 목록
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomClients {
    pub clients: Vec<String>,
}

/// 노트 이벤트. `roomUUID` 외의 필드는 해석하지 않고 그대로 전달한다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteStructure {
    #[serde(rename = "roomUUID")]
    pub room_uuid: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}
