//! NoteBattle 실시간 세션 조정 & 노트 중계 서버

mod config;
mod engine;
mod error;
mod handlers;
mod protocol;
mod state;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        ConnectInfo, State, WebSocketUpgrade,
    },
    http::HeaderValue,
    response::{Html, IntoResponse, Json},
    routing::get,
    Router,
};
use config::Config;
use engine::SessionId;
use futures::{SinkExt, StreamExt};
use protocol::{ClientMessage, ServerMessage};
use state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    // 로깅 초기화
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = Arc::new(AppState::new(config.clone()));

    // 유휴 방/만료 도전 정리 스케줄러
    let cleanup_state = state.clone();
    let cleanup_every = config.room.cleanup_interval_secs.max(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(cleanup_every));
        loop {
            interval.tick().await;
            handlers::cleanup_idle_rooms(cleanup_state.clone()).await;
        }
    });

    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🎵 NoteBattle relay server started");
    tracing::info!("Address: {}", addr);
    tracing::info!("WebSocket: ws://{}/ws", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// 라우터 설정
fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_origins)),
        )
        .with_state(state)
}

/// CORS 설정. `*`이 있으면 모든 origin 허용.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() || origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok()),
        )
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn index_handler() -> Html<&'static str> {
    Html("<h1>NoteBattle Relay Server</h1><p>WebSocket endpoint: /ws</p>")
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let (sessions, rooms) = {
        let engine = state.engine.read().await;
        (engine.directory().len(), engine.rooms().len())
    };

    Json(serde_json::json!({
        "status": "ok",
        "server": "notebattle-relay",
        "sessions": sessions,
        "rooms": rooms,
        "timestamp": std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, remote))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, remote: SocketAddr) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    // 연결 처리
    let session_id = match handlers::handle_connection(state.clone(), tx, remote).await {
        Ok(session_id) => session_id,
        Err(error) => {
            tracing::error!(remote = %remote, error = %error, "Failed to register connection");
            return;
        }
    };

    // 송신 태스크
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(error) => {
                    tracing::error!(error = %error, "Failed to encode server message");
                }
            }
        }
    });

    // 수신 처리 (세션별로 도착 순서대로 처리)
    let reason = loop {
        match ws_receiver.next().await {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => handle_client_message(&state, session_id, msg).await,
                Err(error) => {
                    tracing::warn!(session_id = %session_id, error = %error, "Undecodable message");
                    state.send_to(
                        session_id,
                        ServerMessage::Error {
                            code: "BAD_MESSAGE".to_string(),
                            message: error.to_string(),
                        },
                    );
                }
            },
            Some(Ok(Message::Close(_))) => break "client close",
            Some(Err(_)) => break "transport error",
            None => break "stream ended",
            Some(Ok(_)) => {}
        }
    };

    // 연결 해제
    handlers::handle_disconnect(state, session_id, reason).await;
    send_task.abort();
}

async fn handle_client_message(state: &Arc<AppState>, session_id: SessionId, msg: ClientMessage) {
    match msg {
        ClientMessage::NameIsAvailable(name) => {
            handlers::handle_name_is_available(state.clone(), session_id, &name).await;
        }
        ClientMessage::NameSubscribe(name) => {
            handlers::handle_name_subscribe(state.clone(), session_id, &name).await;
        }
        ClientMessage::GetAllRooms => {
            handlers::handle_get_all_rooms(state.clone(), session_id).await;
        }
        ClientMessage::GetAllPlayers => {
            handlers::handle_get_all_players(state.clone(), session_id).await;
        }
        ClientMessage::GetRoomAllClients(room_id) => {
            handlers::handle_get_room_all_clients(state.clone(), session_id, room_id.as_deref())
                .await;
        }
        ClientMessage::Challenge(target_name) => {
            handlers::handle_challenge(state.clone(), session_id, &target_name).await;
        }
        ClientMessage::Accept(challenger_name) => {
            handlers::handle_accept(state.clone(), session_id, &challenger_name).await;
        }
        ClientMessage::Decline(challenger_name) => {
            handlers::handle_decline(state.clone(), session_id, &challenger_name).await;
        }
        ClientMessage::Note(note) => {
            handlers::handle_note(state.clone(), session_id, note).await;
        }
        ClientMessage::Timeout(room_id) => {
            handlers::handle_timeout(state.clone(), session_id, &room_id).await;
        }
        ClientMessage::Score(delta) => {
            handlers::handle_score(state.clone(), session_id, delta).await;
        }
        ClientMessage::GameEnd(room_id) => {
            handlers::handle_game_end(state.clone(), session_id, &room_id).await;
        }
    }
}
