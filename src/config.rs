//! 환경 변수 기반 설정 관리

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// 서버 설정
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    pub names: NameConfig,
    pub challenge: ChallengeConfig,
    pub room: RoomConfig,
    pub log_level: String,
}

/// 이름 등록 설정
#[derive(Debug, Clone)]
pub struct NameConfig {
    pub case_insensitive: bool,
    pub max_length: usize,
}

/// 도전 추적 설정
#[derive(Debug, Clone)]
pub struct ChallengeConfig {
    pub require_pending: bool,
    pub ttl_ms: u64,
}

/// 방 설정
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// 0이면 유휴 방 정리를 하지 않음
    pub idle_timeout_ms: u64,
    pub cleanup_interval_secs: u64,
}

impl RoomConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_ms > 0).then(|| Duration::from_millis(self.idle_timeout_ms))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
            cors_origins: vec!["*".to_string()],
            names: NameConfig {
                case_insensitive: false,
                max_length: 32,
            },
            challenge: ChallengeConfig {
                require_pending: false,
                ttl_ms: 60_000,
            },
            room: RoomConfig {
                idle_timeout_ms: 600_000,
                cleanup_interval_secs: 30,
            },
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// 환경 변수에서 설정 로드
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        Self {
            port: parse_var("PORT", defaults.port),
            host: env::var("HOST").unwrap_or(defaults.host),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            names: NameConfig {
                case_insensitive: bool_var("NAME_CASE_INSENSITIVE", defaults.names.case_insensitive),
                max_length: parse_var("NAME_MAX_LENGTH", defaults.names.max_length),
            },
            challenge: ChallengeConfig {
                require_pending: bool_var(
                    "REQUIRE_PENDING_CHALLENGE",
                    defaults.challenge.require_pending,
                ),
                ttl_ms: parse_var("CHALLENGE_TTL_MS", defaults.challenge.ttl_ms),
            },
            room: RoomConfig {
                idle_timeout_ms: parse_var("ROOM_IDLE_TIMEOUT_MS", defaults.room.idle_timeout_ms),
                cleanup_interval_secs: parse_var(
                    "CLEANUP_INTERVAL_SECS",
                    defaults.room.cleanup_interval_secs,
                ),
            },
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn bool_var(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}
