//! 연결 디렉터리: 접속 중인 세션의 단일 소유자

use super::identity::NamePolicy;
use super::SessionId;
use crate::error::EngineError;
use std::collections::HashMap;
use std::time::Instant;

/// 접속 하나에 대응하는 세션
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    /// 등록된 표시 이름 (등록 전에는 None)
    pub display_name: Option<String>,
    /// 원격 주소 (ip:port), 정보용
    pub remote_endpoint: String,
    #[allow(dead_code)]
    pub connected_at: Instant,
}

impl Session {
    pub fn new(id: SessionId, remote_endpoint: impl Into<String>) -> Self {
        Self {
            id,
            display_name: None,
            remote_endpoint: remote_endpoint.into(),
            connected_at: Instant::now(),
        }
    }
}

/// 세션 목록과 이름 인덱스
///
/// 이름 인덱스(`names`)는 항상 `sessions`의 `display_name`과 일치한다.
pub struct ConnectionDirectory {
    sessions: HashMap<SessionId, Session>,
    /// 접속 순서
    order: Vec<SessionId>,
    /// 정규화된 이름 -> 세션
    names: HashMap<String, SessionId>,
    policy: NamePolicy,
}

impl ConnectionDirectory {
    pub fn new(policy: NamePolicy) -> Self {
        Self {
            sessions: HashMap::new(),
            order: Vec::new(),
            names: HashMap::new(),
            policy,
        }
    }

    /// 새 세션 등록 (이름 없음)
    pub fn register(&mut self, session: Session) -> Result<(), EngineError> {
        if self.sessions.contains_key(&session.id) {
            return Err(EngineError::DuplicateConnection(session.id));
        }
        self.order.push(session.id);
        self.sessions.insert(session.id, session);
        Ok(())
    }

    /// 세션 제거. 이름 인덱스에서도 함께 제거된다.
    pub fn unregister(&mut self, id: SessionId) -> Result<Session, EngineError> {
        let session = self
            .sessions
            .remove(&id)
            .ok_or(EngineError::SessionNotFound(id))?;

        self.order.retain(|other| *other != id);
        if let Some(name) = &session.display_name {
            self.names.remove(&self.policy.key(name));
        }
        Ok(session)
    }

    pub fn lookup_by_id(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// 가장 최근에 성공한 이름 등록 기준으로 세션 조회
    pub fn lookup_by_name(&self, name: &str) -> Option<&Session> {
        self.names
            .get(&self.policy.key(name))
            .and_then(|id| self.sessions.get(id))
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// 호출 시점의 세션 스냅샷 (접속 순서)
    pub fn all_sessions(&self) -> Vec<Session> {
        self.order
            .iter()
            .filter_map(|id| self.sessions.get(id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn name_of(&self, id: SessionId) -> Option<&str> {
        self.sessions
            .get(&id)
            .and_then(|session| session.display_name.as_deref())
    }

    /// 이름을 보유한 세션 ID
    pub(super) fn holder_of(&self, name: &str) -> Option<SessionId> {
        self.names.get(&self.policy.key(name)).copied()
    }

    /// 이름을 세션에 묶는다. 이전 이름은 해제되어 반환된다.
    ///
    /// 중복 검사는 호출자(IdentityRegistry)의 책임이다.
    pub(super) fn bind_name(
        &mut self,
        id: SessionId,
        name: &str,
    ) -> Result<Option<String>, EngineError> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(EngineError::SessionNotFound(id))?;

        let previous = session.display_name.replace(name.to_string());
        if let Some(old) = &previous {
            self.names.remove(&self.policy.key(old));
        }
        self.names.insert(self.policy.key(name), id);
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> ConnectionDirectory {
        ConnectionDirectory::new(NamePolicy::default())
    }

    #[test]
    fn test_register_rejects_duplicate_id() {
        let mut dir = directory();
        let id = SessionId::new();
        dir.register(Session::new(id, "127.0.0.1:1000")).unwrap();

        let result = dir.register(Session::new(id, "127.0.0.1:1001"));

        assert_eq!(result, Err(EngineError::DuplicateConnection(id)));
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn test_unregister_unknown_session_is_not_found() {
        let mut dir = directory();
        let id = SessionId::new();

        assert!(matches!(
            dir.unregister(id),
            Err(EngineError::SessionNotFound(missing)) if missing == id
        ));
    }

    #[test]
    fn test_unregister_releases_name() {
        let mut dir = directory();
        let id = SessionId::new();
        dir.register(Session::new(id, "127.0.0.1:1000")).unwrap();
        dir.bind_name(id, "Alice").unwrap();
        assert_eq!(dir.lookup_by_name("Alice").map(|s| s.id), Some(id));

        let removed = dir.unregister(id).unwrap();

        assert_eq!(removed.display_name.as_deref(), Some("Alice"));
        assert!(dir.lookup_by_id(id).is_none());
        assert!(dir.lookup_by_name("Alice").is_none());
        assert!(dir.holder_of("Alice").is_none());
    }

    #[test]
    fn test_rebinding_frees_previous_name() {
        let mut dir = directory();
        let id = SessionId::new();
        dir.register(Session::new(id, "127.0.0.1:1000")).unwrap();
        dir.bind_name(id, "Alice").unwrap();

        let previous = dir.bind_name(id, "Alicia").unwrap();

        assert_eq!(previous.as_deref(), Some("Alice"));
        assert!(dir.lookup_by_name("Alice").is_none());
        assert_eq!(dir.name_of(id), Some("Alicia"));
    }

    #[test]
    fn test_all_sessions_is_a_snapshot_in_connection_order() {
        let mut dir = directory();
        let ids: Vec<SessionId> = (0..3).map(|_| SessionId::new()).collect();
        for (i, id) in ids.iter().enumerate() {
            dir.register(Session::new(*id, format!("127.0.0.1:{}", 1000 + i)))
                .unwrap();
        }

        let snapshot = dir.all_sessions();
        dir.unregister(ids[1]).unwrap();

        let listed: Vec<SessionId> = snapshot.iter().map(|s| s.id).collect();
        assert_eq!(listed, ids);
        assert_eq!(dir.all_sessions().len(), 2);
    }
}
