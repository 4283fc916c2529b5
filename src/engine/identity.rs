//! 이름 등록과 유일성 보장

use super::directory::ConnectionDirectory;
use super::SessionId;
use crate::error::EngineError;

/// 이름 비교/검증 정책
#[derive(Debug, Clone, Copy)]
pub struct NamePolicy {
    pub case_insensitive: bool,
    pub max_length: usize,
}

impl Default for NamePolicy {
    fn default() -> Self {
        Self {
            case_insensitive: false,
            max_length: 32,
        }
    }
}

impl NamePolicy {
    /// 유일성 비교에 쓰이는 키
    pub fn key(&self, name: &str) -> String {
        if self.case_insensitive {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }

    pub fn validate(&self, name: &str) -> Result<(), EngineError> {
        if name.trim().is_empty() {
            return Err(EngineError::InvalidName("name is empty".to_string()));
        }
        if name.chars().count() > self.max_length {
            return Err(EngineError::InvalidName(format!(
                "name is longer than {} characters",
                self.max_length
            )));
        }
        Ok(())
    }
}

/// 이름 등록 규칙
///
/// 세션은 한 번에 하나의 이름만 가진다. 다른 이름을 다시 등록하면 이전 이름은
/// 해제된다. 검사와 등록은 `&mut ConnectionDirectory` 하나로 이루어지므로
/// 엔진 락 안에서 원자적이다.
pub struct IdentityRegistry {
    policy: NamePolicy,
}

impl IdentityRegistry {
    pub fn new(policy: NamePolicy) -> Self {
        Self { policy }
    }

    /// 다른 세션이 `name`을 갖고 있지 않으면 true. 자기 이름은 사용 가능으로 본다.
    pub fn is_name_available(
        &self,
        directory: &ConnectionDirectory,
        id: SessionId,
        name: &str,
    ) -> bool {
        self.check_available(directory, id, name).is_ok()
    }

    /// 이름 등록. 성공 시 이전 이름을 반환한다.
    pub fn claim_name(
        &self,
        directory: &mut ConnectionDirectory,
        id: SessionId,
        name: &str,
    ) -> Result<Option<String>, EngineError> {
        if !directory.contains(id) {
            return Err(EngineError::SessionNotFound(id));
        }
        self.check_available(directory, id, name)?;
        directory.bind_name(id, name)
    }

    pub fn name_of<'a>(&self, directory: &'a ConnectionDirectory, id: SessionId) -> Option<&'a str> {
        directory.name_of(id)
    }

    fn check_available(
        &self,
        directory: &ConnectionDirectory,
        id: SessionId,
        name: &str,
    ) -> Result<(), EngineError> {
        self.policy.validate(name)?;
        match directory.holder_of(name) {
            Some(holder) if holder != id => Err(EngineError::NameTaken(name.to_string())),
            _ => Ok(()),
        }
    }
}
