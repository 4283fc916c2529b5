//! 방 단위 점수 집계

use super::directory::ConnectionDirectory;
use super::SessionId;
use crate::protocol::ScoreSummary;
use std::collections::HashMap;

/// 한 방의 세션별 누적 점수
#[derive(Debug, Default)]
pub struct ScoreBoard {
    totals: HashMap<SessionId, i64>,
}

impl ScoreBoard {
    /// 점수 누적. 부호 있는 정수를 그대로 더하며 오버플로는 포화시킨다.
    pub fn add_score(&mut self, id: SessionId, delta: i64) -> i64 {
        let total = self.totals.entry(id).or_insert(0);
        *total = total.saturating_add(delta);
        *total
    }

    /// 현재 구성원 기준 요약. 점수를 보고하지 않은 구성원은 0으로 포함된다.
    pub fn summarize(&self, members: &[SessionId], directory: &ConnectionDirectory) -> ScoreSummary {
        members
            .iter()
            .map(|id| {
                let name = directory
                    .name_of(*id)
                    .map(str::to_string)
                    .unwrap_or_else(|| id.to_string());
                (name, self.totals.get(id).copied().unwrap_or(0))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::directory::Session;
    use crate::engine::identity::NamePolicy;

    fn named(dir: &mut ConnectionDirectory, name: &str) -> SessionId {
        let id = SessionId::new();
        dir.register(Session::new(id, "127.0.0.1:5000")).unwrap();
        dir.bind_name(id, name).unwrap();
        id
    }

    #[test]
    fn test_scores_accumulate_per_session() {
        let mut board = ScoreBoard::default();
        let id = SessionId::new();

        assert_eq!(board.add_score(id, 4), 4);
        assert_eq!(board.add_score(id, 6), 10);
        assert_eq!(board.add_score(id, -3), 7);
    }

    #[test]
    fn test_add_score_saturates() {
        let mut board = ScoreBoard::default();
        let id = SessionId::new();
        board.add_score(id, i64::MAX);

        assert_eq!(board.add_score(id, 1), i64::MAX);
    }

    #[test]
    fn test_summary_defaults_missing_members_to_zero() {
        let mut dir = ConnectionDirectory::new(NamePolicy::default());
        let alice = named(&mut dir, "Alice");
        let bob = named(&mut dir, "Bob");
        let mut board = ScoreBoard::default();
        board.add_score(alice, 10);

        let summary = board.summarize(&[alice, bob], &dir);

        assert_eq!(summary.get("Alice"), Some(&10));
        assert_eq!(summary.get("Bob"), Some(&0));
        assert_eq!(summary.len(), 2);
    }

    #[test]
    fn test_summary_ignores_non_members() {
        let mut dir = ConnectionDirectory::new(NamePolicy::default());
        let alice = named(&mut dir, "Alice");
        let outsider = named(&mut dir, "Eve");
        let mut board = ScoreBoard::default();
        board.add_score(outsider, 99);

        let summary = board.summarize(&[alice], &dir);

        assert!(!summary.contains_key("Eve"));
    }
}
