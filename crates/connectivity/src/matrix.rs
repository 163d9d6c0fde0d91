//! 연결성 행렬 -- 순서쌍 상태와 주소 불일치 기록

use std::fmt;

use meshtest_core::PairState;

/// 한 순서쌍의 관찰 결과
///
/// `from` 노드가 `to` 노드를 발견했는지의 방향성 있는 기록입니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairStatus {
    /// 질의를 수행한 노드
    pub from: String,
    /// 발견 대상 노드
    pub to: String,
    /// 관찰된 상태
    pub state: PairState,
}

impl fmt::Display for PairStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.from, self.to, self.state)
    }
}

/// 피어 테이블의 주소가 소유 노드의 자기 보고 주소와 다름
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressMismatch {
    /// 불일치 항목을 보고한 노드 (테이블 소유자)
    pub reporter: String,
    /// 피어 id를 소유한 노드. 우리 그룹의 노드가 아니면 "unknown"
    pub owner: String,
    /// 문제의 피어 id
    pub peer_id: String,
    /// 소유 노드가 스스로 보고한 주소
    pub expected: String,
    /// 테이블에 기록된 주소
    pub observed: String,
}

impl fmt::Display for AddressMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} reports peer {} ({}) at {}, but it announces {}",
            self.reporter, self.peer_id, self.owner, self.observed, self.expected
        )
    }
}

/// 전체 순서쌍의 최종 상태
#[derive(Debug, Clone, Default)]
pub struct ConnectivityMatrix {
    entries: Vec<PairStatus>,
}

impl ConnectivityMatrix {
    pub(crate) fn new(entries: Vec<PairStatus>) -> Self {
        Self { entries }
    }

    /// 모든 순서쌍 항목
    pub fn entries(&self) -> &[PairStatus] {
        &self.entries
    }

    /// 순서쌍 개수 (n 노드에 대해 n·(n-1))
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 모든 쌍이 Connection 상태인지 여부
    pub fn all_connected(&self) -> bool {
        self.entries
            .iter()
            .all(|e| e.state == PairState::Connection)
    }

    /// Connection이 아닌 쌍들
    pub fn unresolved(&self) -> Vec<PairStatus> {
        self.entries
            .iter()
            .filter(|e| e.state != PairState::Connection)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(from: &str, to: &str, state: PairState) -> PairStatus {
        PairStatus {
            from: from.into(),
            to: to.into(),
            state,
        }
    }

    #[test]
    fn matrix_reports_unresolved_pairs() {
        let matrix = ConnectivityMatrix::new(vec![
            pair("a", "b", PairState::Connection),
            pair("b", "a", PairState::Unknown),
            pair("a", "c", PairState::NoConnection),
        ]);

        assert!(!matrix.all_connected());
        let unresolved = matrix.unresolved();
        assert_eq!(unresolved.len(), 2);
        assert_eq!(unresolved[0].to, "a");
        assert_eq!(unresolved[1].to, "c");
    }

    #[test]
    fn fully_connected_matrix() {
        let matrix = ConnectivityMatrix::new(vec![
            pair("a", "b", PairState::Connection),
            pair("b", "a", PairState::Connection),
        ]);
        assert!(matrix.all_connected());
        assert!(matrix.unresolved().is_empty());
    }

    #[test]
    fn mismatch_display_names_all_parties() {
        let mismatch = AddressMismatch {
            reporter: "c".into(),
            owner: "b".into(),
            peer_id: "peer-b".into(),
            expected: "10.0.0.3".into(),
            observed: "10.0.0.9".into(),
        };
        let text = mismatch.to_string();
        assert!(text.contains('c'));
        assert!(text.contains("peer-b"));
        assert!(text.contains("10.0.0.3"));
        assert!(text.contains("10.0.0.9"));
    }
}
