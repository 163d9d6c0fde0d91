//! 수렴 검증기 -- 전체 메시의 순서쌍 폴링
//!
//! 모든 순서쌍이 Connection에 도달하고 주소 불일치가 없을 때까지
//! 폴링을 반복합니다. 개별 API 실패는 일시적 상태로 취급하고 다음
//! 시도에서 다시 확인합니다. Connection으로 확인된 쌍은 다시 묻지
//! 않습니다.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info};

use meshtest_core::config::ConnectivityConfig;
use meshtest_core::{NodeApi, PairState, PeerRecord};

use crate::error::ConnectivityError;
use crate::matrix::{AddressMismatch, ConnectivityMatrix, PairStatus};

/// 검증 대상 노드 핸들
pub struct NodeHandle<A> {
    /// 보고서에 쓰일 노드 이름
    pub name: String,
    /// 디버그 API 클라이언트
    pub api: A,
}

impl<A> NodeHandle<A> {
    pub fn new(name: impl Into<String>, api: A) -> Self {
        Self {
            name: name.into(),
            api,
        }
    }
}

/// 전체 메시 수렴 검증기
#[derive(Debug, Clone)]
pub struct ConnectivityVerifier {
    poll_interval: Duration,
    timeout: Duration,
}

impl ConnectivityVerifier {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    pub fn from_config(config: &ConnectivityConfig) -> Self {
        Self::new(
            Duration::from_secs(config.poll_interval_secs),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// 모든 순서쌍이 서로를 발견할 때까지 검증합니다.
    ///
    /// n개 노드에 대해 n·(n-1)개 순서쌍을 검사합니다. 노드가 1개
    /// 이하이면 빈 행렬로 즉시 성공합니다.
    pub async fn verify_full_mesh<A: NodeApi>(
        &self,
        nodes: &[NodeHandle<A>],
    ) -> Result<ConnectivityMatrix, ConnectivityError> {
        if nodes.len() < 2 {
            return Ok(ConnectivityMatrix::default());
        }

        let deadline = tokio::time::Instant::now() + self.timeout;
        let mut states: HashMap<(usize, usize), PairState> = HashMap::new();
        for i in 0..nodes.len() {
            for j in 0..nodes.len() {
                if i != j {
                    states.insert((i, j), PairState::Unknown);
                }
            }
        }

        let mut rounds: u32 = 0;
        let mut last_fetch_error: Option<String> = None;
        let mut mismatches: Vec<AddressMismatch> = Vec::new();

        loop {
            rounds += 1;

            match self.fetch_tables(nodes).await {
                Ok(tables) => {
                    last_fetch_error = None;
                    mismatches = check_addresses(nodes, &tables);

                    for ((i, j), state) in states.iter_mut() {
                        if *state == PairState::Connection {
                            continue;
                        }
                        let target_id = &tables[*j].local.peer_id;
                        *state = match nodes[*i].api.debug_peer(target_id).await {
                            Ok(peer) => {
                                if peer.found
                                    && peer.peer_id == *target_id
                                    && !peer.addresses.is_empty()
                                {
                                    PairState::Connection
                                } else if !peer.found {
                                    PairState::NoConnection
                                } else {
                                    PairState::Unknown
                                }
                            }
                            Err(e) => {
                                debug!(
                                    from = %nodes[*i].name,
                                    to = %nodes[*j].name,
                                    error = %e,
                                    "peer check failed"
                                );
                                PairState::Unknown
                            }
                        };
                    }

                    let all_connected =
                        states.values().all(|s| *s == PairState::Connection);
                    if all_connected && mismatches.is_empty() {
                        info!(nodes = nodes.len(), rounds, "mesh converged");
                        return Ok(build_matrix(nodes, &states));
                    }
                }
                Err(e) => {
                    debug!(error = %e, "peer table fetch failed, retrying");
                    last_fetch_error = Some(e);
                }
            }

            if tokio::time::Instant::now() >= deadline {
                let matrix = build_matrix(nodes, &states);
                return Err(ConnectivityError::Timeout {
                    pending: matrix.unresolved(),
                    mismatches,
                    last_fetch_error,
                    timeout_secs: self.timeout.as_secs(),
                });
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// 모든 노드의 피어 테이블을 조회합니다. 하나라도 실패하면
    /// 이번 시도 전체를 실패로 봅니다.
    async fn fetch_tables<A: NodeApi>(
        &self,
        nodes: &[NodeHandle<A>],
    ) -> Result<Vec<PeerRecord>, String> {
        let mut tables = Vec::with_capacity(nodes.len());
        for node in nodes {
            let record = node
                .api
                .peer_table()
                .await
                .map_err(|e| format!("{}: {e}", node.name))?;
            tables.push(record);
        }
        Ok(tables)
    }
}

/// 테이블 주소를 소유 노드의 자기 보고 주소와 대조합니다.
///
/// 피어 id의 권위 있는 주소는 그 id를 소유한 노드가 자신의 테이블
/// local 항목에 보고한 주소입니다. 그룹에 없는 피어 id는 소유자
/// "unknown"으로 기록합니다.
fn check_addresses<A>(nodes: &[NodeHandle<A>], tables: &[PeerRecord]) -> Vec<AddressMismatch> {
    let owners: HashMap<&str, usize> = tables
        .iter()
        .enumerate()
        .map(|(i, t)| (t.local.peer_id.as_str(), i))
        .collect();

    let mut mismatches = Vec::new();
    for (i, table) in tables.iter().enumerate() {
        for entry in &table.peers {
            match owners.get(entry.peer_id.as_str()) {
                Some(&owner) => {
                    let expected = &tables[owner].local.address;
                    if entry.address != *expected {
                        mismatches.push(AddressMismatch {
                            reporter: nodes[i].name.clone(),
                            owner: nodes[owner].name.clone(),
                            peer_id: entry.peer_id.clone(),
                            expected: expected.clone(),
                            observed: entry.address.clone(),
                        });
                    }
                }
                None => {
                    mismatches.push(AddressMismatch {
                        reporter: nodes[i].name.clone(),
                        owner: "unknown".to_owned(),
                        peer_id: entry.peer_id.clone(),
                        expected: "unknown".to_owned(),
                        observed: entry.address.clone(),
                    });
                }
            }
        }
    }
    mismatches
}

fn build_matrix<A>(
    nodes: &[NodeHandle<A>],
    states: &HashMap<(usize, usize), PairState>,
) -> ConnectivityMatrix {
    let mut entries: Vec<PairStatus> = states
        .iter()
        .map(|((i, j), state)| PairStatus {
            from: nodes[*i].name.clone(),
            to: nodes[*j].name.clone(),
            state: *state,
        })
        .collect();
    entries.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));
    ConnectivityMatrix::new(entries)
}
