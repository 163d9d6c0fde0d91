//! 노드 그룹 -- 기동된 컨테이너 집합과 준비 상태 확인
//!
//! [`NodeGroup`]은 함께 기동된 노드들의 단위입니다. 그룹 번호는
//! 프로세스 내에서 단조 증가하며 포트 오프셋과 컨테이너 이름에
//! 반영됩니다. 준비 확인(`ensure_online`)은 디버그 API 폴링으로
//! 이루어지고, 오프라인 전환은 멱등입니다.

use std::time::Duration;

use tracing::{debug, info};

use meshtest_core::{Node, NodeApi, RunningContainer};

use crate::error::ClusterError;

/// 그룹에 속한 단일 노드
///
/// 논리 노드, 그 노드를 실행하는 컨테이너, 그리고 디버그 API
/// 클라이언트를 함께 들고 다닙니다.
#[derive(Debug)]
pub struct GroupNode<A> {
    /// 논리 노드 (기술 + 단계)
    pub node: Node,
    /// 노드를 실행 중인 컨테이너
    pub container: RunningContainer,
    /// 노드 디버그 API 클라이언트
    pub api: A,
}

impl<A> GroupNode<A> {
    /// 노드 이름
    pub fn name(&self) -> &str {
        &self.node.descriptor.name
    }
}

/// 함께 기동된 노드 집합
#[derive(Debug)]
pub struct NodeGroup<A> {
    group_no: u64,
    nodes: Vec<GroupNode<A>>,
    online: bool,
}

impl<A> NodeGroup<A> {
    pub(crate) fn new(group_no: u64, nodes: Vec<GroupNode<A>>) -> Self {
        Self {
            group_no,
            nodes,
            online: true,
        }
    }

    /// 그룹 번호
    pub fn group_no(&self) -> u64 {
        self.group_no
    }

    /// 그룹의 노드들
    pub fn nodes(&self) -> &[GroupNode<A>] {
        &self.nodes
    }

    /// 그룹의 컨테이너 목록
    pub fn containers(&self) -> impl Iterator<Item = &RunningContainer> {
        self.nodes.iter().map(|n| &n.container)
    }

    /// 그룹이 아직 온라인인지 여부
    pub fn is_online(&self) -> bool {
        self.online
    }

    pub(crate) fn mark_offline(&mut self) {
        self.online = false;
    }
}

impl<A: NodeApi> NodeGroup<A> {
    /// 모든 노드가 준비될 때까지 디버그 API를 폴링합니다.
    ///
    /// 노드의 `debug_info` 호출이 성공하면 준비된 것으로 간주하고
    /// 논리 노드를 Live 단계로 전환합니다. 제한 시간 안에 전부
    /// 준비되지 않으면 미준비 노드 이름을 담은
    /// [`ClusterError::StartupTimeout`]을 반환합니다.
    pub async fn ensure_online(
        &mut self,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<(), ClusterError> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut ready = vec![false; self.nodes.len()];

        loop {
            for (i, group_node) in self.nodes.iter_mut().enumerate() {
                if ready[i] {
                    continue;
                }
                match group_node.api.debug_info().await {
                    Ok(info) => {
                        ready[i] = true;
                        let address = group_node.container.address;
                        group_node.node = group_node.node.clone().started(address);
                        info!(
                            group = self.group_no,
                            node = %group_node.node.descriptor.name,
                            peer_id = %info.peer_id,
                            "node online"
                        );
                    }
                    Err(e) => {
                        debug!(
                            group = self.group_no,
                            node = %group_node.node.descriptor.name,
                            error = %e,
                            "node not ready yet"
                        );
                    }
                }
            }

            if ready.iter().all(|r| *r) {
                return Ok(());
            }

            if tokio::time::Instant::now() >= deadline {
                let pending = self
                    .nodes
                    .iter()
                    .zip(&ready)
                    .filter(|(_, r)| !**r)
                    .map(|(n, _)| n.node.descriptor.name.clone())
                    .collect();
                return Err(ClusterError::StartupTimeout {
                    pending,
                    timeout_secs: timeout.as_secs(),
                });
            }

            tokio::time::sleep(poll_interval).await;
        }
    }
}
