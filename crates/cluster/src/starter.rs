//! 클러스터 스타터 -- 그룹 기동의 오케스트레이션 컨텍스트
//!
//! [`ClusterStarter`]는 그룹 번호 발급, 포트 할당, 부트스트랩 SPR 유도,
//! 컨테이너 순차 기동, 준비 폴링, 그리고 실패 시 진단 로그 수집까지의
//! 흐름을 소유합니다. 살아있는 컨테이너 레지스트리를 유지하여 주기적
//! 로그 다운로드와 일괄 정리가 같은 스냅샷을 보게 합니다.
//!
//! 상태 공유: 그룹 번호는 `AtomicU64`, 레지스트리는 `Mutex<HashMap>`.
//! 임계 구역은 레지스트리 갱신/조회뿐이며 await를 품지 않습니다.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use meshtest_core::config::ClusterConfig;
use meshtest_core::{
    ContainerOrchestrator, FileLogSink, Location, Node, NodeApi, NodeDescriptor, NodeLogLevel,
    NodePorts, NodeRole, RunningContainer,
};

use crate::error::ClusterError;
use crate::group::{GroupNode, NodeGroup};
use crate::http::NodeApiProvider;
use crate::recipe::{node_environment, node_recipe, GroupPortAllocator};

/// 그룹의 부트스트랩 방식
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Bootstrap {
    /// 부트스트랩 없음. 모든 노드가 독립적으로 기동
    #[default]
    None,
    /// 첫 노드를 부트스트랩으로 기동하고 그 SPR을 나머지에 주입
    FirstNode,
    /// 외부에서 주어진 SPR을 모든 노드에 주입
    Spr(String),
}

/// 그룹 기동 요청
#[derive(Debug, Clone)]
pub struct GroupSetup {
    /// 노드 수 (1 이상)
    pub node_count: usize,
    /// 노드 이름 접두어
    pub name_prefix: String,
    /// 배치 힌트
    pub location: Location,
    /// 부트스트랩 방식
    pub bootstrap: Bootstrap,
    /// 노드 로그 레벨 (미지정 시 이미지 기본값)
    pub log_level: Option<NodeLogLevel>,
    /// 스토리지 쿼터 (바이트, 미지정 시 이미지 기본값)
    pub storage_quota: Option<u64>,
}

impl GroupSetup {
    /// `node_count`개 노드의 기본 요청을 만듭니다.
    pub fn new(node_count: usize) -> Self {
        Self {
            node_count,
            name_prefix: "node".to_owned(),
            location: Location::Any,
            bootstrap: Bootstrap::None,
            log_level: None,
            storage_quota: None,
        }
    }

    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: Bootstrap) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_log_level(mut self, level: NodeLogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn with_storage_quota(mut self, bytes: u64) -> Self {
        self.storage_quota = Some(bytes);
        self
    }
}

/// 그룹 기동/정지/정리의 단일 진입점
pub struct ClusterStarter<O, P: NodeApiProvider> {
    config: ClusterConfig,
    data_dir: String,
    log_dir: Option<PathBuf>,
    orchestrator: Arc<O>,
    provider: P,
    next_group: AtomicU64,
    live: Mutex<HashMap<u64, Vec<RunningContainer>>>,
}

impl<O, P> ClusterStarter<O, P>
where
    O: ContainerOrchestrator,
    P: NodeApiProvider,
{
    /// 스타터를 생성합니다.
    pub fn new(
        config: ClusterConfig,
        data_dir: impl Into<String>,
        orchestrator: Arc<O>,
        provider: P,
    ) -> Self {
        Self {
            config,
            data_dir: data_dir.into(),
            log_dir: None,
            orchestrator,
            provider,
            next_group: AtomicU64::new(0),
            live: Mutex::new(HashMap::new()),
        }
    }

    /// 기동 실패 시 진단 로그를 내려받을 디렉터리를 지정합니다.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// 공유 오케스트레이터 핸들
    pub fn orchestrator(&self) -> &Arc<O> {
        &self.orchestrator
    }

    /// 현재 살아있는 컨테이너의 스냅샷
    pub fn live_containers(&self) -> Vec<RunningContainer> {
        let live = self.live.lock().unwrap_or_else(|e| e.into_inner());
        live.values().flatten().cloned().collect()
    }

    /// 노드 그룹을 기동하고 전원이 준비될 때까지 기다립니다.
    ///
    /// 준비 제한 시간이 지나면 그룹 전체의 컨테이너 로그를 먼저
    /// 수집한 뒤 [`ClusterError::StartupTimeout`]을 반환합니다.
    /// 실패한 그룹의 컨테이너는 남겨두며 `delete_all_resources`가
    /// 정리합니다.
    pub async fn bring_online(&self, setup: GroupSetup) -> Result<NodeGroup<P::Api>, ClusterError> {
        if setup.node_count == 0 {
            return Err(ClusterError::Setup("group must have at least one node".into()));
        }

        let group_no = self.next_group.fetch_add(1, Ordering::SeqCst);
        let ports = GroupPortAllocator::new(&self.config, group_no)?.allocate(setup.node_count)?;

        info!(
            group = group_no,
            nodes = setup.node_count,
            bootstrap = ?setup.bootstrap,
            "bringing group online"
        );

        let mut nodes = Vec::with_capacity(setup.node_count);

        // 부트스트랩 SPR 유도. FirstNode 모드는 첫 노드를 먼저 띄우고
        // 그 SPR이 나올 때까지 기다립니다.
        let spr = match &setup.bootstrap {
            Bootstrap::Spr(spr) => Some(spr.clone()),
            Bootstrap::None => None,
            Bootstrap::FirstNode => {
                let first = self
                    .start_node(group_no, &setup, 0, ports[0], NodeRole::Bootstrap, None)
                    .await?;
                let spr = match self.wait_for_spr(&first).await {
                    Ok(spr) => spr,
                    Err(e) => {
                        self.capture_logs([&first.container]).await;
                        return Err(e);
                    }
                };
                nodes.push(first);
                Some(spr)
            }
        };

        let start_index = nodes.len();
        for i in start_index..setup.node_count {
            let node = self
                .start_node(group_no, &setup, i, ports[i], NodeRole::Regular, spr.as_deref())
                .await?;
            nodes.push(node);
        }

        let mut group = NodeGroup::new(group_no, nodes);
        let timeout = Duration::from_secs(self.config.startup_timeout_secs);
        let poll = Duration::from_secs(self.config.ready_poll_interval_secs);

        if let Err(e) = group.ensure_online(timeout, poll).await {
            warn!(group = group_no, error = %e, "group failed to come online, capturing logs");
            self.capture_logs(group.containers()).await;
            return Err(e);
        }

        info!(group = group_no, "group online");
        Ok(group)
    }

    /// 그룹의 모든 컨테이너를 정지합니다. 두 번째 호출은 no-op입니다.
    pub async fn bring_offline(&self, group: &mut NodeGroup<P::Api>) -> Result<(), ClusterError> {
        if !group.is_online() {
            debug!(group = group.group_no(), "group already offline");
            return Ok(());
        }

        info!(group = group.group_no(), "bringing group offline");
        for container in group.containers() {
            match self.orchestrator.stop(container).await {
                Ok(()) => {}
                Err(meshtest_core::OrchestratorError::NotFound(name)) => {
                    debug!(container = %name, "container already gone");
                }
                Err(e) => {
                    warn!(container = %container.name, error = %e, "stop failed");
                }
            }
        }

        group.mark_offline();
        let mut live = self.live.lock().unwrap_or_else(|e| e.into_inner());
        live.remove(&group.group_no());
        Ok(())
    }

    /// 이 네임스페이스의 모든 리소스를 최선 노력으로 삭제합니다.
    pub async fn delete_all_resources(&self) -> Result<(), ClusterError> {
        {
            let mut live = self.live.lock().unwrap_or_else(|e| e.into_inner());
            live.clear();
        }
        self.orchestrator.delete_all_resources().await?;
        Ok(())
    }

    async fn start_node(
        &self,
        group_no: u64,
        setup: &GroupSetup,
        index: usize,
        ports: NodePorts,
        role: NodeRole,
        bootstrap_spr: Option<&str>,
    ) -> Result<GroupNode<P::Api>, ClusterError> {
        let name = format!("g{group_no}-{}-{index}", setup.name_prefix);
        let descriptor = NodeDescriptor {
            name: name.clone(),
            role,
            ports,
            log_level: setup.log_level,
            storage_quota: setup.storage_quota,
        };

        let env = node_environment(&descriptor, &self.data_dir, bootstrap_spr);
        let recipe = node_recipe(&self.config.node_image, &name, &descriptor.ports);

        let containers = self
            .orchestrator
            .start(1, &setup.location, &recipe, &env)
            .await?;
        let container = containers.into_iter().next().ok_or_else(|| {
            ClusterError::Setup(format!("orchestrator returned no container for '{name}'"))
        })?;

        debug!(
            group = group_no,
            node = %name,
            container = %container.name,
            address = %container.address,
            "node container started"
        );

        {
            let mut live = self.live.lock().unwrap_or_else(|e| e.into_inner());
            live.entry(group_no).or_default().push(container.clone());
        }

        let api = self.provider.api_for(container.address, descriptor.ports.api);
        Ok(GroupNode {
            node: Node::configured(descriptor),
            container,
            api,
        })
    }

    /// 부트스트랩 노드가 SPR을 보고할 때까지 기다립니다.
    async fn wait_for_spr(&self, node: &GroupNode<P::Api>) -> Result<String, ClusterError> {
        let timeout = Duration::from_secs(self.config.startup_timeout_secs);
        let poll = Duration::from_secs(self.config.ready_poll_interval_secs);
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            match node.api.debug_info().await {
                Ok(info) if !info.spr.is_empty() => {
                    debug!(node = %node.name(), "bootstrap spr available");
                    return Ok(info.spr);
                }
                Ok(_) => {
                    debug!(node = %node.name(), "node up but spr not yet available");
                }
                Err(e) => {
                    debug!(node = %node.name(), error = %e, "bootstrap node not ready yet");
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(ClusterError::BootstrapUnavailable {
                    node: node.name().to_owned(),
                    timeout_secs: timeout.as_secs(),
                });
            }

            tokio::time::sleep(poll).await;
        }
    }

    /// 컨테이너 로그를 진단용으로 내려받습니다. 실패는 기록만 합니다.
    async fn capture_logs<'a>(&self, containers: impl IntoIterator<Item = &'a RunningContainer>) {
        let Some(log_dir) = &self.log_dir else {
            debug!("no log directory configured, skipping diagnostic log capture");
            return;
        };

        for container in containers {
            let path = log_dir
                .join("containers")
                .join(format!("{}.log", container.name));
            let mut sink = match FileLogSink::create(&path) {
                Ok(sink) => sink,
                Err(e) => {
                    warn!(container = %container.name, error = %e, "cannot open log file");
                    continue;
                }
            };
            if let Err(e) = self.orchestrator.download_log(container, &mut sink).await {
                warn!(container = %container.name, error = %e, "log download failed");
                continue;
            }
            if let Err(e) = sink.flush() {
                warn!(container = %container.name, error = %e, "log flush failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_setup_defaults() {
        let setup = GroupSetup::new(3);
        assert_eq!(setup.node_count, 3);
        assert_eq!(setup.name_prefix, "node");
        assert_eq!(setup.location, Location::Any);
        assert_eq!(setup.bootstrap, Bootstrap::None);
        assert!(setup.log_level.is_none());
        assert!(setup.storage_quota.is_none());
    }

    #[test]
    fn group_setup_builder_chains() {
        let setup = GroupSetup::new(2)
            .with_name_prefix("storage")
            .with_bootstrap(Bootstrap::FirstNode)
            .with_log_level(NodeLogLevel::Debug)
            .with_storage_quota(1024);
        assert_eq!(setup.name_prefix, "storage");
        assert_eq!(setup.bootstrap, Bootstrap::FirstNode);
        assert_eq!(setup.log_level, Some(NodeLogLevel::Debug));
        assert_eq!(setup.storage_quota, Some(1024));
    }
}
