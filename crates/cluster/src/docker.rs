//! Docker 오케스트레이터 -- core contract의 bollard 구현
//!
//! [`BollardOrchestrator`]는 [`ContainerOrchestrator`] contract을
//! bollard Docker API로 구현합니다. 프로세스가 생성한 모든 컨테이너에
//! 네임스페이스 레이블을 붙여, `delete_all_resources`가 레이블 필터만으로
//! 남은 리소스를 찾아낼 수 있게 합니다.
//!
//! # 네임스페이스 격리
//!
//! ```text
//! 컨테이너 레이블: meshtest.namespace=<namespace>
//! 컨테이너 이름:   <namespace>-<prefix>-<n>   (n은 프로세스 전역 단조 증가)
//! ```

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::StreamExt;
use tracing::{debug, info, warn};

use meshtest_core::{
    ContainerOrchestrator, ContainerRecipe, Location, LogSink, OrchestratorError,
    RunningContainer, StartupConfig,
};

/// 네임스페이스 레이블 키
pub const NAMESPACE_LABEL: &str = "meshtest.namespace";

/// bollard 기반 오케스트레이터
///
/// 내부적으로 `Arc<bollard::Docker>`를 사용하여 tokio 태스크 간
/// 안전하게 공유됩니다. 하나의 인스턴스는 하나의 격리 네임스페이스에
/// 속한 리소스만 관리합니다.
pub struct BollardOrchestrator {
    docker: Arc<bollard::Docker>,
    namespace: String,
    next_container: AtomicU64,
}

impl BollardOrchestrator {
    /// 기본 로컬 소켓으로 Docker에 연결합니다.
    pub fn connect_local(namespace: impl Into<String>) -> Result<Self, OrchestratorError> {
        let docker = bollard::Docker::connect_with_local_defaults().map_err(|e| {
            OrchestratorError::Connection(format!("failed to connect to docker: {e}"))
        })?;
        Ok(Self::with_docker(docker, namespace))
    }

    /// 지정한 소켓 경로로 Docker에 연결합니다.
    pub fn connect_with_socket(
        socket_path: &str,
        namespace: impl Into<String>,
    ) -> Result<Self, OrchestratorError> {
        let docker =
            bollard::Docker::connect_with_socket(socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| {
                    OrchestratorError::Connection(format!(
                        "failed to connect to docker at {socket_path}: {e}"
                    ))
                })?;
        Ok(Self::with_docker(docker, namespace))
    }

    fn with_docker(docker: bollard::Docker, namespace: impl Into<String>) -> Self {
        Self {
            docker: Arc::new(docker),
            namespace: namespace.into(),
            next_container: AtomicU64::new(0),
        }
    }

    /// 이 오케스트레이터의 격리 네임스페이스를 반환합니다.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn label_filter(&self) -> HashMap<String, Vec<String>> {
        let mut filters = HashMap::new();
        filters.insert(
            "label".to_owned(),
            vec![format!("{NAMESPACE_LABEL}={}", self.namespace)],
        );
        filters
    }

    async fn container_address(&self, id: &str) -> Result<IpAddr, OrchestratorError> {
        let details = self
            .docker
            .inspect_container(id, None)
            .await
            .map_err(|e| OrchestratorError::Api(format!("inspect container failed: {e}")))?;

        let ip = details
            .network_settings
            .and_then(|settings| settings.networks)
            .and_then(|networks| {
                networks
                    .into_values()
                    .filter_map(|endpoint| endpoint.ip_address)
                    .find(|ip| !ip.is_empty())
            })
            .ok_or_else(|| {
                OrchestratorError::Api(format!("container {id} has no network address"))
            })?;

        ip.parse::<IpAddr>()
            .map_err(|e| OrchestratorError::Api(format!("invalid container address '{ip}': {e}")))
    }
}

impl ContainerOrchestrator for BollardOrchestrator {
    async fn start(
        &self,
        count: usize,
        location: &Location,
        recipe: &ContainerRecipe,
        config: &StartupConfig,
    ) -> Result<Vec<RunningContainer>, OrchestratorError> {
        use bollard::container::{Config, CreateContainerOptions, StartContainerOptions};

        if !matches!(location, Location::Any) {
            // Docker 백엔드에는 배치 힌트가 없음
            debug!(%location, "placement hint ignored by docker backend");
        }

        let env: Vec<String> = config
            .env()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();

        let exposed_ports: HashMap<String, HashMap<(), ()>> = recipe
            .exposed_ports
            .iter()
            .map(|port| (format!("{port}/tcp"), HashMap::new()))
            .collect();

        let mut labels = HashMap::new();
        labels.insert(NAMESPACE_LABEL.to_owned(), self.namespace.clone());

        let mut started = Vec::with_capacity(count);
        for _ in 0..count {
            let n = self.next_container.fetch_add(1, Ordering::Relaxed);
            let name = format!("{}-{}-{n}", self.namespace, recipe.name_prefix);

            let container_config = Config {
                image: Some(recipe.image.clone()),
                env: Some(env.clone()),
                labels: Some(labels.clone()),
                exposed_ports: Some(exposed_ports.clone()),
                ..Default::default()
            };

            let create = self
                .docker
                .create_container(
                    Some(CreateContainerOptions {
                        name: name.clone(),
                        platform: None,
                    }),
                    container_config,
                )
                .await
                .map_err(|e| {
                    OrchestratorError::Api(format!("create container '{name}' failed: {e}"))
                })?;

            self.docker
                .start_container(&create.id, None::<StartContainerOptions<String>>)
                .await
                .map_err(|e| {
                    OrchestratorError::Api(format!("start container '{name}' failed: {e}"))
                })?;

            let address = self.container_address(&create.id).await?;

            info!(container = %name, %address, "container started");
            started.push(RunningContainer {
                id: create.id,
                name,
                address,
                namespace: self.namespace.clone(),
            });
        }

        Ok(started)
    }

    async fn stop(&self, container: &RunningContainer) -> Result<(), OrchestratorError> {
        use bollard::container::StopContainerOptions;

        self.docker
            .stop_container(&container.id, Some(StopContainerOptions { t: 10 }))
            .await
            .map_err(|e| {
                if e.to_string().contains("404") {
                    OrchestratorError::NotFound(container.name.clone())
                } else {
                    OrchestratorError::Api(format!("stop container '{}' failed: {e}", container.name))
                }
            })
    }

    async fn download_log(
        &self,
        container: &RunningContainer,
        sink: &mut dyn LogSink,
    ) -> Result<(), OrchestratorError> {
        use bollard::container::LogsOptions;

        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            follow: false,
            tail: "all".to_owned(),
            ..Default::default()
        };

        let mut stream = self.docker.logs(&container.id, Some(options));
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                OrchestratorError::Api(format!("log read from '{}' failed: {e}", container.name))
            })?;
            let text = String::from_utf8_lossy(&chunk.into_bytes()).into_owned();
            for line in text.lines() {
                sink.write_line(line)?;
            }
        }

        Ok(())
    }

    async fn delete_all_resources(&self) -> Result<(), OrchestratorError> {
        use bollard::container::{ListContainersOptions, RemoveContainerOptions, StopContainerOptions};

        let options = ListContainersOptions::<String> {
            all: true, // 정지된 컨테이너도 정리 대상
            filters: self.label_filter(),
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| OrchestratorError::Api(format!("list containers failed: {e}")))?;

        info!(
            namespace = %self.namespace,
            count = containers.len(),
            "deleting all namespace resources"
        );

        // 최선 노력 정리: 개별 실패는 기록만 하고 계속 진행
        for container in containers {
            let Some(id) = container.id else { continue };

            if let Err(e) = self
                .docker
                .stop_container(&id, Some(StopContainerOptions { t: 10 }))
                .await
            {
                debug!(container = %id, error = %e, "stop during cleanup failed");
            }

            if let Err(e) = self
                .docker
                .remove_container(
                    &id,
                    Some(RemoveContainerOptions {
                        force: true,
                        v: true,
                        ..Default::default()
                    }),
                )
                .await
            {
                warn!(container = %id, error = %e, "remove during cleanup failed");
            }
        }

        Ok(())
    }
}
