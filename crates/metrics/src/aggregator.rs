//! 메트릭 수집기 -- Prometheus 사이드카 컨테이너 관리
//!
//! [`MetricsAggregator`]는 노드 집합마다 전용 Prometheus 컨테이너를
//! 기동합니다. 인스턴스 번호는 `AtomicU64`로 단조 증가하여 같은
//! 프로세스에서 띄운 수집기 이름이 절대 겹치지 않습니다.

use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use meshtest_core::config::MetricsConfig;
use meshtest_core::{
    ContainerOrchestrator, ContainerRecipe, Location, LogSink, RunningContainer, StartupConfig,
};

use crate::error::MetricsError;
use crate::query::MetricsQuery;
use crate::scrape::{scrape_target, ScrapeConfig};

/// base64 스크레이프 설정이 들어가는 환경변수
pub const CONFIG_ENV: &str = "PROMETHEUS_CONFIG";

/// 스크레이프 대상 노드
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetNode {
    /// 노드 이름 (아티팩트 라벨용)
    pub name: String,
    /// 컨테이너 네트워크 주소
    pub address: IpAddr,
    /// 노드 메트릭 포트
    pub metrics_port: u16,
}

/// 기동된 수집기 핸들
#[derive(Debug, Clone)]
pub struct MetricsHandle {
    /// 수집기 인스턴스 번호
    pub instance_no: u64,
    /// Prometheus 컨테이너
    pub container: RunningContainer,
    /// 이 수집기가 관찰하는 노드들
    pub targets: Vec<TargetNode>,
}

/// 수집기 컨테이너 생명주기 관리자
pub struct MetricsAggregator<O> {
    config: MetricsConfig,
    orchestrator: Arc<O>,
    next_instance: AtomicU64,
    running: Mutex<Vec<MetricsHandle>>,
}

impl<O: ContainerOrchestrator> MetricsAggregator<O> {
    pub fn new(config: MetricsConfig, orchestrator: Arc<O>) -> Self {
        Self {
            config,
            orchestrator,
            next_instance: AtomicU64::new(0),
            running: Mutex::new(Vec::new()),
        }
    }

    /// 주어진 노드 집합을 관찰하는 수집기를 기동합니다.
    ///
    /// 빈 집합도 유효합니다 (타깃 없는 수집기).
    pub async fn begin_collecting_for(
        &self,
        targets: &[TargetNode],
    ) -> Result<MetricsHandle, MetricsError> {
        let instance_no = self.next_instance.fetch_add(1, Ordering::SeqCst);

        let scrape = ScrapeConfig::new(
            &self.config,
            targets
                .iter()
                .map(|t| scrape_target(t.address, t.metrics_port))
                .collect(),
        );

        let recipe = ContainerRecipe {
            image: self.config.prometheus_image.clone(),
            name_prefix: format!("prometheus-{instance_no}"),
            exposed_ports: vec![self.config.api_port],
        };

        let mut env = StartupConfig::new();
        env.add_env(CONFIG_ENV, scrape.to_base64());

        let containers = self
            .orchestrator
            .start(1, &Location::Any, &recipe, &env)
            .await?;
        let container = containers.into_iter().next().ok_or_else(|| {
            MetricsError::Query(format!(
                "orchestrator returned no container for collector {instance_no}"
            ))
        })?;

        info!(
            instance = instance_no,
            container = %container.name,
            targets = targets.len(),
            "metrics collector started"
        );

        let handle = MetricsHandle {
            instance_no,
            container,
            targets: targets.to_vec(),
        };
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(handle.clone());
        Ok(handle)
    }

    /// 현재 실행 중인 수집기들의 스냅샷
    pub fn handles(&self) -> Vec<MetricsHandle> {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// 모든 수집기가 관찰한 시계열을 싱크로 내려받습니다.
    ///
    /// 노드별로 `# node <name>` 헤더를 쓰고 그 아래에 시계열을
    /// 한 줄씩 기록합니다.
    pub async fn download_all_metrics(
        &self,
        query: &MetricsQuery,
        sink: &mut dyn LogSink,
    ) -> Result<(), MetricsError> {
        for handle in self.handles() {
            let endpoint = format!(
                "http://{}:{}",
                handle.container.address, self.config.api_port
            );
            for target in &handle.targets {
                sink.write_line(&format!("# node {}", target.name))?;
                let instance = scrape_target(target.address, target.metrics_port);
                let series = query.series_for_instance(&endpoint, &instance).await?;
                for line in series {
                    sink.write_line(&line)?;
                }
            }
        }
        Ok(())
    }

    /// 수집기 하나를 정지하고 레지스트리에서 내립니다.
    pub async fn stop(&self, handle: &MetricsHandle) -> Result<(), MetricsError> {
        {
            let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
            running.retain(|h| h.instance_no != handle.instance_no);
        }
        self.orchestrator.stop(&handle.container).await?;
        Ok(())
    }

    /// 모든 수집기 컨테이너를 최선 노력으로 정지합니다.
    pub async fn stop_all(&self) {
        let handles = {
            let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *running)
        };

        for handle in handles {
            if let Err(e) = self.orchestrator.stop(&handle.container).await {
                warn!(
                    instance = handle.instance_no,
                    container = %handle.container.name,
                    error = %e,
                    "collector stop failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::Ipv4Addr;
    use std::sync::atomic::AtomicU8;

    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;

    use meshtest_core::OrchestratorError;

    #[derive(Default)]
    struct MockOrchestrator {
        next_ip: AtomicU8,
        started: Mutex<Vec<(String, StartupConfig)>>,
        stopped: Mutex<Vec<String>>,
    }

    impl ContainerOrchestrator for MockOrchestrator {
        async fn start(
            &self,
            count: usize,
            _location: &Location,
            recipe: &ContainerRecipe,
            config: &StartupConfig,
        ) -> Result<Vec<RunningContainer>, OrchestratorError> {
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                let n = self.next_ip.fetch_add(1, Ordering::SeqCst);
                let name = format!("mock-{}", recipe.name_prefix);
                self.started
                    .lock()
                    .unwrap()
                    .push((name.clone(), config.clone()));
                out.push(RunningContainer {
                    id: format!("id-{n}"),
                    name,
                    address: IpAddr::V4(Ipv4Addr::new(10, 1, 0, 2 + n)),
                    namespace: "test".to_owned(),
                });
            }
            Ok(out)
        }

        async fn stop(&self, container: &RunningContainer) -> Result<(), OrchestratorError> {
            self.stopped.lock().unwrap().push(container.name.clone());
            Ok(())
        }

        async fn download_log(
            &self,
            _container: &RunningContainer,
            _sink: &mut dyn LogSink,
        ) -> Result<(), OrchestratorError> {
            Ok(())
        }

        async fn delete_all_resources(&self) -> Result<(), OrchestratorError> {
            Ok(())
        }
    }

    fn target(name: &str, last_octet: u8) -> TargetNode {
        TargetNode {
            name: name.to_owned(),
            address: IpAddr::V4(Ipv4Addr::new(10, 0, 0, last_octet)),
            metrics_port: 33000,
        }
    }

    #[tokio::test]
    async fn instance_numbers_are_monotonic() {
        let orchestrator = Arc::new(MockOrchestrator::default());
        let aggregator = MetricsAggregator::new(MetricsConfig::default(), orchestrator);

        let first = aggregator
            .begin_collecting_for(&[target("a", 2)])
            .await
            .unwrap();
        let second = aggregator
            .begin_collecting_for(&[target("b", 3)])
            .await
            .unwrap();

        assert_eq!(first.instance_no, 0);
        assert_eq!(second.instance_no, 1);
        assert_eq!(aggregator.handles().len(), 2);
    }

    #[tokio::test]
    async fn collector_receives_base64_scrape_config() {
        let orchestrator = Arc::new(MockOrchestrator::default());
        let aggregator =
            MetricsAggregator::new(MetricsConfig::default(), Arc::clone(&orchestrator));

        aggregator
            .begin_collecting_for(&[target("a", 2), target("b", 3)])
            .await
            .unwrap();

        let started = orchestrator.started.lock().unwrap();
        let blob = started[0].1.get(CONFIG_ENV).unwrap();
        let yaml = String::from_utf8(STANDARD.decode(blob).unwrap()).unwrap();
        assert!(yaml.contains("10.0.0.2:33000"));
        assert!(yaml.contains("10.0.0.3:33000"));
    }

    #[tokio::test]
    async fn empty_target_set_is_accepted() {
        let orchestrator = Arc::new(MockOrchestrator::default());
        let aggregator = MetricsAggregator::new(MetricsConfig::default(), orchestrator);

        let handle = aggregator.begin_collecting_for(&[]).await.unwrap();
        assert!(handle.targets.is_empty());
    }

    #[tokio::test]
    async fn stop_all_stops_every_collector() {
        let orchestrator = Arc::new(MockOrchestrator::default());
        let aggregator =
            MetricsAggregator::new(MetricsConfig::default(), Arc::clone(&orchestrator));

        aggregator.begin_collecting_for(&[]).await.unwrap();
        aggregator.begin_collecting_for(&[]).await.unwrap();
        aggregator.stop_all().await;

        assert_eq!(orchestrator.stopped.lock().unwrap().len(), 2);
        assert!(aggregator.handles().is_empty());
    }
}
