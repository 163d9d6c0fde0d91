//! 설정 관리 -- meshtest.toml 파싱 및 런타임 설정
//!
//! [`MeshtestConfig`]는 하니스 전체의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`MESHTEST_CLUSTER_NODE_IMAGE=...` 형식)
//! 3. 설정 파일 (`meshtest.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! 설정 에러는 치명적이며, 어떤 테스트 루프도 시작되기 전에
//! 프로세스를 중단시킵니다.
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), meshtest_core::error::MeshtestError> {
//! use meshtest_core::config::MeshtestConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = MeshtestConfig::load("meshtest.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = MeshtestConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, MeshtestError};

/// Meshtest 통합 설정
///
/// `meshtest.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshtestConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 노드 그룹/클러스터 설정
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// 수렴 검증 설정
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
    /// 노드 메트릭 수집 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// 테스트 스케줄러 설정
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl MeshtestConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, MeshtestError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, MeshtestError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MeshtestError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                MeshtestError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, MeshtestError> {
        toml::from_str(toml_str).map_err(|e| {
            MeshtestError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `MESHTEST_{SECTION}_{FIELD}`
    /// 예: `MESHTEST_CLUSTER_NODE_IMAGE=storagenode:v1.2`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "MESHTEST_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "MESHTEST_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.log_path, "MESHTEST_GENERAL_LOG_PATH");
        override_string(&mut self.general.data_dir, "MESHTEST_GENERAL_DATA_DIR");

        // Cluster
        override_string(
            &mut self.cluster.docker_socket,
            "MESHTEST_CLUSTER_DOCKER_SOCKET",
        );
        override_string(&mut self.cluster.namespace, "MESHTEST_CLUSTER_NAMESPACE");
        override_string(&mut self.cluster.node_image, "MESHTEST_CLUSTER_NODE_IMAGE");
        override_u16(
            &mut self.cluster.api_port_base,
            "MESHTEST_CLUSTER_API_PORT_BASE",
        );
        override_u16(
            &mut self.cluster.discovery_port_base,
            "MESHTEST_CLUSTER_DISCOVERY_PORT_BASE",
        );
        override_u16(
            &mut self.cluster.listen_port_base,
            "MESHTEST_CLUSTER_LISTEN_PORT_BASE",
        );
        override_u16(
            &mut self.cluster.metrics_port_base,
            "MESHTEST_CLUSTER_METRICS_PORT_BASE",
        );
        override_u16(
            &mut self.cluster.group_port_stride,
            "MESHTEST_CLUSTER_GROUP_PORT_STRIDE",
        );
        override_u64(
            &mut self.cluster.startup_timeout_secs,
            "MESHTEST_CLUSTER_STARTUP_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.cluster.ready_poll_interval_secs,
            "MESHTEST_CLUSTER_READY_POLL_INTERVAL_SECS",
        );

        // Connectivity
        override_u64(
            &mut self.connectivity.poll_interval_secs,
            "MESHTEST_CONNECTIVITY_POLL_INTERVAL_SECS",
        );
        override_u64(
            &mut self.connectivity.timeout_secs,
            "MESHTEST_CONNECTIVITY_TIMEOUT_SECS",
        );

        // Metrics
        override_string(
            &mut self.metrics.prometheus_image,
            "MESHTEST_METRICS_PROMETHEUS_IMAGE",
        );
        override_u64(
            &mut self.metrics.scrape_interval_secs,
            "MESHTEST_METRICS_SCRAPE_INTERVAL_SECS",
        );
        override_u64(
            &mut self.metrics.scrape_timeout_secs,
            "MESHTEST_METRICS_SCRAPE_TIMEOUT_SECS",
        );
        override_u16(&mut self.metrics.api_port, "MESHTEST_METRICS_API_PORT");

        // Scheduler
        override_bool(
            &mut self.scheduler.download_container_logs,
            "MESHTEST_SCHEDULER_DOWNLOAD_CONTAINER_LOGS",
        );
        override_u64(
            &mut self.scheduler.log_download_interval_secs,
            "MESHTEST_SCHEDULER_LOG_DOWNLOAD_INTERVAL_SECS",
        );
        override_u64(
            &mut self.scheduler.stagger_secs,
            "MESHTEST_SCHEDULER_STAGGER_SECS",
        );
        override_bool(
            &mut self.scheduler.self_metrics_enabled,
            "MESHTEST_SCHEDULER_SELF_METRICS_ENABLED",
        );
        override_u16(
            &mut self.scheduler.self_metrics_port,
            "MESHTEST_SCHEDULER_SELF_METRICS_PORT",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), MeshtestError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.cluster.namespace.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "cluster.namespace".to_owned(),
                reason: "namespace must not be empty".to_owned(),
            }
            .into());
        }

        if self.cluster.node_image.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "cluster.node_image".to_owned(),
                reason: "node image must not be empty".to_owned(),
            }
            .into());
        }

        if self.cluster.group_port_stride == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cluster.group_port_stride".to_owned(),
                reason: "stride must be positive".to_owned(),
            }
            .into());
        }

        if self.cluster.startup_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cluster.startup_timeout_secs".to_owned(),
                reason: "timeout must be positive".to_owned(),
            }
            .into());
        }

        if self.cluster.ready_poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cluster.ready_poll_interval_secs".to_owned(),
                reason: "poll interval must be positive".to_owned(),
            }
            .into());
        }

        // 수렴 검증은 비동기이므로 폴링 간격과 전체 타임아웃이 모두 필요
        if self.connectivity.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "connectivity.poll_interval_secs".to_owned(),
                reason: "poll interval must be positive".to_owned(),
            }
            .into());
        }

        if self.connectivity.timeout_secs < self.connectivity.poll_interval_secs {
            return Err(ConfigError::InvalidValue {
                field: "connectivity.timeout_secs".to_owned(),
                reason: "timeout must be at least one poll interval".to_owned(),
            }
            .into());
        }

        if self.metrics.scrape_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "metrics.scrape_interval_secs".to_owned(),
                reason: "scrape interval must be positive".to_owned(),
            }
            .into());
        }

        if self.scheduler.download_container_logs
            && self.scheduler.log_download_interval_secs == 0
        {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.log_download_interval_secs".to_owned(),
                reason: "download interval must be positive when downloads are enabled".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

// Default는 derive 매크로로 자동 생성 (각 필드가 Default를 구현하므로)

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 하니스 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 하니스 로그 형식 (json, pretty)
    pub log_format: String,
    /// 로그/아티팩트 출력 디렉토리
    pub log_path: String,
    /// 노드 컨테이너 데이터 디렉토리 prefix
    pub data_dir: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            log_path: "/var/lib/meshtest/logs".to_owned(),
            data_dir: "/data".to_owned(),
        }
    }
}

/// 노드 그룹/클러스터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Docker 소켓 경로
    pub docker_socket: String,
    /// 기본 격리 네임스페이스 (컨테이너 레이블 값)
    pub namespace: String,
    /// 스토리지 노드 이미지 참조
    pub node_image: String,
    /// API 포트 할당 시작점
    pub api_port_base: u16,
    /// 디스커버리 포트 할당 시작점
    pub discovery_port_base: u16,
    /// 리슨 포트 할당 시작점
    pub listen_port_base: u16,
    /// 메트릭 포트 할당 시작점
    pub metrics_port_base: u16,
    /// 그룹 번호당 포트 오프셋 (동시 실행 그룹 간 충돌 방지)
    pub group_port_stride: u16,
    /// 그룹 전체 준비 대기 한도 (초)
    pub startup_timeout_secs: u64,
    /// 준비 상태 폴링 간격 (초)
    pub ready_poll_interval_secs: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            docker_socket: "/var/run/docker.sock".to_owned(),
            namespace: "meshtest".to_owned(),
            node_image: "storagenode:latest".to_owned(),
            api_port_base: 30000,
            discovery_port_base: 31000,
            listen_port_base: 32000,
            metrics_port_base: 33000,
            group_port_stride: 20,
            startup_timeout_secs: 120,
            ready_poll_interval_secs: 2,
        }
    }
}

/// 수렴 검증 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// 검증 시도 간격 (초)
    pub poll_interval_secs: u64,
    /// 전체 수렴 대기 한도 (초)
    pub timeout_secs: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 2,
            timeout_secs: 30,
        }
    }
}

/// 노드 메트릭 수집 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus 컨테이너 이미지
    pub prometheus_image: String,
    /// 스크레이프 간격 (초)
    pub scrape_interval_secs: u64,
    /// 스크레이프 타임아웃 (초)
    pub scrape_timeout_secs: u64,
    /// Prometheus 질의 API 포트
    pub api_port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            prometheus_image: "prom/prometheus:v2.53.0".to_owned(),
            scrape_interval_secs: 30,
            scrape_timeout_secs: 10,
            api_port: 9090,
        }
    }
}

/// 테스트 스케줄러 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// 백그라운드 컨테이너 로그 다운로더 활성화
    pub download_container_logs: bool,
    /// 로그 다운로드 주기 (초)
    pub log_download_interval_secs: u64,
    /// 테스트 루프 기동 간 지연 (초) -- 공유 인프라 부하 분산
    pub stagger_secs: u64,
    /// 러너 자체 메트릭 엔드포인트 활성화
    pub self_metrics_enabled: bool,
    /// 러너 자체 메트릭 포트
    pub self_metrics_port: u16,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            download_container_logs: false,
            log_download_interval_secs: 60,
            stagger_secs: 5,
            self_metrics_enabled: false,
            self_metrics_port: 9464,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
