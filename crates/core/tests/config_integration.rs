//! 설정 통합 테스트 -- 파일 로드, 환경변수 오버라이드, 검증 경로
//!
//! 환경변수를 조작하는 테스트는 `serial_test`로 직렬화합니다.

use meshtest_core::config::MeshtestConfig;
use meshtest_core::error::{ConfigError, MeshtestError};
use serial_test::serial;

fn write_config(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("meshtest.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn load_missing_file_reports_file_not_found() {
    let err = MeshtestConfig::from_file("/nonexistent/meshtest.toml")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MeshtestError::Config(ConfigError::FileNotFound { .. })
    ));
}

#[tokio::test]
async fn load_valid_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[general]
log_level = "debug"
log_format = "pretty"

[cluster]
namespace = "ci-mesh"
node_image = "storagenode:v1.0"
startup_timeout_secs = 60

[connectivity]
poll_interval_secs = 1
timeout_secs = 10
"#,
    );

    let config = MeshtestConfig::from_file(&path).await.unwrap();
    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.cluster.namespace, "ci-mesh");
    assert_eq!(config.cluster.startup_timeout_secs, 60);
    assert_eq!(config.connectivity.timeout_secs, 10);
}

#[tokio::test]
async fn load_invalid_file_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[cluster]\nnode_image = \"\"");

    let err = MeshtestConfig::from_file(&path).await.unwrap_err();
    assert!(matches!(
        err,
        MeshtestError::Config(ConfigError::InvalidValue { .. })
    ));
}

#[tokio::test]
async fn load_broken_toml_reports_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[cluster\nnode_image =");

    let err = MeshtestConfig::from_file(&path).await.unwrap_err();
    assert!(matches!(
        err,
        MeshtestError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
#[serial]
fn env_override_replaces_file_value() {
    // SAFETY: serial 실행이므로 다른 테스트와 환경변수가 겹치지 않음
    unsafe {
        std::env::set_var("MESHTEST_CLUSTER_NODE_IMAGE", "storagenode:env");
        std::env::set_var("MESHTEST_CONNECTIVITY_TIMEOUT_SECS", "45");
    }

    let mut config = MeshtestConfig::parse("[cluster]\nnode_image = \"storagenode:file\"").unwrap();
    config.apply_env_overrides();

    assert_eq!(config.cluster.node_image, "storagenode:env");
    assert_eq!(config.connectivity.timeout_secs, 45);

    unsafe {
        std::env::remove_var("MESHTEST_CLUSTER_NODE_IMAGE");
        std::env::remove_var("MESHTEST_CONNECTIVITY_TIMEOUT_SECS");
    }
}

#[test]
#[serial]
fn env_override_ignores_unparseable_numbers() {
    unsafe {
        std::env::set_var("MESHTEST_METRICS_API_PORT", "not-a-port");
    }

    let mut config = MeshtestConfig::default();
    config.apply_env_overrides();

    // 파싱 실패는 무시되고 기본값이 유지됨
    assert_eq!(config.metrics.api_port, 9090);

    unsafe {
        std::env::remove_var("MESHTEST_METRICS_API_PORT");
    }
}

#[test]
#[serial]
fn env_override_bool_flag() {
    unsafe {
        std::env::set_var("MESHTEST_SCHEDULER_DOWNLOAD_CONTAINER_LOGS", "true");
    }

    let mut config = MeshtestConfig::default();
    config.apply_env_overrides();
    assert!(config.scheduler.download_container_logs);

    unsafe {
        std::env::remove_var("MESHTEST_SCHEDULER_DOWNLOAD_CONTAINER_LOGS");
    }
}
