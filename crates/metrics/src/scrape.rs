//! 스크레이프 설정 -- Prometheus 설정 렌더링
//!
//! 수집기 컨테이너는 설정 파일을 마운트하지 않고 base64로 인코딩된
//! 설정 전체를 환경변수로 받습니다. 타깃이 없는 설정도 유효합니다
//! (빈 그룹을 관찰하는 수집기).

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use meshtest_core::config::MetricsConfig;

/// 단일 수집기의 스크레이프 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeConfig {
    scrape_interval_secs: u64,
    scrape_timeout_secs: u64,
    targets: Vec<String>,
}

impl ScrapeConfig {
    /// 설정과 타깃 목록(`ip:port` 형식)으로 생성합니다.
    pub fn new(config: &MetricsConfig, targets: Vec<String>) -> Self {
        Self {
            scrape_interval_secs: config.scrape_interval_secs,
            scrape_timeout_secs: config.scrape_timeout_secs,
            targets,
        }
    }

    /// 타깃 목록
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Prometheus 설정 YAML을 렌더링합니다.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("global:\n");
        out.push_str(&format!(
            "  scrape_interval: {}s\n",
            self.scrape_interval_secs
        ));
        out.push_str(&format!(
            "  scrape_timeout: {}s\n",
            self.scrape_timeout_secs
        ));
        out.push_str("scrape_configs:\n");
        out.push_str("  - job_name: \"storage-nodes\"\n");
        out.push_str("    static_configs:\n");
        out.push_str("      - targets:\n");
        for target in &self.targets {
            out.push_str(&format!("          - \"{target}\"\n"));
        }
        out
    }

    /// 렌더링된 설정의 base64 인코딩
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.render())
    }
}

/// 노드 주소와 메트릭 포트로 스크레이프 타깃을 만듭니다.
pub fn scrape_target(address: std::net::IpAddr, metrics_port: u16) -> String {
    format!("{address}:{metrics_port}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn rendered_config_lists_every_target() {
        let config = ScrapeConfig::new(
            &MetricsConfig::default(),
            vec!["10.0.0.2:33000".into(), "10.0.0.3:33000".into()],
        );
        let yaml = config.render();

        assert!(yaml.contains("scrape_interval: 30s"));
        assert!(yaml.contains("scrape_timeout: 10s"));
        assert!(yaml.contains("- \"10.0.0.2:33000\""));
        assert!(yaml.contains("- \"10.0.0.3:33000\""));
    }

    #[test]
    fn zero_target_config_is_valid() {
        let config = ScrapeConfig::new(&MetricsConfig::default(), vec![]);
        let yaml = config.render();
        assert!(yaml.contains("targets:"));
        assert!(!config.to_base64().is_empty());
    }

    #[test]
    fn base64_blob_decodes_to_rendered_yaml() {
        let config = ScrapeConfig::new(&MetricsConfig::default(), vec!["10.0.0.2:33000".into()]);
        let decoded = STANDARD.decode(config.to_base64()).unwrap();
        assert_eq!(decoded, config.render().into_bytes());
    }

    #[test]
    fn target_formats_address_and_port() {
        let target = scrape_target(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)), 33005);
        assert_eq!(target, "10.0.0.7:33005");
    }
}
