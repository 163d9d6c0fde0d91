//! 노드 컨테이너 레시피 -- 환경변수 유도와 포트 할당
//!
//! 노드 기동 환경은 순수 함수로 유도됩니다. 컨테이너 이미지 선택/태깅
//! 정책은 설정에서 넘어온 이미지 참조를 그대로 사용합니다.

use meshtest_core::config::ClusterConfig;
use meshtest_core::{ContainerRecipe, NodeDescriptor, NodePorts, StartupConfig};

use crate::error::ClusterError;

/// 그룹 단위 포트 할당기
///
/// 그룹 번호 × stride 오프셋으로 동시 실행 그룹 간 충돌을 막고,
/// 그룹 내에서는 노드 인덱스로 포트를 구분합니다.
/// 할당 결과는 그룹 전체에서 유일함이 검증됩니다.
#[derive(Debug, Clone)]
pub struct GroupPortAllocator {
    api_base: u16,
    discovery_base: u16,
    listen_base: u16,
    metrics_base: u16,
    stride: u16,
}

impl GroupPortAllocator {
    /// 설정과 그룹 번호로 할당기를 생성합니다.
    pub fn new(config: &ClusterConfig, group_no: u64) -> Result<Self, ClusterError> {
        let offset = u16::try_from(group_no)
            .ok()
            .and_then(|g| g.checked_mul(config.group_port_stride))
            .ok_or_else(|| {
                ClusterError::PortAllocation(format!(
                    "group number {group_no} exceeds the port space for stride {}",
                    config.group_port_stride
                ))
            })?;

        let shift = |base: u16, field: &str| {
            base.checked_add(offset).ok_or_else(|| {
                ClusterError::PortAllocation(format!(
                    "{field} base {base} + offset {offset} overflows u16"
                ))
            })
        };

        Ok(Self {
            api_base: shift(config.api_port_base, "api")?,
            discovery_base: shift(config.discovery_port_base, "discovery")?,
            listen_base: shift(config.listen_port_base, "listen")?,
            metrics_base: shift(config.metrics_port_base, "metrics")?,
            stride: config.group_port_stride,
        })
    }

    /// `count`개 노드의 포트 세트를 할당합니다.
    ///
    /// 그룹 전체에서 포트가 유일하지 않으면 에러입니다 (그룹 불변 조건).
    pub fn allocate(&self, count: usize) -> Result<Vec<NodePorts>, ClusterError> {
        if count > usize::from(self.stride) {
            return Err(ClusterError::PortAllocation(format!(
                "group of {count} nodes exceeds stride {}",
                self.stride
            )));
        }

        let mut ports = Vec::with_capacity(count);
        for i in 0..count {
            // count <= stride, so the index fits in u16
            let i = i as u16;
            let port = |base: u16, field: &str| {
                base.checked_add(i).ok_or_else(|| {
                    ClusterError::PortAllocation(format!(
                        "{field} port {base} + {i} overflows u16"
                    ))
                })
            };
            ports.push(NodePorts {
                api: port(self.api_base, "api")?,
                discovery: port(self.discovery_base, "discovery")?,
                listen: port(self.listen_base, "listen")?,
                metrics: port(self.metrics_base, "metrics")?,
            });
        }

        let mut seen = std::collections::HashSet::new();
        for p in ports.iter().flat_map(|p| p.all()) {
            if !seen.insert(p) {
                return Err(ClusterError::PortAllocation(format!(
                    "port {p} assigned twice within one group (check port bases)"
                )));
            }
        }

        Ok(ports)
    }
}

/// 노드 기동 환경변수를 유도합니다.
///
/// 키 세트와 형식은 노드 이미지의 기동 계약을 따릅니다:
/// `API_PORT`, `DATA_DIR`, `DISC_PORT`, `LISTEN_ADDRS`, 그리고
/// 조건부로 `BOOTSTRAP_SPR`, `LOG_LEVEL`(대문자), `STORAGE_QUOTA`(바이트).
pub fn node_environment(
    descriptor: &NodeDescriptor,
    data_dir_base: &str,
    bootstrap_spr: Option<&str>,
) -> StartupConfig {
    let mut config = StartupConfig::new();

    config.add_env("API_PORT", descriptor.ports.api.to_string());
    config.add_env("DATA_DIR", format!("{data_dir_base}/{}", descriptor.name));
    config.add_env("DISC_PORT", descriptor.ports.discovery.to_string());
    config.add_env(
        "LISTEN_ADDRS",
        format!("/ip4/0.0.0.0/tcp/{}", descriptor.ports.listen),
    );

    if let Some(spr) = bootstrap_spr {
        config.add_env("BOOTSTRAP_SPR", spr);
    }
    if let Some(level) = descriptor.log_level {
        config.add_env("LOG_LEVEL", level.env_value());
    }
    if let Some(quota) = descriptor.storage_quota {
        config.add_env("STORAGE_QUOTA", quota.to_string());
    }

    config
}

/// 노드 컨테이너 레시피를 생성합니다.
pub fn node_recipe(image: &str, name_prefix: &str, ports: &NodePorts) -> ContainerRecipe {
    ContainerRecipe {
        image: image.to_owned(),
        name_prefix: name_prefix.to_owned(),
        exposed_ports: ports.all().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshtest_core::{NodeLogLevel, NodeRole};

    fn descriptor() -> NodeDescriptor {
        NodeDescriptor {
            name: "node-1".to_owned(),
            role: NodeRole::Regular,
            ports: NodePorts {
                api: 30001,
                discovery: 31001,
                listen: 32001,
                metrics: 33001,
            },
            log_level: None,
            storage_quota: None,
        }
    }

    #[test]
    fn environment_has_required_keys_in_order() {
        let env = node_environment(&descriptor(), "/data", None);
        let keys: Vec<&str> = env.env().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["API_PORT", "DATA_DIR", "DISC_PORT", "LISTEN_ADDRS"]);

        assert_eq!(env.get("API_PORT"), Some("30001"));
        assert_eq!(env.get("DATA_DIR"), Some("/data/node-1"));
        assert_eq!(env.get("DISC_PORT"), Some("31001"));
        assert_eq!(env.get("LISTEN_ADDRS"), Some("/ip4/0.0.0.0/tcp/32001"));
    }

    #[test]
    fn bootstrap_spr_present_only_when_given() {
        let without = node_environment(&descriptor(), "/data", None);
        assert_eq!(without.get("BOOTSTRAP_SPR"), None);

        let with = node_environment(&descriptor(), "/data", Some("spr:abc"));
        assert_eq!(with.get("BOOTSTRAP_SPR"), Some("spr:abc"));
    }

    #[test]
    fn log_level_is_uppercased() {
        let mut desc = descriptor();
        desc.log_level = Some(NodeLogLevel::Debug);
        let env = node_environment(&desc, "/data", None);
        assert_eq!(env.get("LOG_LEVEL"), Some("DEBUG"));
    }

    #[test]
    fn storage_quota_is_byte_count() {
        let mut desc = descriptor();
        desc.storage_quota = Some(8 * 1024 * 1024 * 1024);
        let env = node_environment(&desc, "/data", None);
        assert_eq!(env.get("STORAGE_QUOTA"), Some("8589934592"));
    }

    #[test]
    fn allocator_assigns_unique_ports_within_group() {
        let config = ClusterConfig::default();
        let allocator = GroupPortAllocator::new(&config, 0).unwrap();
        let ports = allocator.allocate(5).unwrap();

        let mut all: Vec<u16> = ports.iter().flat_map(|p| p.all()).collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), total);
    }

    #[test]
    fn allocator_offsets_groups_apart() {
        let config = ClusterConfig::default();
        let g0 = GroupPortAllocator::new(&config, 0).unwrap().allocate(3).unwrap();
        let g1 = GroupPortAllocator::new(&config, 1).unwrap().allocate(3).unwrap();

        let overlap = g0
            .iter()
            .flat_map(|p| p.all())
            .any(|p| g1.iter().flat_map(|q| q.all()).any(|q| q == p));
        assert!(!overlap);
    }

    #[test]
    fn allocator_rejects_groups_larger_than_stride() {
        let config = ClusterConfig::default();
        let allocator = GroupPortAllocator::new(&config, 0).unwrap();
        assert!(allocator.allocate(usize::from(config.group_port_stride) + 1).is_err());
    }

    #[test]
    fn port_base_near_u16_max_is_an_error() {
        let config = ClusterConfig {
            api_port_base: 65530,
            ..ClusterConfig::default()
        };
        let allocator = GroupPortAllocator::new(&config, 0).unwrap();

        // 65530 + 5 = 65535까지는 할당 가능
        assert!(allocator.allocate(6).is_ok());
        // 일곱 번째 노드는 u16를 넘으므로 에러
        let err = allocator.allocate(7).unwrap_err();
        assert!(matches!(err, ClusterError::PortAllocation(_)));
    }

    #[test]
    fn colliding_port_bases_are_rejected() {
        let config = ClusterConfig {
            discovery_port_base: ClusterConfig::default().api_port_base,
            ..ClusterConfig::default()
        };
        let allocator = GroupPortAllocator::new(&config, 0).unwrap();
        assert!(allocator.allocate(2).is_err());
    }

    #[test]
    fn recipe_exposes_all_node_ports() {
        let recipe = node_recipe("storagenode:v1", "mesh-0-node", &descriptor().ports);
        assert_eq!(recipe.exposed_ports, vec![30001, 31001, 32001, 33001]);
        assert_eq!(recipe.image, "storagenode:v1");
    }
}
