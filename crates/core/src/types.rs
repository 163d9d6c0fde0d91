//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 노드 기술자, 생명주기 단계, 피어 테이블 등
//! 모든 모듈이 공유하는 데이터 구조를 정의합니다.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// 노드 역할
///
/// 부트스트랩 노드는 그룹의 다른 노드들이 오버레이에 합류할 때
/// 사용하는 진입점입니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    /// 오버레이 진입점 노드
    Bootstrap,
    /// 일반 스토리지 노드
    #[default]
    Regular,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bootstrap => write!(f, "bootstrap"),
            Self::Regular => write!(f, "regular"),
        }
    }
}

/// 노드 프로세스 로그 레벨
///
/// 컨테이너 환경변수 `LOG_LEVEL`로 전달됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeLogLevel {
    /// 최대 상세
    Trace,
    /// 디버그
    Debug,
    /// 일반
    Info,
    /// 경고
    Warn,
    /// 에러만
    Error,
}

impl NodeLogLevel {
    /// `LOG_LEVEL` 환경변수 값을 반환합니다 (대문자).
    pub fn env_value(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for NodeLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.env_value().to_ascii_lowercase())
    }
}

/// 노드별 포트 세트
///
/// 한 그룹 내에서 모든 포트는 유일해야 합니다.
/// 할당은 `meshtest-cluster`의 포트 할당기가 담당합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePorts {
    /// 노드 REST API 포트
    pub api: u16,
    /// 피어 디스커버리 포트
    pub discovery: u16,
    /// libp2p 리슨 포트
    pub listen: u16,
    /// Prometheus 스크레이프 포트
    pub metrics: u16,
}

impl NodePorts {
    /// 네 포트를 배열로 반환합니다. 유일성 검증에 사용합니다.
    pub fn all(&self) -> [u16; 4] {
        [self.api, self.discovery, self.listen, self.metrics]
    }
}

/// 노드 기술자
///
/// 컨테이너가 시작되면 더 이상 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// 노드 이름 (그룹 내 유일)
    pub name: String,
    /// 역할
    pub role: NodeRole,
    /// 포트 세트
    pub ports: NodePorts,
    /// 노드 프로세스 로그 레벨 (설정된 경우에만 환경변수로 전달)
    pub log_level: Option<NodeLogLevel>,
    /// 스토리지 쿼터 (바이트, 설정된 경우에만 환경변수로 전달)
    pub storage_quota: Option<u64>,
}

/// 노드 생명주기 단계
///
/// 상태 전환: `Configured` → `started()` → `Live`
///
/// 오프라인/온라인 노드를 별도 타입 계층으로 나누는 대신,
/// 하나의 불변 기술자에 단계 태그를 붙입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodePhase {
    /// 설정만 완료, 컨테이너 미기동
    Configured,
    /// 컨테이너 기동 완료, 주소 확보
    Live {
        /// 컨테이너 네트워크 주소
        address: IpAddr,
    },
}

/// 생명주기 단계가 붙은 노드 값
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// 불변 기술자
    pub descriptor: NodeDescriptor,
    /// 현재 생명주기 단계
    pub phase: NodePhase,
}

impl Node {
    /// 설정 단계의 노드를 생성합니다.
    pub fn configured(descriptor: NodeDescriptor) -> Self {
        Self {
            descriptor,
            phase: NodePhase::Configured,
        }
    }

    /// 컨테이너 기동 후의 순수 상태 전환 함수입니다.
    ///
    /// 기술자는 그대로 유지되고 단계만 `Live`로 바뀝니다.
    pub fn started(self, address: IpAddr) -> Self {
        Self {
            descriptor: self.descriptor,
            phase: NodePhase::Live { address },
        }
    }

    /// `Live` 단계의 주소를 반환합니다.
    pub fn address(&self) -> Option<IpAddr> {
        match &self.phase {
            NodePhase::Configured => None,
            NodePhase::Live { address } => Some(*address),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.phase {
            NodePhase::Configured => {
                write!(f, "{} ({}, configured)", self.descriptor.name, self.descriptor.role)
            }
            NodePhase::Live { address } => {
                write!(f, "{} ({}, {})", self.descriptor.name, self.descriptor.role, address)
            }
        }
    }
}

/// 피어 테이블 엔트리 -- 피어 id와 광고된 주소 쌍
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerEntry {
    /// 피어 id
    #[serde(rename = "peerId")]
    pub peer_id: String,
    /// 광고된 주소 (`ip:port` 형식)
    pub address: String,
}

/// 노드가 자기 보고하는 피어 테이블
///
/// 매 검증 시도마다 새로 조회하며, 보존하지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRecord {
    /// 노드 자신의 id와 주소
    #[serde(rename = "localNode")]
    pub local: PeerEntry,
    /// 현재 알고 있는 피어 목록
    #[serde(rename = "nodes")]
    pub peers: Vec<PeerEntry>,
}

/// 순서쌍 (A,B)의 연결 상태
///
/// A에게 B의 id를 직접 질의한 결과입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairState {
    /// 피어 id와 주소가 모두 확인됨
    Connection,
    /// B를 전혀 모름
    NoConnection,
    /// 응답이 부분적 (디스커버리 진행 중 등 일시적 상태)
    Unknown,
}

impl fmt::Display for PairState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => write!(f, "connection"),
            Self::NoConnection => write!(f, "no-connection"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}
