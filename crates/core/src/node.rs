//! 노드 디버그 API contract -- 준비 상태 확인과 피어 테이블 조회
//!
//! [`NodeApi`] trait은 스토리지 노드의 HTTP 디버그 엔드포인트를 추상화합니다.
//! 운영 구현은 `meshtest-cluster`의 `HttpNodeApi`이고,
//! 테스트는 스크립트된 mock 구현을 사용합니다.
//!
//! 노드의 준비 상태(readiness)는 [`NodeApi::debug_info`] 호출의
//! 성공 여부로 판단합니다.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::NodeApiError;
use crate::types::PeerRecord;

/// `GET /api/v1/debug/info` 응답
///
/// `spr`(signed peer record)은 부트스트랩 식별자로,
/// 합류하는 노드의 `BOOTSTRAP_SPR` 환경변수에 들어갑니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugInfo {
    /// 노드 자신의 피어 id
    #[serde(rename = "id")]
    pub peer_id: String,
    /// 서명된 피어 레코드 (불투명 문자열)
    pub spr: String,
    /// 광고 중인 주소 목록
    #[serde(default)]
    pub addrs: Vec<String>,
}

/// `GET /api/v1/debug/peer/{id}` 응답
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugPeer {
    /// 피어를 알고 있는지 여부
    #[serde(rename = "isFound")]
    pub found: bool,
    /// 보고된 피어 id (모르는 피어면 빈 문자열일 수 있음)
    #[serde(rename = "peerId", default)]
    pub peer_id: String,
    /// 보고된 주소 목록
    #[serde(default)]
    pub addresses: Vec<String>,
}

/// 노드 디버그 엔드포인트 추상화
///
/// 모든 메서드는 네트워크 왕복이며, 실패는 [`NodeApiError`]로 보고됩니다.
/// 수렴 검증 중의 실패는 호출자가 일시적 상태로 취급합니다.
pub trait NodeApi: Send + Sync {
    /// 노드 자신의 디버그 정보를 조회합니다.
    ///
    /// 성공하면 노드가 준비된 것으로 간주합니다.
    fn debug_info(&self) -> impl Future<Output = Result<DebugInfo, NodeApiError>> + Send;

    /// 특정 피어 id에 대한 이 노드의 지식을 직접 질의합니다.
    fn debug_peer(
        &self,
        peer_id: &str,
    ) -> impl Future<Output = Result<DebugPeer, NodeApiError>> + Send;

    /// 현재 피어 테이블 전체를 조회합니다.
    fn peer_table(&self) -> impl Future<Output = Result<PeerRecord, NodeApiError>> + Send;
}
