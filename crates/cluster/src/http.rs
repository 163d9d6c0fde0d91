//! 노드 디버그 API -- reqwest 구현
//!
//! 각 스토리지 노드는 컨테이너 내부 주소에 디버그 HTTP API를 노출합니다.
//! [`HttpNodeApi`]는 core의 [`NodeApi`] contract을 그 API에 연결합니다.
//!
//! 엔드포인트:
//!
//! ```text
//! GET /api/v1/debug/info         노드 자기 기술 (peer id, spr, 주소)
//! GET /api/v1/debug/peer/{id}    특정 피어에 대한 연결 시도 결과
//! GET /api/v1/debug/table        라우팅 테이블 스냅샷
//! ```

use std::net::IpAddr;
use std::time::Duration;

use serde::de::DeserializeOwned;

use meshtest_core::{DebugInfo, DebugPeer, NodeApi, NodeApiError, PeerRecord};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// 노드 주소로부터 [`NodeApi`] 클라이언트를 만들어내는 팩토리
///
/// 그룹 기동 로직이 구체적인 HTTP 스택과 분리되도록 하는 seam입니다.
/// 테스트에서는 mock provider로 대체합니다.
pub trait NodeApiProvider: Send + Sync + 'static {
    /// 생성되는 클라이언트 타입
    type Api: NodeApi + 'static;

    /// 주어진 컨테이너 주소와 API 포트에 대한 클라이언트를 반환합니다.
    fn api_for(&self, address: IpAddr, api_port: u16) -> Self::Api;
}

/// reqwest 클라이언트를 공유하는 기본 provider
#[derive(Debug, Clone)]
pub struct HttpApiProvider {
    client: reqwest::Client,
}

impl HttpApiProvider {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }
}

impl Default for HttpApiProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeApiProvider for HttpApiProvider {
    type Api = HttpNodeApi;

    fn api_for(&self, address: IpAddr, api_port: u16) -> HttpNodeApi {
        HttpNodeApi {
            client: self.client.clone(),
            base_url: format!("http://{address}:{api_port}"),
        }
    }
}

/// 단일 노드의 디버그 API 클라이언트
#[derive(Debug, Clone)]
pub struct HttpNodeApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNodeApi {
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, NodeApiError> {
        let url = format!("{}{path}", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| NodeApiError::Request(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NodeApiError::Request(format!(
                "GET {url}: unexpected status {status}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| NodeApiError::InvalidResponse(format!("GET {url}: {e}")))
    }
}

impl NodeApi for HttpNodeApi {
    async fn debug_info(&self) -> Result<DebugInfo, NodeApiError> {
        self.get_json("/api/v1/debug/info").await
    }

    async fn debug_peer(&self, peer_id: &str) -> Result<DebugPeer, NodeApiError> {
        self.get_json(&format!("/api/v1/debug/peer/{peer_id}")).await
    }

    async fn peer_table(&self) -> Result<PeerRecord, NodeApiError> {
        self.get_json("/api/v1/debug/table").await
    }
}
