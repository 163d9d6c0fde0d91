//! 에러 타입 -- 도메인별 에러 정의

/// Meshtest 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum MeshtestError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 노드 디버그 API 에러
    #[error("node api error: {0}")]
    NodeApi(#[from] NodeApiError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
///
/// 설정 에러는 항상 치명적입니다. 테스트 루프가 시작되기 전에
/// 프로세스를 중단시킵니다.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 노드 디버그 API 에러
///
/// 준비 상태 폴링과 피어 테이블 조회에서 발생합니다.
/// 수렴 검증 중의 API 에러는 일시적 상태로 취급되어 재시도됩니다.
#[derive(Debug, thiserror::Error)]
pub enum NodeApiError {
    /// HTTP 요청 실패 (연결 거부, 타임아웃 등)
    #[error("node request failed: {0}")]
    Request(String),

    /// 응답 본문을 해석할 수 없음
    #[error("invalid node response: {0}")]
    InvalidResponse(String),
}
