//! 컨테이너 오케스트레이터 contract -- 노드 컨테이너의 기동/정지/정리
//!
//! [`ContainerOrchestrator`] trait은 컨테이너 백엔드를 추상화합니다.
//! 운영 구현은 `meshtest-cluster`의 `BollardOrchestrator`이고,
//! 테스트는 mock 구현을 사용합니다.
//!
//! 이미지 선택/태깅 정책과 클러스터 매니페스트 구성은 이 contract의
//! 범위 밖입니다. 레시피는 호출자가 완성된 형태로 전달합니다.

use std::fmt;
use std::future::Future;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// 컨테이너 배치 힌트
///
/// 배치는 힌트일 뿐이며, 백엔드가 지원하지 않으면 무시됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location {
    /// 배치 제약 없음
    #[default]
    Any,
    /// 특정 호스트 선호
    Host(String),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Host(host) => write!(f, "host:{host}"),
        }
    }
}

/// 컨테이너 레시피 -- 이미지와 노출 포트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRecipe {
    /// 이미지 참조 (태그 포함)
    pub image: String,
    /// 컨테이너 이름 접두어 (오케스트레이터가 번호를 붙임)
    pub name_prefix: String,
    /// 노출할 포트 목록
    pub exposed_ports: Vec<u16>,
}

/// 컨테이너 기동 설정 -- 순서가 보존되는 환경변수 키/값 쌍
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupConfig {
    env: Vec<(String, String)>,
}

impl StartupConfig {
    /// 빈 설정을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 환경변수를 추가합니다.
    pub fn add_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env.push((key.into(), value.into()));
    }

    /// 환경변수 쌍 전체를 반환합니다.
    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    /// 키로 값을 조회합니다.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// 기동된 컨테이너 핸들
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningContainer {
    /// 백엔드 컨테이너 id
    pub id: String,
    /// 컨테이너 이름
    pub name: String,
    /// 컨테이너 네트워크 주소
    pub address: IpAddr,
    /// 소속 격리 네임스페이스
    pub namespace: String,
}

/// 라인 단위 로그 수신 싱크
///
/// 디스크 형식은 이 contract의 범위 밖입니다. 러너가 파일 싱크를 제공합니다.
pub trait LogSink: Send {
    /// 로그 한 줄을 기록합니다.
    fn write_line(&mut self, line: &str) -> std::io::Result<()>;
}

/// `Vec<String>` 기반의 메모리 싱크. 테스트와 진단 수집에 사용합니다.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    /// 수집된 로그 라인
    pub lines: Vec<String>,
}

impl LogSink for MemoryLogSink {
    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        self.lines.push(line.to_owned());
        Ok(())
    }
}

/// 파일 기반 싱크. 컨테이너 로그를 한 파일에 한 줄씩 기록합니다.
#[derive(Debug)]
pub struct FileLogSink {
    writer: std::io::BufWriter<std::fs::File>,
}

impl FileLogSink {
    /// 경로에 파일을 생성(덮어쓰기)하고 싱크를 엽니다.
    ///
    /// 상위 디렉터리가 없으면 만들어줍니다.
    pub fn create(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        Ok(Self {
            writer: std::io::BufWriter::new(file),
        })
    }

    /// 버퍼를 디스크로 내립니다.
    pub fn flush(&mut self) -> std::io::Result<()> {
        use std::io::Write;
        self.writer.flush()
    }
}

impl LogSink for FileLogSink {
    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        use std::io::Write;
        writeln!(self.writer, "{line}")
    }
}

/// 컨테이너 오케스트레이터 추상화
///
/// 모든 메서드는 `Send` future를 반환하여 tokio 태스크 간 안전하게
/// 공유됩니다. 에러 타입은 백엔드 중립적인 문자열 기반
/// [`OrchestratorError`]입니다.
pub trait ContainerOrchestrator: Send + Sync + 'static {
    /// 컨테이너 `count`개를 요청한 배치로 기동하고 핸들을 반환합니다.
    fn start(
        &self,
        count: usize,
        location: &Location,
        recipe: &ContainerRecipe,
        config: &StartupConfig,
    ) -> impl Future<Output = Result<Vec<RunningContainer>, OrchestratorError>> + Send;

    /// 컨테이너를 정지합니다.
    fn stop(
        &self,
        container: &RunningContainer,
    ) -> impl Future<Output = Result<(), OrchestratorError>> + Send;

    /// 컨테이너 로그 전체를 싱크로 내려받습니다.
    fn download_log(
        &self,
        container: &RunningContainer,
        sink: &mut dyn LogSink,
    ) -> impl Future<Output = Result<(), OrchestratorError>> + Send;

    /// 이 오케스트레이터의 네임스페이스에서 생성된 모든 리소스를
    /// 최선 노력으로 삭제합니다.
    fn delete_all_resources(&self) -> impl Future<Output = Result<(), OrchestratorError>> + Send;
}

/// 오케스트레이터 에러
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// 백엔드 연결 실패
    #[error("orchestrator connection failed: {0}")]
    Connection(String),

    /// 백엔드 API 호출 실패
    #[error("orchestrator api error: {0}")]
    Api(String),

    /// 대상 컨테이너 없음
    #[error("container not found: {0}")]
    NotFound(String),

    /// 로그 싱크 I/O 실패
    #[error("log sink error: {0}")]
    Sink(#[from] std::io::Error),
}
