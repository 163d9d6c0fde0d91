//! Meshtest 연결성 크레이트 -- 오버레이 수렴 검증
//!
//! 노드 그룹의 모든 순서쌍이 서로를 발견했는지를 디버그 API로
//! 검증합니다. 각 순서쌍은 [`PairState`](meshtest_core::PairState)로
//! 분류되고, 주소 일관성(피어 테이블에 기록된 주소가 해당 노드가
//! 스스로 보고한 주소와 일치하는지)도 함께 검사합니다.
//!
//! # 검증 절차
//!
//! ```text
//! 매 시도마다:
//!   1. 각 노드의 피어 테이블 조회 (실패는 일시적, 다음 시도로)
//!   2. 테이블 주소를 소유 노드의 자기 보고 주소와 대조
//!   3. 미해결 순서쌍마다 debug_peer 직접 질의
//! 전부 Connection이고 주소 불일치가 없으면 성공.
//! 제한 시간 초과 시 남은 쌍과 불일치를 모두 담은 에러 반환.
//! ```

pub mod error;
pub mod matrix;
pub mod verifier;

// --- Public API Re-exports ---

pub use error::ConnectivityError;
pub use matrix::{AddressMismatch, ConnectivityMatrix, PairStatus};
pub use verifier::{ConnectivityVerifier, NodeHandle};
