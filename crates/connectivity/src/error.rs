//! 연결성 에러 타입

use std::fmt::Write as _;

use crate::matrix::{AddressMismatch, PairStatus};

/// 수렴 검증 에러
#[derive(Debug, thiserror::Error)]
pub enum ConnectivityError {
    /// 제한 시간 안에 전체 메시가 수렴하지 않음
    ///
    /// 미해결 순서쌍, 주소 불일치, 마지막 테이블 조회 실패를
    /// 전부 담아 완전한 실패 기술을 제공합니다.
    #[error(
        "mesh did not converge within {timeout_secs}s \
         ({} unresolved pairs, {} address mismatches)",
        pending.len(),
        mismatches.len()
    )]
    Timeout {
        /// Connection에 도달하지 못한 순서쌍 (마지막 관찰 상태 포함)
        pending: Vec<PairStatus>,
        /// 마지막 시도에서 관찰된 주소 불일치
        mismatches: Vec<AddressMismatch>,
        /// 마지막 피어 테이블 조회 실패 (있다면)
        last_fetch_error: Option<String>,
        /// 적용된 제한 시간 (초)
        timeout_secs: u64,
    },
}

impl ConnectivityError {
    /// 줄 단위의 완전한 실패 보고서를 만듭니다.
    pub fn describe(&self) -> String {
        let Self::Timeout {
            pending,
            mismatches,
            last_fetch_error,
            timeout_secs,
        } = self;

        let mut out = format!("mesh did not converge within {timeout_secs}s\n");
        for pair in pending {
            let _ = writeln!(out, "  pending: {pair}");
        }
        for mismatch in mismatches {
            let _ = writeln!(out, "  mismatch: {mismatch}");
        }
        if let Some(fetch) = last_fetch_error {
            let _ = writeln!(out, "  last table fetch error: {fetch}");
        }
        out
    }
}
