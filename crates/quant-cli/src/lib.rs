//! CLI 도구 모음.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 현재가 / 최근 체결 조회
//! - 서명된 주문 제출
//! - 실시간 체결 스트림 모니터링

pub mod commands;
