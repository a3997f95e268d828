//! 핵심 에러 타입.
//!
//! 설정 에러는 시작 시점에만 발생하며 복구 불가능합니다.
//! 주문 검증 에러는 네트워크 호출 전에 동기적으로 반환됩니다.

use thiserror::Error;

/// 설정 에러 (시작 시점 치명적 에러).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 필수 키 누락
    #[error("필수 설정 키 누락: {0}")]
    Missing(String),

    /// 필수 키가 비어 있음
    #[error("설정 키가 비어 있음: {0}")]
    Empty(String),

    /// 값 형식 오류
    #[error("잘못된 설정 값 {key}: {reason}")]
    Invalid { key: String, reason: String },

    /// 설정 소스 로드 실패
    #[error("설정 로드 실패: {0}")]
    Source(#[from] config::ConfigError),
}

/// 주문 요청 검증 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderValidationError {
    /// 심볼 누락
    #[error("심볼이 비어 있습니다")]
    EmptySymbol,

    /// 0 이하 수량
    #[error("수량은 0보다 커야 합니다: {0}")]
    NonPositiveQuantity(String),

    /// 지정가 주문에 가격 누락
    #[error("LIMIT 주문에는 price가 필요합니다")]
    MissingLimitPrice,

    /// 지정가 주문에 유효 기간 누락
    #[error("LIMIT 주문에는 timeInForce가 필요합니다")]
    MissingTimeInForce,

    /// 0 이하 가격
    #[error("가격은 0보다 커야 합니다: {0}")]
    NonPositivePrice(String),

    /// 시장가 주문에 가격 지정
    #[error("MARKET 주문에는 price를 지정할 수 없습니다")]
    UnexpectedPrice,

    /// 시장가 주문에 유효 기간 지정
    #[error("MARKET 주문에는 timeInForce를 지정할 수 없습니다")]
    UnexpectedTimeInForce,
}
