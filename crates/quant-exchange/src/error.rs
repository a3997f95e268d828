//! 거래소 에러 타입.
//!
//! 주문 제출의 정상 결과(거부 포함)는 `OrderResult`로 표현되며,
//! 이 타입은 결과를 만들 수 없는 경우에만 사용됩니다.

use quant_core::{ConfigError, OrderValidationError};
use thiserror::Error;

/// 거래소 관련 에러.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// 설정 에러 (시작 시점 치명적)
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// 주문 요청 검증 실패 (네트워크 호출 전)
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] OrderValidationError),

    /// 스트림 메시지 하나의 파싱 실패 (스트림은 계속됨)
    #[error("Stream parse error: {0}")]
    StreamParse(String),

    /// 스트림 연결 수준 실패 (스트림 종료, 재연결은 호출자 책임)
    #[error("Stream transport error: {0}")]
    StreamTransport(String),

    /// 이미 연결 중이거나 연결됨
    #[error("Stream already connected")]
    AlreadyConnected,

    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    Network(String),

    /// 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 파싱/역직렬화 에러
    #[error("Parse error: {0}")]
    Parse(String),

    /// API 에러 코드
    #[error("API error {code}: {message}")]
    Api { code: i32, message: String },
}

impl ExchangeError {
    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExchangeError::Network(_)
                | ExchangeError::Timeout(_)
                | ExchangeError::StreamTransport(_)
        )
    }

    /// 재시도하면 안 되는 치명적 에러인지 확인.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExchangeError::Configuration(_))
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout(err.to_string())
        } else if err.is_decode() {
            ExchangeError::Parse(err.to_string())
        } else {
            ExchangeError::Network(err.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ExchangeError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ExchangeError::StreamTransport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(ExchangeError::Timeout("deadline".into()).is_retryable());
        assert!(ExchangeError::StreamTransport("reset".into()).is_retryable());
        assert!(!ExchangeError::StreamParse("bad json".into()).is_retryable());

        let config_err: ExchangeError = ConfigError::Missing("api.key".into()).into();
        assert!(config_err.is_fatal());
        assert!(!config_err.is_retryable());
    }

    #[test]
    fn test_validation_error_converts() {
        let err: ExchangeError = OrderValidationError::MissingLimitPrice.into();
        assert!(matches!(err, ExchangeError::InvalidRequest(_)));
    }
}
