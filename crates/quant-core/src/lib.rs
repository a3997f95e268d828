//! # Quant Core
//!
//! 암호화폐 거래소 클라이언트의 핵심 도메인 모델 및 공통 인프라를 제공합니다.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 주문 요청 타입 및 빌더
//! - 체결 이벤트 / 시세 구조체
//! - 지연(latency) 등급 분류
//! - 설정 로드 및 검증
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
