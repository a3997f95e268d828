//! 거래소 연동 계층.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 요청 서명: 고정 순서 정규 쿼리 + HMAC-SHA256
//! - 주문 실행기: 서명된 주문 제출과 응답 분류 (`Accepted` / `Rejected` / `TransportFailure`)
//! - REST 시세 조회와 지연 측정
//! - 실시간 체결 스트림: 프레임 조립, 이벤트 분배, 연결 상태 관리

pub mod connector;
pub mod error;
pub mod traits;
pub mod websocket;

pub use connector::*;
pub use error::*;
pub use traits::*;
pub use websocket::*;
