//! Binance REST 커넥터.
//!
//! - 요청 서명 (HMAC-SHA256)
//! - 주문 제출 및 응답 분류
//! - 공개 시세 조회

pub mod executor;
pub mod market_data;
pub mod signer;

pub use executor::{
    ExchangeRejection, Fill, OrderAck, OrderExecutor, OrderResult, OrderState, RejectionKind,
    TransportFailure,
};
pub use market_data::{MarketDataClient, Timed};
pub use signer::{RequestSigner, SignedOrderRequest};
