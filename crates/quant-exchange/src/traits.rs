//! 거래소 trait 정의.

use async_trait::async_trait;
use quant_core::OrderRequest;

use crate::connector::binance::{OrderExecutor, OrderResult};
use crate::ExchangeError;

/// 거래소 작업을 위한 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// 주문 제출 인터페이스.
///
/// 호출자는 구현체를 주입받아 사용하므로 테스트에서 가짜 게이트웨이로 대체할 수 있습니다.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// 주문 한 건을 제출합니다 (네트워크 호출 정확히 1회, 재시도 없음).
    async fn submit(&self, request: &OrderRequest) -> ExchangeResult<OrderResult>;
}

#[async_trait]
impl OrderGateway for OrderExecutor {
    async fn submit(&self, request: &OrderRequest) -> ExchangeResult<OrderResult> {
        OrderExecutor::submit(self, request).await
    }
}
