//! 주문 제출 명령.

use anyhow::Result;
use quant_core::{OrderRequest, OrderRequestBuilder, OrderType, Side, TimeInForce};
use quant_exchange::{OrderGateway, OrderResult, TransportFailure};
use rust_decimal::Decimal;
use tracing::info;

/// 주문 명령 인자.
#[derive(Debug, Clone)]
pub struct OrderArgs {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub time_in_force: Option<TimeInForce>,
}

/// 인자로 주문 요청을 만듭니다.
///
/// 지정가 주문에 유효 기간이 없으면 GTC를 사용합니다. 검증은 제출 시점에 이루어집니다.
pub fn build_request(args: &OrderArgs) -> OrderRequest {
    let mut builder = OrderRequestBuilder::market_buy()
        .with_symbol(args.symbol.to_uppercase())
        .with_side(args.side)
        .with_type(args.order_type)
        .with_quantity(args.quantity);

    if let Some(price) = args.price {
        builder = builder.with_price(price);
    }

    let time_in_force = match (args.order_type, args.time_in_force) {
        (_, Some(tif)) => Some(tif),
        (OrderType::Limit, None) => Some(TimeInForce::GTC),
        (OrderType::Market, None) => None,
    };
    if let Some(tif) = time_in_force {
        builder = builder.with_time_in_force(tif);
    }

    builder.build()
}

/// 주문을 제출하고 결과를 반환합니다.
pub async fn place_order(gateway: &dyn OrderGateway, request: &OrderRequest) -> Result<OrderResult> {
    info!(
        "Submitting {} {} {} {}",
        request.side, request.order_type, request.quantity, request.symbol
    );
    Ok(gateway.submit(request).await?)
}

/// 결과 요약 문자열.
pub fn describe(result: &OrderResult) -> String {
    match result {
        OrderResult::Accepted(ack) => {
            let mut line = format!("ACCEPTED order_id={} status={:?}", ack.order_id, ack.status);
            if let Some(qty) = ack.executed_qty {
                line.push_str(&format!(" executed_qty={}", qty));
            }
            if !ack.fills.is_empty() {
                line.push_str(&format!(" fills={}", ack.fills.len()));
            }
            line
        }
        OrderResult::Rejected(rejection) => format!(
            "REJECTED code={} ({:?}) msg={}",
            rejection.code,
            rejection.kind(),
            rejection.message
        ),
        OrderResult::TransportFailure(TransportFailure::MalformedResponse { status, reason, .. }) => {
            format!("FAILED malformed response HTTP={} ({})", status, reason)
        }
        OrderResult::TransportFailure(failure) => format!("FAILED {}", failure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quant_exchange::ExchangeRejection;
    use rust_decimal_macros::dec;

    fn args(order_type: OrderType) -> OrderArgs {
        OrderArgs {
            symbol: "ethusdt".to_string(),
            side: Side::Sell,
            order_type,
            quantity: dec!(0.5),
            price: None,
            time_in_force: None,
        }
    }

    #[test]
    fn test_build_market_request() {
        let request = build_request(&args(OrderType::Market));

        assert_eq!(request.symbol, "ETHUSDT");
        assert_eq!(request.side, Side::Sell);
        assert_eq!(request.price, None);
        assert_eq!(request.time_in_force, None);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_build_limit_request_defaults_gtc() {
        let mut args = args(OrderType::Limit);
        args.price = Some(dec!(2500));
        let request = build_request(&args);

        assert_eq!(request.time_in_force, Some(TimeInForce::GTC));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_limit_without_price_fails_validation() {
        let request = build_request(&args(OrderType::Limit));
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_describe_rejection() {
        let result = OrderResult::Rejected(ExchangeRejection {
            http_status: 400,
            code: -1013,
            message: "Filter failure: LOT_SIZE".to_string(),
        });

        let line = describe(&result);
        assert!(line.starts_with("REJECTED code=-1013"));
        assert!(line.contains("FilterFailure"));
    }

    #[test]
    fn test_describe_transport_failure() {
        let result = OrderResult::TransportFailure(TransportFailure::Connection(
            "connection refused".to_string(),
        ));
        assert_eq!(describe(&result), "FAILED connection: connection refused");
    }
}
