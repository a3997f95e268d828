//! 주문 타입 및 주문 요청 빌더.
//!
//! 이 모듈은 거래소에 제출되는 주문 관련 타입을 정의합니다:
//! - `Side` - 주문 방향 (매수/매도)
//! - `OrderType` - 주문 유형 (시장가, 지정가)
//! - `TimeInForce` - 주문 유효 기간
//! - `OrderRequest` - 주문 요청 (불변, 제출 시도마다 한 번 생성)
//! - `OrderRequestBuilder` - 기본값이 채워진 주문 요청 빌더

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::OrderValidationError;

/// 주문 방향 (매수 또는 매도).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// 매수
    Buy,
    /// 매도
    Sell,
}

impl Side {
    /// 거래소 와이어 표기를 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            _ => Err(format!("Unknown side: {}", s)),
        }
    }
}

/// 주문 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// 시장가 주문 - 현재 시장 가격으로 즉시 체결
    Market,
    /// 지정가 주문 - 지정 가격 이상/이하에서 체결
    Limit,
}

impl OrderType {
    /// 거래소 와이어 표기를 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "MARKET" => Ok(OrderType::Market),
            "LIMIT" => Ok(OrderType::Limit),
            _ => Err(format!("Unknown order type: {}", s)),
        }
    }
}

/// 주문 유효 기간.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    /// 취소될 때까지 유효 (Good Till Cancelled)
    GTC,
    /// 즉시 체결 또는 취소 (Immediate Or Cancel)
    IOC,
    /// 전량 체결 또는 취소 (Fill Or Kill)
    FOK,
}

impl TimeInForce {
    /// 거래소 와이어 표기를 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::GTC => "GTC",
            TimeInForce::IOC => "IOC",
            TimeInForce::FOK => "FOK",
        }
    }
}

impl std::fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TimeInForce {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GTC" => Ok(TimeInForce::GTC),
            "IOC" => Ok(TimeInForce::IOC),
            "FOK" => Ok(TimeInForce::FOK),
            _ => Err(format!("Unknown time in force: {}", s)),
        }
    }
}

/// 새 주문 생성을 위한 주문 요청.
///
/// 타임스탬프는 포함하지 않습니다. 서명 시점에 전송 시각이 붙습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// 거래 심볼 (예: "BTCUSDT")
    pub symbol: String,
    /// 주문 방향
    pub side: Side,
    /// 주문 유형
    pub order_type: OrderType,
    /// 거래 수량
    pub quantity: Decimal,
    /// 지정가 (LIMIT 주문에만 존재)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    /// 주문 유효 기간 (LIMIT 주문에만 존재)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_in_force: Option<TimeInForce>,
}

impl OrderRequest {
    /// 시장가 주문을 생성합니다.
    pub fn market(symbol: impl Into<String>, side: Side, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            time_in_force: None,
        }
    }

    /// 지정가 주문을 생성합니다.
    pub fn limit(
        symbol: impl Into<String>,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        time_in_force: TimeInForce,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            time_in_force: Some(time_in_force),
        }
    }

    /// LIMIT/MARKET 필드 존재 규칙을 검증합니다.
    ///
    /// LIMIT는 price와 timeInForce가 모두 있어야 하고,
    /// MARKET는 둘 다 없어야 합니다.
    pub fn validate(&self) -> Result<(), OrderValidationError> {
        if self.symbol.trim().is_empty() {
            return Err(OrderValidationError::EmptySymbol);
        }
        if self.quantity <= Decimal::ZERO {
            return Err(OrderValidationError::NonPositiveQuantity(
                self.quantity.to_string(),
            ));
        }

        match self.order_type {
            OrderType::Limit => {
                let price = self.price.ok_or(OrderValidationError::MissingLimitPrice)?;
                if self.time_in_force.is_none() {
                    return Err(OrderValidationError::MissingTimeInForce);
                }
                if price <= Decimal::ZERO {
                    return Err(OrderValidationError::NonPositivePrice(price.to_string()));
                }
            }
            OrderType::Market => {
                if self.price.is_some() {
                    return Err(OrderValidationError::UnexpectedPrice);
                }
                if self.time_in_force.is_some() {
                    return Err(OrderValidationError::UnexpectedTimeInForce);
                }
            }
        }

        Ok(())
    }
}

/// 기본값이 채워진 주문 요청 빌더.
///
/// `build()`는 검증하지 않습니다. 검증은 주문 실행기가 네트워크 호출 전에 수행합니다.
#[derive(Debug, Clone)]
pub struct OrderRequestBuilder {
    symbol: String,
    side: Side,
    order_type: OrderType,
    quantity: Decimal,
    price: Option<Decimal>,
    time_in_force: Option<TimeInForce>,
}

impl Default for OrderRequestBuilder {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            side: Side::Buy,
            order_type: OrderType::Market,
            quantity: dec!(0.001),
            price: None,
            time_in_force: None,
        }
    }
}

impl OrderRequestBuilder {
    /// 시장가 매수 주문 (BTCUSDT, 0.001).
    pub fn market_buy() -> Self {
        Self::default()
    }

    /// 지정가 매수 주문 (BTCUSDT, 0.001 @ 50000.00, GTC).
    pub fn limit_buy() -> Self {
        Self::default()
            .with_type(OrderType::Limit)
            .with_price(dec!(50000.00))
            .with_time_in_force(TimeInForce::GTC)
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    pub fn with_type(mut self, order_type: OrderType) -> Self {
        self.order_type = order_type;
        self
    }

    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = Some(time_in_force);
        self
    }

    /// 주문 요청을 생성합니다.
    pub fn build(self) -> OrderRequest {
        OrderRequest {
            symbol: self.symbol,
            side: self.side,
            order_type: self.order_type,
            quantity: self.quantity,
            price: self.price,
            time_in_force: self.time_in_force,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let order = OrderRequestBuilder::market_buy().build();

        assert_eq!(order.symbol, "BTCUSDT");
        assert_eq!(order.side, Side::Buy);
        assert_eq!(order.order_type, OrderType::Market);
        assert_eq!(order.quantity, dec!(0.001));
        assert!(order.price.is_none());
        assert!(order.validate().is_ok());
    }

    #[test]
    fn test_limit_builder_defaults() {
        let order = OrderRequestBuilder::limit_buy()
            .with_symbol("ETHUSDT")
            .with_price(dec!(2500.50))
            .build();

        assert_eq!(order.order_type, OrderType::Limit);
        assert_eq!(order.price, Some(dec!(2500.50)));
        assert_eq!(order.time_in_force, Some(TimeInForce::GTC));
        assert!(order.validate().is_ok());
    }

    #[test]
    fn test_limit_without_price_is_invalid() {
        let order = OrderRequestBuilder::market_buy()
            .with_type(OrderType::Limit)
            .with_time_in_force(TimeInForce::IOC)
            .build();

        assert_eq!(order.validate(), Err(OrderValidationError::MissingLimitPrice));
    }

    #[test]
    fn test_limit_without_tif_is_invalid() {
        let order = OrderRequestBuilder::market_buy()
            .with_type(OrderType::Limit)
            .with_price(dec!(100))
            .build();

        assert_eq!(order.validate(), Err(OrderValidationError::MissingTimeInForce));
    }

    #[test]
    fn test_market_with_price_is_invalid() {
        let order = OrderRequestBuilder::market_buy().with_price(dec!(1)).build();
        assert_eq!(order.validate(), Err(OrderValidationError::UnexpectedPrice));

        let order = OrderRequestBuilder::market_buy()
            .with_time_in_force(TimeInForce::FOK)
            .build();
        assert_eq!(
            order.validate(),
            Err(OrderValidationError::UnexpectedTimeInForce)
        );
    }

    #[test]
    fn test_non_positive_quantity_is_invalid() {
        let order = OrderRequest::market("BTCUSDT", Side::Sell, Decimal::ZERO);
        assert!(matches!(
            order.validate(),
            Err(OrderValidationError::NonPositiveQuantity(_))
        ));
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(Side::Sell.to_string(), "SELL");
        assert_eq!(OrderType::Limit.to_string(), "LIMIT");
        assert_eq!(TimeInForce::IOC.to_string(), "IOC");
        assert_eq!("buy".parse::<Side>().unwrap(), Side::Buy);
        assert_eq!("fok".parse::<TimeInForce>().unwrap(), TimeInForce::FOK);
        assert!("stop".parse::<OrderType>().is_err());
    }
}
