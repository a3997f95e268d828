//! 시장 데이터 구조체.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 실시간 체결 이벤트.
///
/// 스트림 메시지 하나당 최대 한 번 전달됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// 체결 가격
    pub price: f64,
    /// 이벤트 시각 (epoch 밀리초)
    pub event_time_millis: i64,
}

impl TradeEvent {
    pub fn new(price: f64, event_time_millis: i64) -> Self {
        Self {
            price,
            event_time_millis,
        }
    }

    /// 이벤트 시각을 `DateTime`으로 반환합니다.
    pub fn event_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.event_time_millis)
    }

    /// 주어진 수신 시각 기준 지연(밀리초)을 계산합니다. 음수는 0으로 처리합니다.
    pub fn latency_ms(&self, received_at_millis: i64) -> u64 {
        received_at_millis.saturating_sub(self.event_time_millis).max(0) as u64
    }
}

/// 현재 시세 (REST `ticker/price`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerPrice {
    /// 거래 심볼
    pub symbol: String,
    /// 최근 체결가
    pub price: Decimal,
}

/// 최근 체결 (REST `trades`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentTrade {
    /// 거래 쌍 (응답에 없으므로 요청 심볼로 채움)
    pub pair: String,
    /// 체결 ID
    pub id: i64,
    /// 체결 가격
    pub price: Decimal,
    /// 체결 수량
    pub quantity: Decimal,
    /// 체결 금액
    pub quote_quantity: Decimal,
    /// 체결 시각
    pub time: DateTime<Utc>,
    /// 매수자가 메이커인지 여부
    pub is_buyer_maker: bool,
}
