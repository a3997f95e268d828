//! REST 시세 조회.
//!
//! 인증이 필요 없는 공개 엔드포인트만 사용합니다:
//! - `GET /api/v3/ticker/price` - 현재가
//! - `GET /api/v3/trades` - 최근 체결

use chrono::DateTime;
use quant_core::{ClientConfig, LatencyLevel, RecentTrade, TickerPrice};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

use crate::traits::ExchangeResult;
use crate::ExchangeError;

/// 최근 체결 기본 조회 개수.
pub const DEFAULT_TRADES_LIMIT: u32 = 10;

#[derive(Debug, Deserialize)]
struct TickerPriceBody {
    symbol: String,
    price: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TradeBody {
    id: i64,
    price: Decimal,
    qty: Decimal,
    quote_qty: Decimal,
    time: i64,
    is_buyer_maker: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: i32,
    msg: String,
}

/// 지연 시간이 측정된 응답.
#[derive(Debug, Clone)]
pub struct Timed<T> {
    pub value: T,
    /// 요청 왕복 시간
    pub elapsed: Duration,
}

impl<T> Timed<T> {
    /// 왕복 시간의 지연 등급.
    pub fn latency_level(&self) -> LatencyLevel {
        LatencyLevel::from_duration(self.elapsed)
    }
}

/// 공개 시세 REST 클라이언트.
pub struct MarketDataClient {
    config: Arc<ClientConfig>,
    client: Client,
}

impl MarketDataClient {
    /// 새 시세 클라이언트 생성.
    pub fn new(config: Arc<ClientConfig>) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ExchangeError::Network(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self { config, client })
    }

    /// 심볼의 현재가 조회.
    pub async fn ticker_price(&self, symbol: &str) -> ExchangeResult<Timed<TickerPrice>> {
        let symbol = symbol.to_uppercase();
        let timed: Timed<TickerPriceBody> = self
            .public_get("/api/v3/ticker/price", &[("symbol", symbol)])
            .await?;

        debug!(
            "REST poll latency: {} ms ({}) | price: {}",
            timed.elapsed.as_millis(),
            timed.latency_level(),
            timed.value.price
        );

        Ok(Timed {
            value: TickerPrice {
                symbol: timed.value.symbol,
                price: timed.value.price,
            },
            elapsed: timed.elapsed,
        })
    }

    /// 심볼의 최근 체결 조회.
    pub async fn recent_trades(
        &self,
        symbol: &str,
        limit: Option<u32>,
    ) -> ExchangeResult<Timed<Vec<RecentTrade>>> {
        let symbol = symbol.to_uppercase();
        let limit = limit.unwrap_or(DEFAULT_TRADES_LIMIT);

        let timed: Timed<Vec<TradeBody>> = self
            .public_get(
                "/api/v3/trades",
                &[("limit", limit.to_string()), ("symbol", symbol.clone())],
            )
            .await?;

        let trades = timed
            .value
            .into_iter()
            .map(|t| {
                let time = DateTime::from_timestamp_millis(t.time).ok_or_else(|| {
                    ExchangeError::Parse(format!("trade {} time out of range: {}", t.id, t.time))
                })?;
                Ok(RecentTrade {
                    pair: symbol.clone(),
                    id: t.id,
                    price: t.price,
                    quantity: t.qty,
                    quote_quantity: t.quote_qty,
                    time,
                    is_buyer_maker: t.is_buyer_maker,
                })
            })
            .collect::<ExchangeResult<Vec<_>>>()?;

        Ok(Timed {
            value: trades,
            elapsed: timed.elapsed,
        })
    }

    /// 공개 API 요청 (인증 불필요).
    async fn public_get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<Timed<T>> {
        let query = super::signer::build_query(params);
        let url = format!("{}{}?{}", self.config.rest_base_url, endpoint, query);

        debug!("GET {}", url);

        let started = Instant::now();
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        let elapsed = started.elapsed();

        if status.is_success() {
            let value = serde_json::from_str(&body).map_err(|e| {
                error!("Failed to parse response: {} - Body: {}", e, body);
                ExchangeError::Parse(e.to_string())
            })?;
            Ok(Timed { value, elapsed })
        } else if let Ok(err) = serde_json::from_str::<ErrorBody>(&body) {
            error!("REST API error: HTTP={} code={} msg={}", status, err.code, err.msg);
            Err(ExchangeError::Api {
                code: err.code,
                message: err.msg,
            })
        } else {
            error!("REST API error: HTTP={} body={}", status, body);
            Err(ExchangeError::Api {
                code: status.as_u16() as i32,
                message: body,
            })
        }
    }
}
