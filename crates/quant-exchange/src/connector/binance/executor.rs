//! 주문 실행기.
//!
//! 주문 요청을 검증하고, 전송 시각으로 서명한 뒤, 한 번의 HTTP POST로 제출합니다.
//! 응답은 `Accepted` / `Rejected` / `TransportFailure` 중 정확히 하나로 분류됩니다.
//!
//! 재시도나 중복 제거는 하지 않습니다. 같은 요청을 다시 제출하면 새 타임스탬프로
//! 서명된 새 주문 시도가 됩니다.

use chrono::{DateTime, Utc};
use quant_core::{exchange_span, ClientConfig, OrderRequest};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info, warn, Instrument};

use super::signer::{timestamp_ms, RequestSigner, SignedOrderRequest};
use crate::traits::ExchangeResult;
use crate::ExchangeError;

/// 주문 엔드포인트.
pub const ORDER_ENDPOINT: &str = "/api/v3/order";

/// API 키 헤더.
pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";

// ============================================================================
// 응답 타입
// ============================================================================

/// 상세 필드의 수치 값. 문자열과 숫자를 모두 허용합니다.
fn decimal_field(value: Option<&Value>) -> Option<Decimal> {
    match value? {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

fn string_field(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: i32,
    msg: String,
}

/// 거래소 주문 상태.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderState {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    PendingCancel,
    Rejected,
    Expired,
    ExpiredInMatch,
    /// 알 수 없는 상태 (원문 유지)
    Other(String),
}

impl OrderState {
    pub fn parse(status: &str) -> Self {
        match status {
            "NEW" => OrderState::New,
            "PARTIALLY_FILLED" => OrderState::PartiallyFilled,
            "FILLED" => OrderState::Filled,
            "CANCELED" => OrderState::Canceled,
            "PENDING_CANCEL" => OrderState::PendingCancel,
            "REJECTED" => OrderState::Rejected,
            "EXPIRED" => OrderState::Expired,
            "EXPIRED_IN_MATCH" => OrderState::ExpiredInMatch,
            other => OrderState::Other(other.to_string()),
        }
    }
}

/// 개별 체결 내역 (FULL 응답).
///
/// 가격이나 수량이 없는 항목은 건너뛰고, 나머지 필드는 없으면 `None`입니다.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub price: Decimal,
    pub quantity: Decimal,
    pub commission: Option<Decimal>,
    pub commission_asset: Option<String>,
    pub trade_id: Option<i64>,
}

impl Fill {
    fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            price: decimal_field(value.get("price"))?,
            quantity: decimal_field(value.get("qty"))?,
            commission: decimal_field(value.get("commission")),
            commission_asset: string_field(value.get("commissionAsset")),
            trade_id: value.get("tradeId").and_then(Value::as_i64),
        })
    }
}

/// 접수된 주문 확인.
#[derive(Debug, Clone)]
pub struct OrderAck {
    /// 거래소 주문 ID
    pub order_id: i64,
    /// 주문 상태 (응답에 없으면 빈 `Other`)
    pub status: OrderState,
    pub symbol: Option<String>,
    pub client_order_id: Option<String>,
    pub transact_time: Option<DateTime<Utc>>,
    pub executed_qty: Option<Decimal>,
    pub cumulative_quote_qty: Option<Decimal>,
    pub fills: Vec<Fill>,
    /// 원본 응답
    pub raw: Value,
}

impl OrderAck {
    fn from_raw(order_id: i64, raw: Value) -> Self {
        let status = raw
            .get("status")
            .and_then(Value::as_str)
            .map(OrderState::parse)
            .unwrap_or_else(|| OrderState::Other(String::new()));
        let fills = raw
            .get("fills")
            .and_then(Value::as_array)
            .map(|fills| fills.iter().filter_map(Fill::from_value).collect())
            .unwrap_or_default();

        Self {
            order_id,
            status,
            symbol: string_field(raw.get("symbol")),
            client_order_id: string_field(raw.get("clientOrderId")),
            transact_time: raw
                .get("transactTime")
                .and_then(Value::as_i64)
                .and_then(DateTime::from_timestamp_millis),
            executed_qty: decimal_field(raw.get("executedQty")),
            cumulative_quote_qty: decimal_field(raw.get("cummulativeQuoteQty")),
            fills,
            raw,
        }
    }
}

/// 거래소 거부 사유 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// 필터 실패 (가격/수량 규칙 위반), -1013
    FilterFailure,
    /// 타임스탬프가 recvWindow 밖, -1021
    TimestampOutsideWindow,
    /// 서명 불일치, -1022
    InvalidSignature,
    /// 잘못된 API 키 또는 권한, -2014 / -2015
    InvalidApiKey,
    /// 요청 한도 초과, -1003
    RateLimited,
    /// 잔고 부족, -2010
    InsufficientBalance,
    Other,
}

/// 거래소의 구조화된 주문 거부.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRejection {
    pub http_status: u16,
    pub code: i32,
    pub message: String,
}

impl ExchangeRejection {
    /// 거래소 에러 코드를 분류합니다.
    pub fn kind(&self) -> RejectionKind {
        match self.code {
            -1003 => RejectionKind::RateLimited,
            -1013 => RejectionKind::FilterFailure,
            -1021 => RejectionKind::TimestampOutsideWindow,
            -1022 => RejectionKind::InvalidSignature,
            -2010 => RejectionKind::InsufficientBalance,
            -2014 | -2015 => RejectionKind::InvalidApiKey,
            _ => RejectionKind::Other,
        }
    }
}

/// 네트워크 또는 응답 해석 실패.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    /// 요청 타임아웃
    Timeout(String),
    /// 연결 실패 (DNS, 연결 거부, 연결 리셋)
    Connection(String),
    /// 그 외 요청/응답 수신 실패
    Request(String),
    /// 응답 본문이 예상 형식이 아님
    MalformedResponse {
        status: u16,
        reason: String,
        body: String,
    },
}

impl std::fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportFailure::Timeout(cause) => write!(f, "timeout: {}", cause),
            TransportFailure::Connection(cause) => write!(f, "connection: {}", cause),
            TransportFailure::Request(cause) => write!(f, "request: {}", cause),
            TransportFailure::MalformedResponse { status, reason, .. } => {
                write!(f, "malformed response (HTTP {}): {}", status, reason)
            }
        }
    }
}

impl From<reqwest::Error> for TransportFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportFailure::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportFailure::Connection(err.to_string())
        } else {
            TransportFailure::Request(err.to_string())
        }
    }
}

/// 주문 제출 결과. 정확히 하나의 변형만 존재합니다.
#[derive(Debug, Clone)]
pub enum OrderResult {
    Accepted(OrderAck),
    Rejected(ExchangeRejection),
    TransportFailure(TransportFailure),
}

impl OrderResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, OrderResult::Accepted(_))
    }

    /// 접수된 경우 주문 ID.
    pub fn order_id(&self) -> Option<i64> {
        match self {
            OrderResult::Accepted(ack) => Some(ack.order_id),
            _ => None,
        }
    }

    /// HTTP 상태와 본문으로 결과를 분류합니다.
    pub fn classify(status: StatusCode, body: &str) -> Self {
        let malformed = |reason: String| {
            OrderResult::TransportFailure(TransportFailure::MalformedResponse {
                status: status.as_u16(),
                reason,
                body: body.to_string(),
            })
        };

        if status.is_success() {
            let raw: Value = match serde_json::from_str(body) {
                Ok(raw) => raw,
                Err(e) => return malformed(e.to_string()),
            };
            // orderId가 있으면 거래소가 주문을 받은 것이므로 상세 필드는 분류에 영향을 주지 않음
            let Some(order_id) = raw.get("orderId").and_then(Value::as_i64) else {
                return malformed("missing or non-integer orderId".to_string());
            };
            OrderResult::Accepted(OrderAck::from_raw(order_id, raw))
        } else {
            match serde_json::from_str::<ErrorBody>(body) {
                Ok(err) => OrderResult::Rejected(ExchangeRejection {
                    http_status: status.as_u16(),
                    code: err.code,
                    message: err.msg,
                }),
                Err(e) => malformed(e.to_string()),
            }
        }
    }
}

// ============================================================================
// 주문 실행기
// ============================================================================

/// 서명된 주문 제출기.
///
/// 읽기 전용 설정과 서명기만 공유하므로 여러 태스크에서 동시에 `submit`을 호출해도 됩니다.
pub struct OrderExecutor {
    config: Arc<ClientConfig>,
    signer: RequestSigner,
    client: Client,
}

impl OrderExecutor {
    /// 새 주문 실행기 생성.
    ///
    /// # Errors
    /// 시크릿이 비어 있으면 `ExchangeError::Configuration`,
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::Network`를 반환합니다.
    pub fn new(config: Arc<ClientConfig>) -> Result<Self, ExchangeError> {
        let signer = RequestSigner::new(config.api_secret())?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ExchangeError::Network(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            config,
            signer,
            client,
        })
    }

    /// 주문을 제출합니다.
    ///
    /// 검증 실패 시에만 `Err(ExchangeError::InvalidRequest)`를 반환하며 이 경우 네트워크
    /// 호출은 없습니다. 그 외 모든 경우는 `Ok(OrderResult)`입니다.
    pub async fn submit(&self, request: &OrderRequest) -> ExchangeResult<OrderResult> {
        request.validate()?;

        let span = exchange_span!("submit_order", request.symbol, request.side);
        self.send(request).instrument(span).await
    }

    async fn send(&self, request: &OrderRequest) -> ExchangeResult<OrderResult> {
        let signed =
            SignedOrderRequest::new(request, &self.signer, timestamp_ms(), self.config.recv_window);
        let url = format!(
            "{}{}?{}",
            self.config.order_base_url(),
            ORDER_ENDPOINT,
            signed.query_string()
        );

        info!(
            "Entering order: {} {} {} {} @ {:?}",
            request.side, request.order_type, request.quantity, request.symbol, request.price
        );
        if self.config.log_masked_api_key {
            debug!(api_key = %self.config.masked_api_key(), "POST (signed) {}", ORDER_ENDPOINT);
        } else {
            debug!("POST (signed) {}", ORDER_ENDPOINT);
        }

        let response = match self
            .client
            .post(&url)
            .header(API_KEY_HEADER, self.config.api_key().expose_secret())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Ok(Self::log_outcome(OrderResult::TransportFailure(e.into()))),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Ok(Self::log_outcome(OrderResult::TransportFailure(e.into()))),
        };

        debug!("Order response HTTP={} body={}", status.as_u16(), body);
        Ok(Self::log_outcome(OrderResult::classify(status, &body)))
    }

    fn log_outcome(result: OrderResult) -> OrderResult {
        match &result {
            OrderResult::Accepted(ack) => {
                info!("Order placed: id={} status={:?}", ack.order_id, ack.status)
            }
            OrderResult::Rejected(rejection) => warn!(
                "Order rejected: HTTP={} code={} msg={} ({:?})",
                rejection.http_status,
                rejection.code,
                rejection.message,
                rejection.kind()
            ),
            OrderResult::TransportFailure(failure) => error!("Order transport failure: {}", failure),
        }
        result
    }
}
