//! 요청 서명.
//!
//! 정규 쿼리 문자열은 고정된 필드 순서로 만들어집니다. 거래소는 받은 문자열
//! 그대로 서명을 다시 계산하므로 순서가 바뀌면 서명이 무효가 됩니다.
//!
//! `symbol, side, type, quantity, [price], [timeInForce], timestamp, recvWindow, newOrderRespType`

use hmac::{Hmac, Mac};
use quant_core::{ConfigError, OrderRequest};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use std::fmt;

use crate::ExchangeError;

type HmacSha256 = Hmac<Sha256>;

/// 주문 응답 유형 (체결 내역 포함).
pub const NEW_ORDER_RESP_TYPE: &str = "FULL";

/// HMAC-SHA256 요청 서명기.
///
/// 생성 시 키가 설정된 MAC 상태를 만들어 두고, 서명마다 복제해서 사용합니다.
/// 공유 가변 상태가 없으므로 여러 태스크에서 동시에 사용해도 안전합니다.
#[derive(Clone)]
pub struct RequestSigner {
    keyed: HmacSha256,
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("key", &"***REDACTED***")
            .finish()
    }
}

impl RequestSigner {
    /// 새 서명기 생성.
    ///
    /// # Errors
    /// 시크릿이 비어 있으면 `ExchangeError::Configuration`을 반환합니다.
    pub fn new(secret: &SecretString) -> Result<Self, ExchangeError> {
        let secret = secret.expose_secret();
        if secret.is_empty() {
            return Err(ConfigError::Empty("api.secret".to_string()).into());
        }

        let keyed = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| {
            ConfigError::Invalid {
                key: "api.secret".to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self { keyed })
    }

    /// 쿼리 문자열에 대한 소문자 hex 서명을 반환합니다.
    pub fn sign(&self, query: &str) -> String {
        let mut mac = self.keyed.clone();
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

/// 파라미터에서 쿼리 문자열 생성 (순서 유지).
pub fn build_query(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// 주문 요청의 정규 파라미터 목록.
pub fn order_params(
    request: &OrderRequest,
    timestamp: i64,
    recv_window: u64,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("symbol", request.symbol.clone()),
        ("side", request.side.as_str().to_string()),
        ("type", request.order_type.as_str().to_string()),
        ("quantity", request.quantity.to_string()),
    ];

    if let Some(price) = request.price {
        params.push(("price", price.to_string()));
    }
    if let Some(tif) = request.time_in_force {
        params.push(("timeInForce", tif.as_str().to_string()));
    }

    params.push(("timestamp", timestamp.to_string()));
    params.push(("recvWindow", recv_window.to_string()));
    params.push(("newOrderRespType", NEW_ORDER_RESP_TYPE.to_string()));
    params
}

/// 현재 타임스탬프(밀리초) 반환.
pub fn timestamp_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 서명된 주문 요청.
///
/// 전송할 때마다 새로 만듭니다. 타임스탬프는 빌드 시각이 아니라 전송 시각이어야 합니다.
#[derive(Debug, Clone)]
pub struct SignedOrderRequest {
    pub request: OrderRequest,
    pub timestamp: i64,
    pub recv_window: u64,
    /// 서명 대상 정규 쿼리 문자열
    pub query: String,
    pub signature: String,
}

impl SignedOrderRequest {
    /// 주어진 타임스탬프로 서명합니다.
    pub fn new(
        request: &OrderRequest,
        signer: &RequestSigner,
        timestamp: i64,
        recv_window: u64,
    ) -> Self {
        let query = build_query(&order_params(request, timestamp, recv_window));
        let signature = signer.sign(&query);

        Self {
            request: request.clone(),
            timestamp,
            recv_window,
            query,
            signature,
        }
    }

    /// `signature`가 덧붙은 최종 쿼리 문자열.
    pub fn query_string(&self) -> String {
        format!("{}&signature={}", self.query, self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quant_core::{OrderRequestBuilder, OrderType, Side, TimeInForce};
    use rust_decimal_macros::dec;

    const DOC_SECRET: &str = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";

    fn signer(secret: &str) -> RequestSigner {
        RequestSigner::new(&SecretString::from(secret.to_string())).unwrap()
    }

    #[test]
    fn test_sign_matches_exchange_reference() {
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";

        assert_eq!(
            signer(DOC_SECRET).sign(query),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_sign_matches_rfc4231_case2() {
        assert_eq!(
            signer("Jefe").sign("what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_empty_secret_rejected_at_construction() {
        let err = RequestSigner::new(&SecretString::from(String::new())).unwrap_err();
        assert!(matches!(err, ExchangeError::Configuration(ConfigError::Empty(_))));
    }

    #[test]
    fn test_sign_is_deterministic_and_sensitive() {
        let query = "symbol=BTCUSDT&side=BUY&type=MARKET&quantity=0.001&timestamp=1";
        let base = signer("secret-key");
        let reference = base.sign(query);

        assert_eq!(reference, base.sign(query));
        assert_eq!(reference.len(), 64);
        assert!(reference.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        // 쿼리 한 글자 변경
        for i in 0..query.len() {
            let mut bytes = query.as_bytes().to_vec();
            bytes[i] = if bytes[i] == b'x' { b'y' } else { b'x' };
            let mutated = String::from_utf8(bytes).unwrap();
            assert_ne!(base.sign(&mutated), reference, "mutation at {}", i);
        }

        // 시크릿 한 글자 변경
        let secret = "secret-key";
        for i in 0..secret.len() {
            let mut bytes = secret.as_bytes().to_vec();
            bytes[i] = if bytes[i] == b'x' { b'y' } else { b'x' };
            let mutated = String::from_utf8(bytes).unwrap();
            assert_ne!(signer(&mutated).sign(query), reference, "key mutation at {}", i);
        }
    }

    #[test]
    fn test_limit_query_field_order() {
        let request = OrderRequestBuilder::limit_buy().build();
        let query = build_query(&order_params(&request, 1_700_000_000_000, 5000));

        assert_eq!(
            query,
            "symbol=BTCUSDT&side=BUY&type=LIMIT&quantity=0.001&price=50000.00&timeInForce=GTC&timestamp=1700000000000&recvWindow=5000&newOrderRespType=FULL"
        );
    }

    #[test]
    fn test_market_query_omits_price_fields() {
        let request = OrderRequest::market("ETHUSDT", Side::Sell, dec!(0.5));
        let query = build_query(&order_params(&request, 42, 5000));

        assert_eq!(
            query,
            "symbol=ETHUSDT&side=SELL&type=MARKET&quantity=0.5&timestamp=42&recvWindow=5000&newOrderRespType=FULL"
        );
        assert!(!query.contains("price="));
        assert!(!query.contains("timeInForce="));
    }

    #[test]
    fn test_limit_query_contains_price_fields() {
        for tif in [TimeInForce::GTC, TimeInForce::IOC, TimeInForce::FOK] {
            let request =
                OrderRequest::limit("BNBUSDT", Side::Buy, dec!(2), dec!(310.25), tif);
            assert_eq!(request.order_type, OrderType::Limit);

            let query = build_query(&order_params(&request, 1, 5000));
            assert!(query.contains("&price=310.25&"));
            assert!(query.contains(&format!("&timeInForce={}&", tif)));
        }
    }

    #[test]
    fn test_signed_request_appends_signature() {
        let signer = signer(DOC_SECRET);
        let request = OrderRequestBuilder::market_buy().build();
        let signed = SignedOrderRequest::new(&request, &signer, 1_700_000_000_000, 5000);

        assert_eq!(signed.signature, signer.sign(&signed.query));
        assert_eq!(
            signed.query_string(),
            format!("{}&signature={}", signed.query, signed.signature)
        );
        assert!(signed.query.contains("timestamp=1700000000000"));
    }

    #[test]
    fn test_concurrent_signing_matches_serial() {
        let signer = signer(DOC_SECRET);
        let queries: Vec<String> = (0..64)
            .map(|i| {
                let request = OrderRequest::market("BTCUSDT", Side::Buy, dec!(0.001));
                build_query(&order_params(&request, 1_700_000_000_000 + i, 5000))
            })
            .collect();
        let serial: Vec<String> = queries.iter().map(|q| signer.sign(q)).collect();

        let parallel: Vec<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = queries
                .iter()
                .map(|q| {
                    let signer = &signer;
                    scope.spawn(move || signer.sign(q))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(serial, parallel);
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let debug = format!("{:?}", signer(DOC_SECRET));
        assert!(!debug.contains(DOC_SECRET));
    }
}
