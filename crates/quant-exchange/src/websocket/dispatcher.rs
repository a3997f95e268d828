//! 체결 이벤트 분배.
//!
//! 조립된 메시지에서 `p`(가격)와 `E`(이벤트 시각)를 꺼내 `TradeEvent`를 만들고,
//! 구독 순서대로 리스너를 동기 호출합니다.
//!
//! 리스너 호출은 읽기 태스크 안에서 이루어집니다. 느린 리스너는 다음 프레임 처리와
//! 수신 허용량 부여를 그만큼 지연시킵니다.

use quant_core::TradeEvent;
use serde_json::Value;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{error, trace, warn};

use crate::ExchangeError;

/// 체결 이벤트 리스너.
pub trait TradeEventListener: Send + Sync {
    /// 이벤트 하나를 처리합니다. `Err`는 기록만 되고 다른 리스너에 영향을 주지 않습니다.
    fn on_trade_event(&self, event: &TradeEvent) -> anyhow::Result<()>;
}

impl<F> TradeEventListener for F
where
    F: Fn(&TradeEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn on_trade_event(&self, event: &TradeEvent) -> anyhow::Result<()> {
        self(event)
    }
}

/// 구독 식별자.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// 메시지 하나의 분배 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 이벤트가 리스너들에게 전달됨
    Delivered {
        /// 호출된 리스너 수
        listeners: usize,
        /// 실패(에러 또는 panic)한 리스너 수
        failed: usize,
    },
    /// `p` 또는 `E`가 없는 메시지 (정상적인 비체결 메시지)
    NotTradeEvent,
    /// JSON 파싱 실패로 버려진 메시지
    ParseError,
}

/// 메시지에서 체결 이벤트를 추출합니다.
///
/// - `Ok(Some(_))`: 체결 이벤트
/// - `Ok(None)`: `p` 또는 `E` 필드 없음
/// - `Err(StreamParse)`: 잘못된 JSON 또는 숫자로 해석할 수 없는 필드
pub fn parse_trade_event(message: &str) -> Result<Option<TradeEvent>, ExchangeError> {
    let value: Value = serde_json::from_str(message)
        .map_err(|e| ExchangeError::StreamParse(format!("invalid JSON: {}", e)))?;

    let (Some(price), Some(event_time)) = (value.get("p"), value.get("E")) else {
        return Ok(None);
    };

    let price = match price {
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|e| ExchangeError::StreamParse(format!("invalid price '{}': {}", s, e)))?,
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ExchangeError::StreamParse(format!("invalid price {}", n)))?,
        other => {
            return Err(ExchangeError::StreamParse(format!(
                "unexpected price type: {}",
                other
            )))
        }
    };

    let event_time = match event_time {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| ExchangeError::StreamParse(format!("invalid event time {}", n)))?,
        Value::String(s) => s.parse::<i64>().map_err(|e| {
            ExchangeError::StreamParse(format!("invalid event time '{}': {}", s, e))
        })?,
        other => {
            return Err(ExchangeError::StreamParse(format!(
                "unexpected event time type: {}",
                other
            )))
        }
    };

    Ok(Some(TradeEvent::new(price, event_time)))
}

type Entry = (SubscriptionId, Arc<dyn TradeEventListener>);

/// 순서가 유지되는 리스너 목록.
///
/// 중복 등록은 허용되며 같은 이벤트를 중복 전달합니다.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: RwLock<Vec<Entry>>,
    next_id: AtomicU64,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 리스너를 목록 끝에 추가합니다.
    pub fn subscribe(&self, listener: Arc<dyn TradeEventListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, listener));
        id
    }

    /// 구독을 제거합니다. 제거되었으면 `true`.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Entry> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// 완성된 메시지 하나를 분배합니다.
    ///
    /// 파싱 실패나 리스너 실패는 모두 여기서 기록되고 흡수됩니다.
    pub fn dispatch(&self, message: &str) -> DispatchOutcome {
        let event = match parse_trade_event(message) {
            Ok(Some(event)) => event,
            Ok(None) => {
                trace!("Ignoring non-trade message: {}", message);
                return DispatchOutcome::NotTradeEvent;
            }
            Err(e) => {
                warn!("Discarding stream message: {}", e);
                return DispatchOutcome::ParseError;
            }
        };

        self.deliver(&event)
    }

    /// 이벤트를 구독 순서대로 모든 리스너에 전달합니다.
    pub fn deliver(&self, event: &TradeEvent) -> DispatchOutcome {
        let listeners = self.snapshot();
        let mut failed = 0;

        for (id, listener) in &listeners {
            match catch_unwind(AssertUnwindSafe(|| listener.on_trade_event(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failed += 1;
                    warn!(subscription = %id, "Trade listener failed: {:#}", e);
                }
                Err(panic) => {
                    failed += 1;
                    error!(
                        subscription = %id,
                        "Trade listener panicked: {}",
                        panic_message(panic.as_ref())
                    );
                }
            }
        }

        DispatchOutcome::Delivered {
            listeners: listeners.len(),
            failed,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type EventLog = Arc<Mutex<Vec<(usize, TradeEvent)>>>;

    fn recorder(tag: usize, log: &EventLog) -> Arc<dyn TradeEventListener> {
        let log = Arc::clone(log);
        Arc::new(move |event: &TradeEvent| -> anyhow::Result<()> {
            log.lock().unwrap().push((tag, *event));
            Ok(())
        })
    }

    #[test]
    fn test_parse_string_price() {
        let event = parse_trade_event(r#"{"p":"100.5","E":1700000000000}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event, TradeEvent::new(100.5, 1_700_000_000_000));
    }

    #[test]
    fn test_parse_numeric_fields() {
        let event = parse_trade_event(r#"{"p":42.25,"E":"1700000000001"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event, TradeEvent::new(42.25, 1_700_000_000_001));
    }

    #[test]
    fn test_parse_full_trade_payload() {
        let message = r#"{"e":"trade","E":1700000000000,"s":"BTCUSDT","t":12345,"p":"43250.10","q":"0.002","T":1699999999998,"m":true,"M":true}"#;
        let event = parse_trade_event(message).unwrap().unwrap();
        assert_eq!(event.price, 43250.10);
        assert_eq!(event.event_time_millis, 1_700_000_000_000);
    }

    #[test]
    fn test_missing_fields_is_not_an_error() {
        assert!(parse_trade_event(r#"{"result":null,"id":1}"#).unwrap().is_none());
        assert!(parse_trade_event(r#"{"p":"1.0"}"#).unwrap().is_none());
        assert!(parse_trade_event(r#"{"E":1}"#).unwrap().is_none());
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = parse_trade_event("{\"p\":").unwrap_err();
        assert!(matches!(err, ExchangeError::StreamParse(_)));

        let err = parse_trade_event(r#"{"p":"abc","E":1}"#).unwrap_err();
        assert!(matches!(err, ExchangeError::StreamParse(_)));
    }

    #[test]
    fn test_dispatch_in_subscription_order() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for tag in 0..3 {
            registry.subscribe(recorder(tag, &log));
        }

        let outcome = registry.dispatch(r#"{"p":"100.5","E":1700000000000}"#);

        assert_eq!(outcome, DispatchOutcome::Delivered { listeners: 3, failed: 0 });
        let expected = TradeEvent::new(100.5, 1_700_000_000_000);
        assert_eq!(
            *log.lock().unwrap(),
            vec![(0, expected), (1, expected), (2, expected)]
        );
    }

    #[test]
    fn test_non_trade_and_invalid_messages_reach_no_listener() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.subscribe(recorder(0, &log));

        assert_eq!(registry.dispatch(r#"{"result":null}"#), DispatchOutcome::NotTradeEvent);
        assert_eq!(registry.dispatch("not json"), DispatchOutcome::ParseError);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failing_listeners_are_isolated() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.subscribe(recorder(0, &log));
        registry.subscribe(Arc::new(|_: &TradeEvent| -> anyhow::Result<()> {
            panic!("listener bug")
        }));
        registry.subscribe(Arc::new(|_: &TradeEvent| -> anyhow::Result<()> {
            anyhow::bail!("downstream unavailable")
        }));
        registry.subscribe(recorder(3, &log));

        let outcome = registry.dispatch(r#"{"p":"1","E":2}"#);

        assert_eq!(outcome, DispatchOutcome::Delivered { listeners: 4, failed: 2 });
        let tags: Vec<usize> = log.lock().unwrap().iter().map(|(t, _)| *t).collect();
        assert_eq!(tags, vec![0, 3]);
    }

    #[test]
    fn test_duplicate_subscription_delivers_twice() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let listener = recorder(7, &log);

        registry.subscribe(Arc::clone(&listener));
        registry.subscribe(listener);
        registry.dispatch(r#"{"p":"1","E":2}"#);

        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_unsubscribe_removes_only_that_entry() {
        let registry = ListenerRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = registry.subscribe(recorder(0, &log));
        registry.subscribe(recorder(1, &log));

        assert!(registry.unsubscribe(first));
        assert!(!registry.unsubscribe(first));
        assert_eq!(registry.len(), 1);

        registry.dispatch(r#"{"p":"1","E":2}"#);
        let tags: Vec<usize> = log.lock().unwrap().iter().map(|(t, _)| *t).collect();
        assert_eq!(tags, vec![1]);
    }

    #[test]
    fn test_subscribe_during_dispatch_does_not_deadlock() {
        let registry = Arc::new(ListenerRegistry::new());
        let inner = Arc::clone(&registry);

        registry.subscribe(Arc::new(move |_: &TradeEvent| -> anyhow::Result<()> {
            inner.subscribe(Arc::new(|_: &TradeEvent| -> anyhow::Result<()> { Ok(()) }));
            Ok(())
        }));

        // 스냅샷 기준으로 분배하므로 이번 분배에는 새 리스너가 포함되지 않음
        let outcome = registry.dispatch(r#"{"p":"1","E":2}"#);
        assert_eq!(outcome, DispatchOutcome::Delivered { listeners: 1, failed: 0 });
        assert_eq!(registry.len(), 2);
    }
}
