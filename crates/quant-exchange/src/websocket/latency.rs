//! 스트림 지연 모니터.

use chrono::Utc;
use quant_core::{LatencyLevel, TradeEvent};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use tracing::{debug, warn};

use super::dispatcher::TradeEventListener;

/// 체결 이벤트의 수신 지연(`now - E`)을 등급별로 집계하는 리스너.
#[derive(Debug, Default)]
pub struct LatencyMonitor {
    last_level: AtomicU8,
    last_latency_ms: AtomicU64,
    events: AtomicU64,
    warnings: AtomicU64,
    criticals: AtomicU64,
}

impl LatencyMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 수신 시각을 지정해 이벤트를 기록합니다.
    pub fn record(&self, event: &TradeEvent, received_at_millis: i64) -> LatencyLevel {
        let latency_ms = event.latency_ms(received_at_millis);
        let level = LatencyLevel::from_millis(latency_ms);

        self.last_level.store(level.as_u8(), Ordering::Relaxed);
        self.last_latency_ms.store(latency_ms, Ordering::Relaxed);
        self.events.fetch_add(1, Ordering::Relaxed);

        match level {
            LatencyLevel::Normal => {
                debug!("Stream latency: {} ms | price: {}", latency_ms, event.price);
            }
            LatencyLevel::Warning => {
                self.warnings.fetch_add(1, Ordering::Relaxed);
                debug!("Stream latency elevated: {} ms", latency_ms);
            }
            LatencyLevel::Critical => {
                self.criticals.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Stream latency critical: {} ms | price: {}",
                    latency_ms, event.price
                );
            }
        }

        level
    }

    pub fn last_level(&self) -> LatencyLevel {
        LatencyLevel::from_u8(self.last_level.load(Ordering::Relaxed))
    }

    pub fn last_latency_ms(&self) -> u64 {
        self.last_latency_ms.load(Ordering::Relaxed)
    }

    pub fn events(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }

    pub fn warnings(&self) -> u64 {
        self.warnings.load(Ordering::Relaxed)
    }

    pub fn criticals(&self) -> u64 {
        self.criticals.load(Ordering::Relaxed)
    }
}

impl TradeEventListener for LatencyMonitor {
    fn on_trade_event(&self, event: &TradeEvent) -> anyhow::Result<()> {
        self.record(event, Utc::now().timestamp_millis());
        Ok(())
    }
}
