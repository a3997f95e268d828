//! 네트워크 지연 등급.
//!
//! REST 폴링 왕복 시간과 스트림 이벤트 지연을 같은 기준으로 분류합니다.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 정상 상한 (미만이면 Normal).
pub const LATENCY_WARNING_MS: u64 = 150;

/// 경고 상한 (초과하면 Critical).
pub const LATENCY_CRITICAL_MS: u64 = 400;

/// 지연 등급.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LatencyLevel {
    /// 150ms 미만
    Normal,
    /// 150ms 이상 400ms 이하
    Warning,
    /// 400ms 초과 - 오래된 데이터를 처리할 위험
    Critical,
}

impl LatencyLevel {
    /// 밀리초 단위 지연을 분류합니다.
    pub fn from_millis(ms: u64) -> Self {
        if ms < LATENCY_WARNING_MS {
            LatencyLevel::Normal
        } else if ms <= LATENCY_CRITICAL_MS {
            LatencyLevel::Warning
        } else {
            LatencyLevel::Critical
        }
    }

    pub fn from_duration(duration: Duration) -> Self {
        Self::from_millis(duration.as_millis().min(u64::MAX as u128) as u64)
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            LatencyLevel::Normal => 0,
            LatencyLevel::Warning => 1,
            LatencyLevel::Critical => 2,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => LatencyLevel::Normal,
            1 => LatencyLevel::Warning,
            _ => LatencyLevel::Critical,
        }
    }
}

impl std::fmt::Display for LatencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LatencyLevel::Normal => write!(f, "NORMAL"),
            LatencyLevel::Warning => write!(f, "WARNING"),
            LatencyLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}
