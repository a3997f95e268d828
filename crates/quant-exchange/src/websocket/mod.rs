//! 실시간 체결 스트림.
//!
//! 프레임 조립 -> 체결 이벤트 분배 -> 리스너 순으로 흐릅니다.

pub mod assembler;
pub mod dispatcher;
pub mod latency;
pub mod stream;

pub use assembler::{FlowControl, FrameAssembler, ReceiveCredit};
pub use dispatcher::{
    parse_trade_event, DispatchOutcome, ListenerRegistry, SubscriptionId, TradeEventListener,
};
pub use latency::LatencyMonitor;
pub use stream::{trade_stream_url, ConnectionState, ErrorObserver, TradeStream};
