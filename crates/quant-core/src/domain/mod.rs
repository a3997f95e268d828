//! 도메인 모델.

pub mod latency;
pub mod market_data;
pub mod order;

pub use latency::*;
pub use market_data::*;
pub use order::*;
