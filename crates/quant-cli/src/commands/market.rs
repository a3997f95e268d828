//! 현재가 및 최근 체결 조회.

use anyhow::{Context, Result};
use quant_core::{ClientConfig, LatencyLevel, RecentTrade};
use quant_exchange::MarketDataClient;
use std::sync::Arc;
use tracing::{info, warn};

/// 현재가 출력.
pub async fn show_price(config: Arc<ClientConfig>, symbol: &str) -> Result<()> {
    let client = MarketDataClient::new(config)?;
    let ticker = client
        .ticker_price(symbol)
        .await
        .with_context(|| format!("Failed to fetch price for {}", symbol))?;

    let level = ticker.latency_level();
    if level == LatencyLevel::Critical {
        warn!("REST latency critical: {} ms", ticker.elapsed.as_millis());
    }

    println!(
        "{} {} ({} ms, {})",
        ticker.value.symbol,
        ticker.value.price,
        ticker.elapsed.as_millis(),
        level
    );
    Ok(())
}

/// 최근 체결 출력.
pub async fn show_trades(config: Arc<ClientConfig>, symbol: &str, limit: u32) -> Result<()> {
    let client = MarketDataClient::new(config)?;
    let trades = client
        .recent_trades(symbol, Some(limit))
        .await
        .with_context(|| format!("Failed to fetch trades for {}", symbol))?;

    info!(
        "Fetched {} trades in {} ms ({})",
        trades.value.len(),
        trades.elapsed.as_millis(),
        trades.latency_level()
    );

    println!("{:<12} {:>16} {:>14} {:<5} time", "id", "price", "qty", "side");
    for trade in &trades.value {
        println!("{}", format_trade(trade));
    }
    Ok(())
}

/// 체결 한 줄 포맷. 매수자가 메이커면 매도 체결입니다.
fn format_trade(trade: &RecentTrade) -> String {
    let side = if trade.is_buyer_maker { "SELL" } else { "BUY" };
    format!(
        "{:<12} {:>16} {:>14} {:<5} {}",
        trade.id,
        trade.price,
        trade.quantity,
        side,
        trade.time.format("%H:%M:%S%.3f")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_trade_side() {
        let mut trade = RecentTrade {
            pair: "BTCUSDT".to_string(),
            id: 42,
            price: dec!(43250.10),
            quantity: dec!(0.002),
            quote_quantity: dec!(86.5002),
            time: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
            is_buyer_maker: true,
        };
        assert!(format_trade(&trade).contains("SELL"));

        trade.is_buyer_maker = false;
        let line = format_trade(&trade);
        assert!(line.contains("BUY"));
        assert!(line.contains("43250.10"));
    }
}
