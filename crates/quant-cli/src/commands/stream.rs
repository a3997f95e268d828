//! 실시간 체결 스트림 모니터링.

use anyhow::Result;
use quant_core::{ClientConfig, TradeEvent};
use quant_exchange::{ConnectionState, LatencyMonitor, TradeStream};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// 스트림 실행 결과 요약.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub events: u64,
    pub warnings: u64,
    pub criticals: u64,
}

/// 체결 스트림에 연결해 이벤트를 출력합니다.
///
/// Ctrl+C, `duration` 경과, 또는 연결 종료 중 먼저 오는 시점에 멈춥니다.
/// 연결이 끊겨도 재연결하지 않습니다.
pub async fn run_stream(
    config: &ClientConfig,
    symbol: &str,
    duration: Option<Duration>,
    quiet: bool,
) -> Result<StreamSummary> {
    let stream = TradeStream::from_config(config)
        .with_error_observer(|err| error!("Stream terminated: {}", err));

    let monitor = Arc::new(LatencyMonitor::new());
    stream.subscribe(monitor.clone());

    if !quiet {
        stream.subscribe(Arc::new(|event: &TradeEvent| -> anyhow::Result<()> {
            println!(
                "{} price={} event_time={}",
                event
                    .event_time()
                    .map(|t| t.format("%H:%M:%S%.3f").to_string())
                    .unwrap_or_default(),
                event.price,
                event.event_time_millis
            );
            Ok(())
        }));
    }

    stream.connect(symbol).await?;
    let mut states = stream.state_changes();

    let deadline = async {
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
        _ = deadline => info!("Stream duration elapsed"),
        _ = states.wait_for(|s| *s == ConnectionState::Disconnected) => {
            info!("Stream disconnected")
        }
    }

    stream.disconnect().await?;

    Ok(StreamSummary {
        events: monitor.events(),
        warnings: monitor.warnings(),
        criticals: monitor.criticals(),
    })
}
