//! 거래소 클라이언트 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 현재가 조회
//! quant price -s BTCUSDT
//!
//! # 최근 체결 20건
//! quant trades -s ETHUSDT -l 20
//!
//! # 테스트넷 시장가 매수 (기본: BTCUSDT 0.001)
//! quant order
//!
//! # 지정가 매도
//! quant order -s BTCUSDT --side SELL -t LIMIT -q 0.001 -p 65000 --tif IOC
//!
//! # 실시간 체결 스트림 60초
//! quant stream -s BTCUSDT -d 60
//! ```
//!
//! 설정은 `config/default.toml`과 `QUANT__` 환경 변수(.env 포함)에서 읽습니다.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use quant_core::{init_logging, AppConfig, OrderType, Side, TimeInForce, DEFAULT_CONFIG_PATH};
use quant_exchange::{OrderExecutor, OrderResult};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use quant_cli::commands::market::{show_price, show_trades};
use quant_cli::commands::order::{build_request, describe, place_order, OrderArgs};
use quant_cli::commands::stream::run_stream;

#[derive(Parser)]
#[command(name = "quant")]
#[command(about = "Crypto exchange client - 서명 주문 및 실시간 체결 스트림", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 현재가 조회 (REST)
    Price {
        /// 거래 심볼 (예: BTCUSDT)
        #[arg(short, long, default_value = "BTCUSDT")]
        symbol: String,
    },

    /// 최근 체결 조회 (REST)
    Trades {
        /// 거래 심볼
        #[arg(short, long, default_value = "BTCUSDT")]
        symbol: String,

        /// 조회 개수
        #[arg(short, long, default_value = "10")]
        limit: u32,
    },

    /// 서명된 주문 제출
    Order {
        /// 거래 심볼
        #[arg(short, long, default_value = "BTCUSDT")]
        symbol: String,

        /// 주문 방향 (BUY, SELL)
        #[arg(long, default_value = "BUY")]
        side: Side,

        /// 주문 유형 (MARKET, LIMIT)
        #[arg(short = 't', long = "type", default_value = "MARKET")]
        order_type: OrderType,

        /// 수량
        #[arg(short, long, default_value = "0.001")]
        quantity: Decimal,

        /// 지정가 (LIMIT 전용)
        #[arg(short, long)]
        price: Option<Decimal>,

        /// 유효 기간 (GTC, IOC, FOK; LIMIT 기본 GTC)
        #[arg(long)]
        tif: Option<TimeInForce>,

        /// 드라이런 모드 (검증만 하고 제출하지 않음)
        #[arg(long, default_value = "false")]
        dry_run: bool,
    },

    /// 실시간 체결 스트림
    Stream {
        /// 거래 심볼
        #[arg(short, long, default_value = "BTCUSDT")]
        symbol: String,

        /// 실행 시간 (초, 지정하지 않으면 Ctrl+C까지)
        #[arg(short, long)]
        duration: Option<u64>,

        /// 이벤트 출력 생략 (지연 요약만)
        #[arg(long, default_value = "false")]
        quiet: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env 파일은 선택 사항
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let app = AppConfig::load(&cli.config)?;
    init_logging(app.logging.to_log_config()?).map_err(|e| anyhow!(e.to_string()))?;

    let config = Arc::new(app.client);
    info!("Order endpoint: {}", config.order_base_url());

    match cli.command {
        Commands::Price { symbol } => show_price(config, &symbol).await?,

        Commands::Trades { symbol, limit } => show_trades(config, &symbol, limit).await?,

        Commands::Order {
            symbol,
            side,
            order_type,
            quantity,
            price,
            tif,
            dry_run,
        } => {
            let request = build_request(&OrderArgs {
                symbol,
                side,
                order_type,
                quantity,
                price,
                time_in_force: tif,
            });

            if dry_run {
                request.validate()?;
                println!("Dry run: {:?}", request);
                return Ok(());
            }

            let executor = OrderExecutor::new(Arc::clone(&config))?;
            // 스트림 등 다른 작업과 분리된 태스크에서 제출
            let result = tokio::spawn(async move { place_order(&executor, &request).await })
                .await??;

            println!("{}", describe(&result));
            if let OrderResult::Accepted(ack) = &result {
                println!("{}", serde_json::to_string_pretty(&ack.raw)?);
            }
            if !result.is_accepted() {
                error!("Order was not accepted");
                std::process::exit(1);
            }
        }

        Commands::Stream {
            symbol,
            duration,
            quiet,
        } => {
            let summary = run_stream(
                &config,
                &symbol,
                duration.map(Duration::from_secs),
                quiet,
            )
            .await?;

            println!(
                "\n체결 이벤트: {} (경고 {}, 위험 {})",
                summary.events, summary.warnings, summary.criticals
            );
        }
    }

    Ok(())
}
