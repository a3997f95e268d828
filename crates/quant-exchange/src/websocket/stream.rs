//! 실시간 체결 스트림 연결 관리.
//!
//! 상태 전이:
//!
//! ```text
//! Disconnected -> Connecting -> Open -> Closing -> Disconnected
//!                                    \-> Errored -> Disconnected
//! ```
//!
//! 자동 재연결은 하지 않습니다. 전송 에러는 에러 옵저버로 전달되고, 재연결 여부는
//! 호출자가 결정합니다.

use futures::{SinkExt, StreamExt};
use quant_core::ClientConfig;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, trace, warn, Instrument};

use super::assembler::{FlowControl, FrameAssembler, ReceiveCredit};
use super::dispatcher::{ListenerRegistry, SubscriptionId, TradeEventListener};
use crate::traits::ExchangeResult;
use crate::ExchangeError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 스트림 구독 접미사.
pub const TRADE_STREAM_SUFFIX: &str = "@trade";

/// 전송 에러 옵저버.
pub type ErrorObserver = Arc<dyn Fn(&ExchangeError) + Send + Sync>;

/// 연결 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closing,
    Errored,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "DISCONNECTED"),
            ConnectionState::Connecting => write!(f, "CONNECTING"),
            ConnectionState::Open => write!(f, "OPEN"),
            ConnectionState::Closing => write!(f, "CLOSING"),
            ConnectionState::Errored => write!(f, "ERRORED"),
        }
    }
}

/// 심볼의 체결 스트림 URL.
pub fn trade_stream_url(ws_base_url: &str, symbol: &str) -> String {
    format!(
        "{}{}{}",
        ws_base_url,
        symbol.to_lowercase(),
        TRADE_STREAM_SUFFIX
    )
}

/// 상태 전이와 에러 통지를 담당하는 공유 핸들.
#[derive(Clone)]
struct StateHandle {
    tx: Arc<watch::Sender<ConnectionState>>,
    observer: Option<ErrorObserver>,
}

impl StateHandle {
    fn set(&self, state: ConnectionState) {
        let previous = self.tx.send_replace(state);
        if previous != state {
            debug!("Stream state: {} -> {}", previous, state);
        }
    }

    fn get(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    /// `Errored`를 거쳐 `Disconnected`로 전이하고 옵저버에 에러를 알립니다.
    fn fail(&self, err: &ExchangeError) {
        error!("Trade stream error: {}", err);
        self.set(ConnectionState::Errored);
        if let Some(observer) = &self.observer {
            observer(err);
        }
        self.set(ConnectionState::Disconnected);
    }
}

struct Session {
    url: String,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// 체결 스트림 연결 관리자.
///
/// 리스너는 연결 전후 언제든 등록할 수 있으며, 같은 인스턴스를 재연결하면 유지됩니다.
pub struct TradeStream {
    ws_base_url: String,
    connect_timeout: Duration,
    listeners: Arc<ListenerRegistry>,
    state: StateHandle,
    session: Mutex<Option<Session>>,
}

impl fmt::Debug for TradeStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TradeStream")
            .field("ws_base_url", &self.ws_base_url)
            .field("state", &self.state())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl TradeStream {
    /// 새 스트림 관리자 생성.
    pub fn new(ws_base_url: impl Into<String>, connect_timeout: Duration) -> Self {
        let (tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            ws_base_url: ws_base_url.into(),
            connect_timeout,
            listeners: Arc::new(ListenerRegistry::new()),
            state: StateHandle {
                tx: Arc::new(tx),
                observer: None,
            },
            session: Mutex::new(None),
        }
    }

    /// 설정에서 생성 (`api.websocket.base.url`, 연결 타임아웃).
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.ws_base_url.clone(), config.connect_timeout)
    }

    /// 전송 에러 옵저버 설정.
    pub fn with_error_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&ExchangeError) + Send + Sync + 'static,
    {
        self.state.observer = Some(Arc::new(observer));
        self
    }

    pub fn subscribe(&self, listener: Arc<dyn TradeEventListener>) -> SubscriptionId {
        let id = self.listeners.subscribe(listener);
        debug!(subscription = %id, "Trade listener subscribed");
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.listeners
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// 상태 변경 구독. 빠른 연속 전이는 마지막 값만 관찰될 수 있습니다.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.tx.subscribe()
    }

    /// 심볼의 체결 스트림에 연결합니다.
    ///
    /// 핸드셰이크가 끝날 때까지 대기합니다. 성공하면 읽기 태스크가 시작됩니다.
    pub async fn connect(&self, symbol: &str) -> ExchangeResult<()> {
        let mut session = self.session.lock().await;
        if self.state() != ConnectionState::Disconnected {
            return Err(ExchangeError::AlreadyConnected);
        }

        let url = trade_stream_url(&self.ws_base_url, symbol);
        info!("Connecting to trade stream: {}", url);
        self.state.set(ConnectionState::Connecting);

        let ws = match tokio::time::timeout(self.connect_timeout, connect_async(url.as_str())).await
        {
            Ok(Ok((ws, _))) => ws,
            Ok(Err(e)) => {
                let err = ExchangeError::from(e);
                self.state.fail(&err);
                return Err(err);
            }
            Err(_) => {
                let err = ExchangeError::StreamTransport(format!(
                    "handshake timed out after {:?}",
                    self.connect_timeout
                ));
                self.state.fail(&err);
                return Err(err);
            }
        };

        self.state.set(ConnectionState::Open);
        info!("Trade stream open: {}", url);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let span = tracing::info_span!("trade_stream", symbol = %symbol.to_uppercase());
        let task = tokio::spawn(
            read_loop(
                ws,
                Arc::clone(&self.listeners),
                self.state.clone(),
                shutdown_rx,
            )
            .instrument(span),
        );

        *session = Some(Session {
            url,
            shutdown: shutdown_tx,
            task,
        });

        Ok(())
    }

    /// 연결을 닫습니다 (`Open -> Closing -> Disconnected`).
    ///
    /// 연결되어 있지 않으면 아무 일도 하지 않습니다.
    pub async fn disconnect(&self) -> ExchangeResult<()> {
        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };

        info!("Disconnecting trade stream: {}", session.url);
        // 읽기 태스크가 이미 끝났으면 수신자가 없음
        let _ = session.shutdown.send(());

        if let Err(e) = session.task.await {
            warn!("Trade stream task ended abnormally: {}", e);
            self.state.set(ConnectionState::Disconnected);
        }

        Ok(())
    }
}

/// 연결 하나의 읽기 루프.
///
/// 허용량이 있을 때만 다음 프레임을 읽고, 분배가 끝난 뒤에 다음 프레임으로 넘어갑니다.
async fn read_loop(
    ws: WsStream,
    listeners: Arc<ListenerRegistry>,
    state: StateHandle,
    mut shutdown: oneshot::Receiver<()>,
) {
    let (mut write, mut read) = ws.split();
    let mut assembler = FrameAssembler::new(ReceiveCredit::new(1));

    while assembler.flow_mut().try_acquire() {
        tokio::select! {
            _ = &mut shutdown => {
                state.set(ConnectionState::Closing);
                if let Err(e) = write.send(Message::Close(None)).await {
                    debug!("Close frame not sent: {}", e);
                }
                state.set(ConnectionState::Disconnected);
                info!("Trade stream closed");
                return;
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if let Some(message) = assembler.on_fragment(&text, true) {
                        listeners.dispatch(&message);
                    }
                }
                Some(Ok(Message::Ping(_))) => {
                    // Pong 응답은 tungstenite가 다음 읽기/쓰기 때 보냄
                    assembler.flow_mut().request(1);
                    trace!("Ping received");
                }
                Some(Ok(Message::Close(frame))) => {
                    info!("Trade stream closed by server: {:?}", frame);
                    state.set(ConnectionState::Disconnected);
                    return;
                }
                Some(Ok(other)) => {
                    assembler.flow_mut().request(1);
                    debug!("Ignoring non-text frame ({} bytes)", other.len());
                }
                Some(Err(e)) => {
                    state.fail(&ExchangeError::from(e));
                    return;
                }
                None => {
                    info!("Trade stream ended");
                    state.set(ConnectionState::Disconnected);
                    return;
                }
            }
        }
    }

    state.set(ConnectionState::Disconnected);
}
