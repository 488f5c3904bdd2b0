use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::StreamError;
use super::stream::{Connector, FrameSource, InboundFrame};

pub const DEFAULT_EVENTS_URL: &str = "wss://chattriggers.com/api/events";
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(60);

/// WebSocket transport for the event feed.
#[derive(Clone, Debug)]
pub struct WsConnector {
    url: String,
    ping_interval: Duration,
}

impl WsConnector {
    pub fn new(url: impl Into<String>, ping_interval: Duration) -> Self {
        Self {
            url: url.into(),
            ping_interval: ping_interval.max(Duration::from_secs(1)),
        }
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Source = WsSource;

    async fn connect(&self) -> Result<WsSource, StreamError> {
        let (socket, response) = connect_async(self.url.as_str()).await?;
        tracing::info!(url = %self.url, status = %response.status(), "event stream connected");
        Ok(WsSource::new(socket, self.ping_interval))
    }
}

/// An open WebSocket. Pings every interval and gives up when nothing at all,
/// pongs included, has arrived for two intervals.
pub struct WsSource {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    ping: Interval,
    idle_timeout: Duration,
    last_seen: Instant,
}

impl WsSource {
    fn new(socket: WebSocketStream<MaybeTlsStream<TcpStream>>, ping_interval: Duration) -> Self {
        let mut ping = interval_at(Instant::now() + ping_interval, ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            socket,
            ping,
            idle_timeout: ping_interval * 2,
            last_seen: Instant::now(),
        }
    }
}

#[async_trait]
impl FrameSource for WsSource {
    async fn next_frame(&mut self) -> Result<InboundFrame, StreamError> {
        loop {
            tokio::select! {
                _ = self.ping.tick() => {
                    if self.last_seen.elapsed() > self.idle_timeout {
                        return Err(StreamError::KeepAliveTimeout(self.idle_timeout));
                    }
                    self.socket.send(Message::Ping(Vec::new())).await?;
                }
                message = self.socket.next() => {
                    let Some(message) = message else {
                        return Err(StreamError::Closed);
                    };
                    let message = message?;
                    self.last_seen = Instant::now();
                    match message {
                        Message::Text(text) => return Ok(InboundFrame::Text(text)),
                        Message::Binary(data) => return Ok(InboundFrame::Binary(data)),
                        Message::Close(frame) => {
                            tracing::debug!(?frame, "event stream sent close frame");
                            return Err(StreamError::Closed);
                        }
                        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
                    }
                }
            }
        }
    }
}
