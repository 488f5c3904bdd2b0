//! Consumer side of the module event feed.

use thiserror::Error;

pub mod dispatch;
pub mod sink;
pub mod stream;
pub mod types;
pub mod ws;

pub use dispatch::{EventDispatcher, NotificationSink};
pub use sink::LogSink;
pub use stream::{Connector, EventStream, FrameSource, InboundFrame, ReconnectPolicy, StreamState};
pub use types::{Module, Owner, RelayEvent, Release};
pub use ws::WsConnector;

/// Failures that end the current subscription. All of them are recovered by
/// reconnecting.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("unrecognized event type {kind:?}: {frame}")]
    UnrecognizedEvent { kind: Option<String>, frame: String },

    #[error("malformed {kind:?} event: {reason}")]
    MalformedEvent { kind: Option<String>, reason: String },

    #[error("unexpected {0} frame")]
    UnexpectedFrame(&'static str),

    #[error("event stream closed by remote")]
    Closed,

    #[error("no traffic from event stream within {0:?}")]
    KeepAliveTimeout(std::time::Duration),

    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("notification sink failed: {0:#}")]
    Sink(anyhow::Error),
}

impl StreamError {
    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            StreamError::UnrecognizedEvent { .. } => "unrecognized_event",
            StreamError::MalformedEvent { .. } => "malformed_event",
            StreamError::UnexpectedFrame(_) => "unexpected_frame",
            StreamError::Closed => "closed",
            StreamError::KeepAliveTimeout(_) => "keepalive_timeout",
            StreamError::Transport(_) => "transport",
            StreamError::Sink(_) => "sink",
        }
    }
}
