use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use modrelay_index::{IndexSources, ReferenceIndex};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::cli::ServeArgs;
use crate::events::{
    Connector, EventDispatcher, EventStream, LogSink, NotificationSink, ReconnectPolicy,
    StreamState, WsConnector,
};
use crate::lookup::Lookup;

use super::http;

/// Configuration applied when launching the relay.
#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub sources: IndexSources,
    pub events_url: Option<String>,
    pub http_addr: SocketAddr,
    pub ping_interval: Duration,
    pub reconnect: ReconnectPolicy,
}

impl ServeConfig {
    /// Build a runtime configuration from the CLI arguments.
    pub fn try_from_args(args: ServeArgs) -> Result<Self> {
        if args.ping_interval_secs == 0 {
            bail!("--ping-interval-secs must be at least 1");
        }
        if !args.no_events
            && !(args.events_url.starts_with("ws://") || args.events_url.starts_with("wss://"))
        {
            bail!("--events-url must be a ws:// or wss:// URL, got {}", args.events_url);
        }

        let reconnect = if args.reconnect_delay_ms == 0 {
            ReconnectPolicy::immediate()
        } else {
            ReconnectPolicy::backoff(
                Duration::from_millis(args.reconnect_delay_ms),
                Duration::from_millis(args.reconnect_max_delay_ms),
            )
        };

        Ok(Self {
            sources: args.index.into(),
            events_url: (!args.no_events).then_some(args.events_url),
            http_addr: args.http_addr,
            ping_interval: Duration::from_secs(args.ping_interval_secs),
            reconnect,
        })
    }
}

/// Starts the event stream task at most once.
pub struct StreamSupervisor {
    started: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
    state: watch::Sender<StreamState>,
}

impl Default for StreamSupervisor {
    fn default() -> Self {
        let (state, _) = watch::channel(StreamState::Idle);
        Self {
            started: AtomicBool::new(false),
            handle: Mutex::new(None),
            state,
        }
    }
}

impl StreamSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of the supervised stream.
    pub fn watch_state(&self) -> watch::Receiver<StreamState> {
        self.state.subscribe()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Spawn `stream` unless a stream was already started. Returns whether
    /// this call started it.
    pub async fn ensure_started<C, S>(&self, mut stream: EventStream<C, S>) -> bool
    where
        C: Connector + 'static,
        S: NotificationSink + ?Sized + 'static,
    {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::info!("event stream already started");
            return false;
        }

        let mut stream_state = stream.watch_state();
        let relay = self.state.clone();
        tokio::spawn(async move {
            while stream_state.changed().await.is_ok() {
                let current = *stream_state.borrow_and_update();
                relay.send_replace(current);
            }
        });

        let handle = tokio::spawn(async move {
            stream
                .run_until(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await;
        });
        *self.handle.lock().await = Some(handle);
        true
    }

    /// Wait for the stream task to finish, if one was started.
    pub async fn join(&self) -> Result<()> {
        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle {
            handle.await.context("event stream task panicked")?;
        }
        Ok(())
    }
}

/// Top-level runner: builds the index, starts the stream and serves HTTP.
pub struct RelayServer {
    config: ServeConfig,
}

impl RelayServer {
    pub fn new(config: ServeConfig) -> Self {
        Self { config }
    }

    /// Run until a shutdown signal is received.
    pub async fn run(self) -> Result<()> {
        let sources = self.config.sources.clone();
        let index = tokio::task::spawn_blocking(move || ReferenceIndex::load(&sources))
            .await
            .context("index build task cancelled")?
            .context("failed to build reference index")?;
        let lookup = Lookup::new(Arc::new(index));

        let supervisor = Arc::new(StreamSupervisor::new());
        if let Some(url) = &self.config.events_url {
            let connector = WsConnector::new(url.clone(), self.config.ping_interval);
            let dispatcher = EventDispatcher::new(Arc::new(LogSink));
            let stream =
                EventStream::new(connector, dispatcher).with_policy(self.config.reconnect);
            supervisor.ensure_started(stream).await;
        } else {
            tracing::info!("event stream disabled");
        }

        http::serve(self.config.http_addr, lookup, supervisor.watch_state()).await?;
        supervisor.join().await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Commands};
    use crate::events::{FrameSource, InboundFrame, StreamError};

    /// Never finishes connecting, so a started stream stays in `Connecting`.
    struct StalledConnector;

    struct SilentSource;

    #[async_trait]
    impl FrameSource for SilentSource {
        async fn next_frame(&mut self) -> Result<InboundFrame, StreamError> {
            futures::future::pending().await
        }
    }

    #[async_trait]
    impl Connector for StalledConnector {
        type Source = SilentSource;

        async fn connect(&self) -> Result<SilentSource, StreamError> {
            futures::future::pending().await
        }
    }

    fn stalled_stream() -> EventStream<StalledConnector, LogSink> {
        EventStream::new(StalledConnector, EventDispatcher::new(Arc::new(LogSink)))
    }

    fn serve_args(extra: &[&str]) -> ServeArgs {
        let mut argv = vec!["modrelay", "serve"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Serve(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn defaults_match_feed_settings() {
        let config = ServeConfig::try_from_args(serve_args(&[])).unwrap();
        assert_eq!(
            config.events_url.as_deref(),
            Some("wss://chattriggers.com/api/events")
        );
        assert_eq!(config.ping_interval, Duration::from_secs(60));
        assert_eq!(config.reconnect, ReconnectPolicy::immediate());
    }

    #[test]
    fn backoff_flags_build_policy() {
        let config = ServeConfig::try_from_args(serve_args(&[
            "--reconnect-delay-ms",
            "250",
            "--reconnect-max-delay-ms",
            "5000",
        ]))
        .unwrap();
        assert_eq!(
            config.reconnect,
            ReconnectPolicy::backoff(Duration::from_millis(250), Duration::from_secs(5))
        );
    }

    #[test]
    fn rejects_http_event_url() {
        let err = ServeConfig::try_from_args(serve_args(&["--events-url", "https://example.com"]))
            .unwrap_err();
        assert!(err.to_string().contains("ws://"));
    }

    #[test]
    fn no_events_skips_url() {
        let config = ServeConfig::try_from_args(serve_args(&["--no-events"])).unwrap();
        assert!(config.events_url.is_none());
    }

    #[tokio::test]
    async fn ensure_started_is_a_no_op_while_subscribed() {
        let supervisor = StreamSupervisor::new();
        assert!(!supervisor.is_started());

        assert!(supervisor.ensure_started(stalled_stream()).await);
        assert!(supervisor.is_started());

        let mut state = supervisor.watch_state();
        tokio::time::timeout(
            Duration::from_secs(5),
            state.wait_for(|s| s.subscription_active()),
        )
        .await
        .expect("stream never reported a subscription")
        .unwrap();

        assert!(!supervisor.ensure_started(stalled_stream()).await);
        assert!(supervisor.is_started());
        assert_eq!(*supervisor.watch_state().borrow(), StreamState::Connecting);
    }
}
