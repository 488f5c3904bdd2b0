use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::watch;

use super::StreamError;
use super::dispatch::{EventDispatcher, NotificationSink};
use super::types::RelayEvent;
use crate::telemetry;

/// A data frame delivered by the transport. Control frames never surface here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    Binary(Vec<u8>),
}

/// One live subscription. Blocks until the next data frame arrives.
#[async_trait]
pub trait FrameSource: Send {
    async fn next_frame(&mut self) -> Result<InboundFrame, StreamError>;
}

/// Opens subscriptions to the event feed.
#[async_trait]
pub trait Connector: Send + Sync {
    type Source: FrameSource;

    async fn connect(&self) -> Result<Self::Source, StreamError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    Idle,
    Connecting,
    Streaming,
    Failed,
}

impl StreamState {
    pub fn subscription_active(self) -> bool {
        matches!(self, StreamState::Connecting | StreamState::Streaming)
    }
}

/// Delay applied before reconnecting. The zero policy reconnects immediately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl ReconnectPolicy {
    pub fn immediate() -> Self {
        Self::default()
    }

    /// Exponential backoff starting at `initial`, capped at `max`.
    pub fn backoff(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
        }
    }

    /// Delay before the reconnect that follows `failures` consecutive failures.
    pub fn delay(&self, failures: u32) -> Duration {
        if self.initial.is_zero() || failures == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(failures.saturating_sub(1).min(16));
        self.initial.saturating_mul(factor).min(self.max)
    }
}

/// Long-lived consumer of the event feed. Owns its state; every failure ends
/// the current subscription and triggers a fresh one.
pub struct EventStream<C, S: ?Sized> {
    connector: C,
    dispatcher: EventDispatcher<S>,
    policy: ReconnectPolicy,
    state: watch::Sender<StreamState>,
    reconnects: u64,
    consecutive_failures: u32,
}

impl<C, S> EventStream<C, S>
where
    C: Connector,
    S: NotificationSink + ?Sized,
{
    pub fn new(connector: C, dispatcher: EventDispatcher<S>) -> Self {
        let (state, _) = watch::channel(StreamState::Idle);
        Self {
            connector,
            dispatcher,
            policy: ReconnectPolicy::immediate(),
            state,
            reconnects: 0,
            consecutive_failures: 0,
        }
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> StreamState {
        *self.state.borrow()
    }

    pub fn subscription_active(&self) -> bool {
        self.state().subscription_active()
    }

    pub fn watch_state(&self) -> watch::Receiver<StreamState> {
        self.state.subscribe()
    }

    /// Number of reconnects performed since the stream was created.
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    /// Keep a subscription open until `shutdown` resolves.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let outcome = tokio::select! {
                _ = &mut shutdown => None,
                err = self.subscribe() => Some(err),
            };
            let Some(err) = outcome else {
                break;
            };

            self.transition(StreamState::Failed);
            self.reconnects += 1;
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
            telemetry::record_stream_failure(err.reason());
            tracing::warn!(
                error = %err,
                reconnects = self.reconnects,
                "event stream failed; reconnecting"
            );

            let delay = self.policy.delay(self.consecutive_failures);
            if delay.is_zero() {
                // Watchers get to observe `Failed` before the next attempt.
                tokio::task::yield_now().await;
            } else {
                tracing::debug!(delay_ms = delay.as_millis() as u64, "backing off");
                let interrupted = tokio::select! {
                    _ = &mut shutdown => true,
                    _ = tokio::time::sleep(delay) => false,
                };
                if interrupted {
                    break;
                }
            }
        }

        self.transition(StreamState::Idle);
        tracing::info!(reconnects = self.reconnects, "event stream stopped");
    }

    async fn subscribe(&mut self) -> StreamError {
        match self.consume().await {
            Err(err) => err,
            Ok(never) => match never {},
        }
    }

    async fn consume(&mut self) -> Result<Infallible, StreamError> {
        self.transition(StreamState::Connecting);
        let mut source = self.connector.connect().await?;
        telemetry::record_stream_connect();
        self.transition(StreamState::Streaming);

        loop {
            let text = match source.next_frame().await? {
                InboundFrame::Text(text) => text,
                InboundFrame::Binary(_) => return Err(StreamError::UnexpectedFrame("binary")),
            };

            let event = RelayEvent::decode(&text)?;
            log_event(&event);
            self.dispatcher
                .dispatch(&event)
                .await
                .map_err(StreamError::Sink)?;
            self.consecutive_failures = 0;

            tokio::task::yield_now().await;
        }
    }

    fn transition(&self, next: StreamState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::debug!(from = ?previous, to = ?next, "event stream state changed");
        }
    }
}

fn log_event(event: &RelayEvent) {
    match event {
        RelayEvent::ModuleCreated { module } => {
            tracing::info!(
                module = %module.name,
                id = module.id,
                owner = %module.owner.name,
                owner_id = module.owner.id,
                owner_rank = %module.owner.rank,
                description = %module.description,
                image = %module.image,
                downloads = module.downloads,
                tags = %module.tags.join(", "),
                releases = module.releases.len(),
                "module created"
            );
        }
        RelayEvent::ReleaseCreated { module, release } => {
            tracing::info!(
                module = %module.name,
                id = module.id,
                release_id = %release.id,
                release_version = %release.release_version,
                mod_version = %release.mod_version,
                changelog = %release.changelog,
                downloads = release.downloads,
                "release created"
            );
        }
        RelayEvent::ModuleDeleted { module } => {
            tracing::info!(module = %module.name, id = module.id, "module deleted");
        }
    }
}
