use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::types::{Module, RelayEvent, Release};
use crate::telemetry;

/// Receiver of relay notifications, e.g. a chat channel.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn on_module_created(&self, module: &Module) -> Result<()>;

    async fn on_release_created(&self, module: &Module, release: &Release) -> Result<()>;

    async fn on_module_deleted(&self, module: &Module) -> Result<()>;
}

/// Routes each decoded event to exactly one sink callback.
pub struct EventDispatcher<S: ?Sized> {
    sink: Arc<S>,
}

impl<S: ?Sized> Clone for EventDispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
        }
    }
}

impl<S: NotificationSink + ?Sized> EventDispatcher<S> {
    pub fn new(sink: Arc<S>) -> Self {
        Self { sink }
    }

    pub async fn dispatch(&self, event: &RelayEvent) -> Result<()> {
        telemetry::record_event(event.kind());
        match event {
            RelayEvent::ModuleCreated { module } => self.sink.on_module_created(module).await,
            RelayEvent::ReleaseCreated { module, release } => {
                self.sink.on_release_created(module, release).await
            }
            RelayEvent::ModuleDeleted { module } => self.sink.on_module_deleted(module).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl NotificationSink for Recorder {
        async fn on_module_created(&self, module: &Module) -> Result<()> {
            self.calls.lock().unwrap().push(format!("created:{}", module.name));
            Ok(())
        }

        async fn on_release_created(&self, module: &Module, release: &Release) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("release:{}:{}", module.name, release.release_version));
            Ok(())
        }

        async fn on_module_deleted(&self, _module: &Module) -> Result<()> {
            anyhow::bail!("channel unavailable")
        }
    }

    fn module() -> Module {
        serde_json::from_str(
            r#"{"id":1,"owner":{"id":2,"name":"o","rank":"default"},"name":"Mod","description":"","image":"","downloads":0,"tags":[],"releases":[]}"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn routes_to_matching_callback() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = EventDispatcher::new(recorder.clone());

        dispatcher
            .dispatch(&RelayEvent::ModuleCreated { module: module() })
            .await
            .unwrap();
        dispatcher
            .dispatch(&RelayEvent::ReleaseCreated {
                module: module(),
                release: Release {
                    id: "r".to_string(),
                    release_version: "1.2.0".to_string(),
                    mod_version: "2.0.0".to_string(),
                    changelog: String::new(),
                    downloads: 0,
                },
            })
            .await
            .unwrap();

        assert_eq!(
            *recorder.calls.lock().unwrap(),
            vec!["created:Mod".to_string(), "release:Mod:1.2.0".to_string()]
        );
    }

    #[tokio::test]
    async fn sink_failure_propagates() {
        let dispatcher = EventDispatcher::new(Arc::new(Recorder::default()));
        let err = dispatcher
            .dispatch(&RelayEvent::ModuleDeleted { module: module() })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("channel unavailable"));
    }
}
