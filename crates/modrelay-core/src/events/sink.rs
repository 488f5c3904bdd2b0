use anyhow::Result;
use async_trait::async_trait;

use super::dispatch::NotificationSink;
use super::types::{Module, Release};

pub const MODULE_PAGE_BASE: &str = "https://www.chattriggers.com/modules/v";

/// Sink that writes each notification to the log instead of a chat channel.
#[derive(Clone, Debug, Default)]
pub struct LogSink;

pub fn module_page(module: &Module) -> String {
    format!("{MODULE_PAGE_BASE}/{}", module.name)
}

#[async_trait]
impl NotificationSink for LogSink {
    async fn on_module_created(&self, module: &Module) -> Result<()> {
        tracing::info!(
            target: "modrelay::notify",
            title = %format!("Module created: {}", module.name),
            url = %module_page(module),
            author = %module.owner.name,
            tags = %module.tags.join(", "),
            description = %module.description,
            image = (!module.image.trim().is_empty()).then_some(module.image.as_str()),
            "notification"
        );
        Ok(())
    }

    async fn on_release_created(&self, module: &Module, release: &Release) -> Result<()> {
        tracing::info!(
            target: "modrelay::notify",
            title = %format!("Release created for module: {}", module.name),
            url = %module_page(module),
            author = %module.owner.name,
            release_version = %release.release_version,
            mod_version = %release.mod_version,
            changelog = %release.changelog,
            "notification"
        );
        Ok(())
    }

    async fn on_module_deleted(&self, module: &Module) -> Result<()> {
        tracing::info!(
            target: "modrelay::notify",
            title = %format!("Module deleted: {}", module.name),
            "notification"
        );
        Ok(())
    }
}
