use serde::{Deserialize, Serialize};

use super::StreamError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: i64,
    pub name: String,
    pub rank: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub id: String,
    pub release_version: String,
    pub mod_version: String,
    #[serde(default)]
    pub changelog: String,
    #[serde(default)]
    pub downloads: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: i64,
    pub owner: Owner,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub downloads: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub releases: Vec<Release>,
}

/// One notification received from the module event feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayEvent {
    ModuleCreated { module: Module },
    ReleaseCreated { module: Module, release: Release },
    ModuleDeleted { module: Module },
}

const KNOWN_TYPES: [&str; 3] = ["module_created", "release_created", "module_deleted"];

impl RelayEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            RelayEvent::ModuleCreated { .. } => "module_created",
            RelayEvent::ReleaseCreated { .. } => "release_created",
            RelayEvent::ModuleDeleted { .. } => "module_deleted",
        }
    }

    pub fn module(&self) -> &Module {
        match self {
            RelayEvent::ModuleCreated { module }
            | RelayEvent::ReleaseCreated { module, .. }
            | RelayEvent::ModuleDeleted { module } => module,
        }
    }

    /// Decode a text frame, keyed on its `type` field.
    pub fn decode(frame: &str) -> Result<Self, StreamError> {
        let value: serde_json::Value =
            serde_json::from_str(frame).map_err(|err| StreamError::MalformedEvent {
                kind: None,
                reason: err.to_string(),
            })?;

        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);
        let recognized = kind
            .as_deref()
            .is_some_and(|kind| KNOWN_TYPES.contains(&kind));
        if !recognized {
            return Err(StreamError::UnrecognizedEvent {
                kind,
                frame: truncate(frame, 200),
            });
        }

        serde_json::from_value(value).map_err(|err| StreamError::MalformedEvent {
            kind,
            reason: err.to_string(),
        })
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
