//! Query facade over the reference index, shared by the CLI and HTTP surfaces.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Result, bail};
use modrelay_index::{DEFAULT_LIMIT, DocEntity, ReferenceIndex, is_obfuscated};
use serde::{Deserialize, Serialize};

use crate::telemetry;

const ZERO_WIDTH_SPACE: char = '\u{200B}';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingKind {
    Field,
    Method,
    Class,
}

impl FromStr for MappingKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "field" => Ok(MappingKind::Field),
            "method" => Ok(MappingKind::Method),
            "class" => Ok(MappingKind::Class),
            other => bail!(
                "unrecognized type `{}`; valid types are: `method`, `field`, `class`",
                other.replace('`', "\\`")
            ),
        }
    }
}

impl MappingKind {
    fn label(self) -> &'static str {
        match self {
            MappingKind::Field => "field",
            MappingKind::Method => "method",
            MappingKind::Class => "class",
        }
    }
}

/// A name pair as shown to the user: the queried side first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingHit {
    pub name: String,
    pub mapped_name: String,
    pub owner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_static: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingResults {
    pub kind: MappingKind,
    pub query: String,
    pub obfuscated: bool,
    pub hits: Vec<MappingHit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocsResults {
    pub query: String,
    pub hits: Vec<DocEntity>,
}

/// Insert a zero-width space after every `)` so chat clients can wrap long
/// descriptors. Applied only to rendered output; stored signatures stay raw.
pub fn display_signature(signature: &str) -> String {
    let mut out = String::with_capacity(signature.len() + 8);
    for c in signature.chars() {
        out.push(c);
        if c == ')' {
            out.push(ZERO_WIDTH_SPACE);
        }
    }
    out
}

#[derive(Clone)]
pub struct Lookup {
    index: Arc<ReferenceIndex>,
}

impl Lookup {
    pub fn new(index: Arc<ReferenceIndex>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &ReferenceIndex {
        &self.index
    }

    /// Resolve `name` against one mapping table. `owner` only affects the
    /// order of field and method results.
    pub fn mappings(&self, kind: MappingKind, name: &str, owner: Option<&str>) -> MappingResults {
        let started = Instant::now();
        let obfuscated = kind != MappingKind::Class && is_obfuscated(name);

        let hits: Vec<MappingHit> = match kind {
            MappingKind::Field => self
                .index
                .lookup_fields(name, owner)
                .into_iter()
                .map(|field| {
                    let (name, mapped_name) =
                        oriented(obfuscated, &field.obf_name, &field.deobf_name);
                    MappingHit {
                        name,
                        mapped_name,
                        owner: field.owner_path.clone(),
                        signature: None,
                        display_signature: None,
                        is_static: None,
                    }
                })
                .collect(),
            MappingKind::Method => self
                .index
                .lookup_methods(name, owner)
                .into_iter()
                .map(|method| {
                    let (name, mapped_name) =
                        oriented(obfuscated, &method.obf_name, &method.deobf_name);
                    MappingHit {
                        name,
                        mapped_name,
                        owner: method.owner_path.clone(),
                        signature: Some(method.signature.clone()),
                        display_signature: Some(display_signature(&method.signature)),
                        is_static: Some(method.is_static),
                    }
                })
                .collect(),
            MappingKind::Class => self
                .index
                .classes_from_name(name, DEFAULT_LIMIT)
                .into_iter()
                .map(|class| MappingHit {
                    name: class.display_name.clone(),
                    mapped_name: class.full_path.clone(),
                    owner: class.full_path.clone(),
                    signature: None,
                    display_signature: None,
                    is_static: None,
                })
                .collect(),
        };

        telemetry::record_lookup(kind.label(), elapsed_ms(started));
        tracing::info!(
            kind = kind.label(),
            query = name,
            obfuscated,
            owner,
            hits = hits.len(),
            "mapping lookup"
        );

        MappingResults {
            kind,
            query: name.to_string(),
            obfuscated,
            hits,
        }
    }

    pub fn docs(&self, query: &str) -> DocsResults {
        let started = Instant::now();
        let hits: Vec<DocEntity> = self
            .index
            .docs_from_name(query, DEFAULT_LIMIT)
            .into_iter()
            .cloned()
            .collect();

        telemetry::record_lookup("docs", elapsed_ms(started));
        tracing::info!(query, hits = hits.len(), "docs lookup");

        DocsResults {
            query: query.to_string(),
            hits,
        }
    }
}

fn oriented(obfuscated: bool, obf: &str, deobf: &str) -> (String, String) {
    if obfuscated {
        (obf.to_string(), deobf.to_string())
    } else {
        (deobf.to_string(), obf.to_string())
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
