use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("malformed {kind} record on line {line}: expected {expected} columns, found {found}")]
    MalformedMappingRecord {
        line: usize,
        kind: RecordKind,
        expected: usize,
        found: usize,
    },

    #[error("unrecognized class kind `{kind}` for documented class {class}")]
    UnrecognizedClassKind { class: String, kind: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid documentation tree: {0}")]
    DocTree(#[from] serde_json::Error),
}

/// Mapping record tag, used for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Class,
    Field,
    Method,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RecordKind::Class => "class",
            RecordKind::Field => "field",
            RecordKind::Method => "method",
        };
        f.write_str(name)
    }
}
