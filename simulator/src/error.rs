// error.rs — Library error type
//
// Configuration problems with a source location are reported as
// `Diagnostic`s (see diag.rs); everything a caller can only propagate lands
// here.

use std::path::PathBuf;

use thiserror::Error;

use crate::cell::{CellKind, Port};
use crate::fixed::{Format, FormatError};

#[derive(Debug, Error)]
pub enum SimError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("cell `{cell}` declares no format for port `{port}`")]
    MissingPort { cell: String, port: Port },

    #[error("cell `{cell}` is {kind} and has no port `{port}`")]
    UnexpectedPort {
        cell: String,
        kind: CellKind,
        port: Port,
    },

    #[error("port `{port}` expects {expected}, got a value in {found}")]
    PortFormat {
        port: Port,
        expected: Format,
        found: Format,
    },

    #[error("no cell named `{0}`")]
    UnknownCell(String),

    #[error("configuration has no cells")]
    NoCells,

    #[error("configuration rejected with {0} error(s)")]
    Rejected(usize),
}
