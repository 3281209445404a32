use crate::ir::{LabelId, NodeId};

/// Core error type for control flow reconstruction.
///
/// These cover problems with the *input* (a module that cannot be
/// structured) and with configuration. Invariant violations inside the
/// structurizer itself are bugs and panic instead.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("function `{func}` has no nodes")]
    EmptyFunction { func: String },

    #[error("function `{func}`: {node} branches to {target}, which does not exist")]
    InvalidTarget {
        func: String,
        node: NodeId,
        target: NodeId,
    },

    #[error("function `{func}`: edge {from} -> {to} enters a loop that {to} does not dominate")]
    Irreducible {
        func: String,
        from: NodeId,
        to: NodeId,
    },

    #[error("function `{func}`: {label} is used outside of the construct it names")]
    UnresolvedLabel { func: String, label: LabelId },

    #[error("function `{func}`: {label} is defined more than once")]
    DuplicateLabel { func: String, label: LabelId },

    #[error("function `{func}`: structured output nests {depth} levels deep (limit {limit})")]
    NestingTooDeep {
        func: String,
        depth: usize,
        limit: usize,
    },

    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    #[error("unknown pass: {0}")]
    UnknownPass(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
