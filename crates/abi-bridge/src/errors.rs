//! Error types for resolving and calling native entry points.
//!
//! Two families exist. [`ResolveError`] is an ordinary recoverable error: the
//! embedder decides whether to disable a feature or abort startup.
//! [`TransportError`] and [`NotAPointer`] are reported by the native side, but
//! once they reach a typed operation they are escalated as an
//! [`InternalDefect`] and never handed back as a `Result`.

use crate::signature::NativeKind;
use std::panic;

/// A native entry point could not be bound
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("native symbol '{name}' not found")]
    SymbolNotFound { name: String },
    #[error("invalid native signature '{signature}': {reason}")]
    InvalidSignature { signature: String, reason: String },
    #[error("'{name}' is bound with {bound} argument(s), caller expects {expected}")]
    ArityMismatch {
        name: String,
        bound: usize,
        expected: usize,
    },
    #[error("failed to load native library '{library}': {message}")]
    LibraryLoad { library: String, message: String },
}

/// The native call mechanism refused a call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("expected {expected} argument(s), got {got}")]
    ArgumentCount { expected: usize, got: usize },
    #[error("argument {index} should be {expected}, got {got}")]
    ArgumentKind {
        index: usize,
        expected: NativeKind,
        got: NativeKind,
    },
    #[error("{0}")]
    Unsupported(String),
}

/// A native result could not be read as a pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("native value of kind {found} cannot be read as a pointer")]
pub struct NotAPointer {
    pub found: NativeKind,
}

/// A broken binding between the bridge and native code.
///
/// These are never returned; they are raised with [`raise`] and abort the
/// current operation. Use [`InternalDefect::from_panic`] to recognise one in a
/// caught panic payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InternalDefect {
    #[error("transport failure calling '{symbol}': {source}")]
    Transport {
        symbol: String,
        #[source]
        source: TransportError,
    },
    #[error("'{symbol}' violated its result contract: {source}")]
    ResultShape {
        symbol: String,
        #[source]
        source: NotAPointer,
    },
}

impl InternalDefect {
    pub fn symbol(&self) -> &str {
        match self {
            InternalDefect::Transport { symbol, .. } | InternalDefect::ResultShape { symbol, .. } => {
                symbol
            }
        }
    }

    /// Recover the defect carried by a panic payload, if any
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Option<&InternalDefect> {
        payload.downcast_ref::<InternalDefect>()
    }
}

/// Abort the current native operation with `defect`.
pub fn raise(defect: InternalDefect) -> ! {
    tracing::error!(symbol = defect.symbol(), "internal native bridge defect: {defect}");
    panic::panic_any(defect)
}
