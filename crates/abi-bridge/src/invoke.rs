//! Fixed-arity invocation of a bound native entry point.

use crate::cache::SymbolBinding;
use crate::errors::{self, InternalDefect, ResolveError};
use crate::native::NativeValue;
use std::sync::Arc;

/// Calls one bound entry point with exactly `N` arguments.
///
/// The argument count is part of the type, so a typed operation cannot pass
/// the wrong number of values. Construction checks `N` against the signature
/// the symbol was bound with.
#[derive(Clone, Debug)]
pub struct Invoker<const N: usize> {
    binding: Arc<SymbolBinding>,
}

impl<const N: usize> Invoker<N> {
    pub fn new(binding: Arc<SymbolBinding>) -> Result<Self, ResolveError> {
        if binding.arity() != N {
            return Err(ResolveError::ArityMismatch {
                name: binding.name().to_string(),
                bound: binding.arity(),
                expected: N,
            });
        }
        Ok(Invoker { binding })
    }

    pub fn binding(&self) -> &Arc<SymbolBinding> {
        &self.binding
    }

    pub fn symbol(&self) -> &str {
        self.binding.name()
    }

    /// Forward `args` to the native side and return its raw result.
    ///
    /// A transport failure is an internal defect and aborts the call.
    pub fn invoke(&self, args: [NativeValue; N]) -> NativeValue {
        tracing::trace!(symbol = self.symbol(), ?args, "native call");
        match self.binding.callable().call(&args) {
            Ok(value) => value,
            Err(source) => errors::raise(InternalDefect::Transport {
                symbol: self.symbol().to_string(),
                source,
            }),
        }
    }
}
