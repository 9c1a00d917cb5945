//! The per-interpreter-context owner of native bindings.

use crate::cache::{BindingCache, SymbolBinding};
use crate::errors::ResolveError;
use crate::native::SymbolResolver;
use crate::ops::{
    DYNAMIC_CAST_SIGNATURE, DYNAMIC_CAST_SYMBOL, DynamicCastOp, FREE_EXCEPTION_SIGNATURE,
    FREE_EXCEPTION_SYMBOL, FreeExceptionOp, NULL_POINTER_SIGNATURE, NULL_POINTER_SYMBOL,
    NullPointerOp,
};
use std::fmt;
use std::sync::Arc;

/// Native state for one interpreter context.
///
/// Owns the binding cache; bindings live exactly as long as the context.
pub struct NativeContext {
    resolver: Arc<dyn SymbolResolver>,
    bindings: BindingCache,
}

impl NativeContext {
    pub fn new<R: SymbolResolver + 'static>(resolver: R) -> Self {
        Self::with_resolver(Arc::new(resolver))
    }

    pub fn with_resolver(resolver: Arc<dyn SymbolResolver>) -> Self {
        NativeContext {
            resolver,
            bindings: BindingCache::new(),
        }
    }

    pub fn bindings(&self) -> &BindingCache {
        &self.bindings
    }

    /// Bind `name`, consulting the resolver only on first request.
    ///
    /// The resolver must not request the same name on this context while it
    /// is resolving it.
    pub fn resolve(&self, name: &str, signature: &str) -> Result<Arc<SymbolBinding>, ResolveError> {
        self.bindings.get_or_resolve(name, signature, |parsed| {
            self.resolver.resolve(self, name, parsed)
        })
    }

    pub fn null_pointer_op(&self) -> Result<NullPointerOp, ResolveError> {
        NullPointerOp::new(self.resolve(NULL_POINTER_SYMBOL, NULL_POINTER_SIGNATURE)?)
    }

    pub fn dynamic_cast_op(&self) -> Result<DynamicCastOp, ResolveError> {
        DynamicCastOp::new(self.resolve(DYNAMIC_CAST_SYMBOL, DYNAMIC_CAST_SIGNATURE)?)
    }

    pub fn free_exception_op(&self) -> Result<FreeExceptionOp, ResolveError> {
        FreeExceptionOp::new(self.resolve(FREE_EXCEPTION_SYMBOL, FREE_EXCEPTION_SIGNATURE)?)
    }

    /// Try to bind all three routines and report which ABI features work.
    ///
    /// Meant for startup: an embedder disables RTTI or C++ exception support
    /// for a missing routine instead of failing on every call.
    pub fn probe_abi_support(&self) -> AbiSupport {
        let support = AbiSupport {
            null_pointer: self.null_pointer_op().map(|_| ()),
            dynamic_cast: self.dynamic_cast_op().map(|_| ()),
            free_exception: self.free_exception_op().map(|_| ()),
        };
        for (feature, err) in support.unavailable() {
            tracing::warn!(feature, "native ABI support unavailable: {err}");
        }
        support
    }
}

impl fmt::Debug for NativeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeContext")
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

/// Which native ABI routines could be bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiSupport {
    pub null_pointer: Result<(), ResolveError>,
    pub dynamic_cast: Result<(), ResolveError>,
    pub free_exception: Result<(), ResolveError>,
}

impl AbiSupport {
    /// `dynamic_cast` on polymorphic types can be emulated
    pub fn rtti(&self) -> bool {
        self.dynamic_cast.is_ok()
    }

    /// Exception objects can be released on the unwinding path
    pub fn exceptions(&self) -> bool {
        self.free_exception.is_ok()
    }

    pub fn null_pointer(&self) -> bool {
        self.null_pointer.is_ok()
    }

    pub fn is_complete(&self) -> bool {
        self.unavailable().is_empty()
    }

    pub fn unavailable(&self) -> Vec<(&'static str, &ResolveError)> {
        [
            ("null-pointer", &self.null_pointer),
            ("rtti", &self.dynamic_cast),
            ("exceptions", &self.free_exception),
        ]
        .into_iter()
        .filter_map(|(feature, result)| result.as_ref().err().map(|err| (feature, err)))
        .collect()
    }
}
