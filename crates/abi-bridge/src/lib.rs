//! Bridge between the bitcode interpreter and the native C++ ABI support
//! routines it cannot express in its own instruction stream.
//!
//! The interpreter asks a [`NativeContext`] for one of three typed operations:
//!
//! - [`NullPointerOp`]: the canonical null pointer as the native side spells it
//! - [`DynamicCastOp`]: `__dynamic_cast` runtime type identification
//! - [`FreeExceptionOp`]: `__cxa_free_exception` on the unwinding path
//!
//! Each native entry point is resolved at most once per context through the
//! embedder's [`SymbolResolver`] and cached in the context's [`BindingCache`].

pub mod address;
pub mod cache;
pub mod context;
pub mod errors;
pub mod invoke;
pub mod native;
pub mod ops;
pub mod signature;

#[doc(hidden)]
pub mod test_utils;

// Re-export commonly used types for convenience
pub use address::Address;
pub use cache::{BindingCache, SymbolBinding};
pub use context::{AbiSupport, NativeContext};
pub use errors::{InternalDefect, NotAPointer, ResolveError, TransportError};
pub use invoke::Invoker;
pub use native::{NativeCallable, NativeHandle, NativeValue, SymbolResolver};
pub use ops::{DynamicCastOp, FreeExceptionOp, NullPointerOp};
pub use signature::{NativeKind, Signature};
