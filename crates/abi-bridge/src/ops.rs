//! Typed native operations used by the interpreter.
//!
//! Each operation wraps an [`Invoker`] of fixed arity and owns its own
//! argument marshaling and result conversion. They are cheap to construct;
//! only the underlying binding is cached.

use crate::address::Address;
use crate::cache::SymbolBinding;
use crate::errors::{self, InternalDefect, ResolveError};
use crate::invoke::Invoker;
use crate::native::NativeValue;
use std::sync::Arc;

pub const NULL_POINTER_SYMBOL: &str = "@getNullPointer";
pub const NULL_POINTER_SIGNATURE: &str = "():POINTER";

pub const DYNAMIC_CAST_SYMBOL: &str = "@__dynamic_cast";
pub const DYNAMIC_CAST_SIGNATURE: &str = "(POINTER,POINTER,POINTER,UINT64):POINTER";

pub const FREE_EXCEPTION_SYMBOL: &str = "@__cxa_free_exception";
pub const FREE_EXCEPTION_SIGNATURE: &str = "(POINTER):VOID";

/// Fetches the canonical null pointer from native code.
#[derive(Clone, Debug)]
pub struct NullPointerOp {
    invoker: Invoker<0>,
}

impl NullPointerOp {
    pub fn new(binding: Arc<SymbolBinding>) -> Result<Self, ResolveError> {
        Ok(NullPointerOp {
            invoker: Invoker::new(binding)?,
        })
    }

    /// The null pointer exactly as the native side returns it
    pub fn get_null_pointer(&self) -> NativeValue {
        self.invoker.invoke([])
    }
}

/// Emulates the C++ ABI `__dynamic_cast` support routine.
#[derive(Clone, Debug)]
pub struct DynamicCastOp {
    invoker: Invoker<4>,
}

impl DynamicCastOp {
    pub fn new(binding: Arc<SymbolBinding>) -> Result<Self, ResolveError> {
        Ok(DynamicCastOp {
            invoker: Invoker::new(binding)?,
        })
    }

    /// Cast `object` from `source_type` to `target_type`.
    ///
    /// `source_type` and `target_type` are the RTTI descriptors; `hint` is the
    /// ABI's source-to-destination offset hint and is passed through as-is.
    /// Returns [`Address::NULL`] when the cast is not legal for the object's
    /// dynamic type.
    pub fn execute_cast(
        &self,
        object: Address,
        source_type: Address,
        target_type: Address,
        hint: u64,
    ) -> Address {
        let result = self.invoker.invoke([
            NativeValue::Pointer(object),
            NativeValue::Pointer(source_type),
            NativeValue::Pointer(target_type),
            NativeValue::UInt64(hint),
        ]);
        match result.as_pointer() {
            Ok(address) => address,
            Err(source) => errors::raise(InternalDefect::ResultShape {
                symbol: self.invoker.symbol().to_string(),
                source,
            }),
        }
    }
}

/// Emulates the C++ ABI `__cxa_free_exception` routine.
#[derive(Clone, Debug)]
pub struct FreeExceptionOp {
    invoker: Invoker<1>,
}

impl FreeExceptionOp {
    pub fn new(binding: Arc<SymbolBinding>) -> Result<Self, ResolveError> {
        Ok(FreeExceptionOp {
            invoker: Invoker::new(binding)?,
        })
    }

    /// Release the exception object at `ptr`. `ptr` must not be used afterwards.
    pub fn free(&self, ptr: Address) {
        self.invoker.invoke([NativeValue::Pointer(ptr)]);
    }
}

#[cfg(test)]
#[path = "ops_tests.rs"]
mod ops_tests;
