//! The contract between the bridge and whatever actually finds and calls
//! native code.
//!
//! An embedder supplies a [`SymbolResolver`]; it hands back a [`NativeHandle`]
//! that the bridge calls with [`NativeValue`] arguments.

use crate::address::Address;
use crate::context::NativeContext;
use crate::errors::{NotAPointer, ResolveError, TransportError};
use crate::signature::{NativeKind, Signature};
use std::sync::Arc;

/// A value crossing the native boundary, tagged with its native kind
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NativeValue {
    Void,
    Pointer(Address),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    SInt8(i8),
    SInt16(i16),
    SInt32(i32),
    SInt64(i64),
    Float(f32),
    Double(f64),
}

impl NativeValue {
    pub const NULL: NativeValue = NativeValue::Pointer(Address::NULL);

    pub fn kind(&self) -> NativeKind {
        match self {
            NativeValue::Void => NativeKind::Void,
            NativeValue::Pointer(_) => NativeKind::Pointer,
            NativeValue::UInt8(_) => NativeKind::UInt8,
            NativeValue::UInt16(_) => NativeKind::UInt16,
            NativeValue::UInt32(_) => NativeKind::UInt32,
            NativeValue::UInt64(_) => NativeKind::UInt64,
            NativeValue::SInt8(_) => NativeKind::SInt8,
            NativeValue::SInt16(_) => NativeKind::SInt16,
            NativeValue::SInt32(_) => NativeKind::SInt32,
            NativeValue::SInt64(_) => NativeKind::SInt64,
            NativeValue::Float(_) => NativeKind::Float,
            NativeValue::Double(_) => NativeKind::Double,
        }
    }

    /// Read the value as a native pointer.
    ///
    /// Only pointer-kinded values qualify; integers are not reinterpreted.
    pub fn as_pointer(&self) -> Result<Address, NotAPointer> {
        match self {
            NativeValue::Pointer(address) => Ok(*address),
            other => Err(NotAPointer { found: other.kind() }),
        }
    }

    pub fn is_null_pointer(&self) -> bool {
        matches!(self, NativeValue::Pointer(address) if address.is_null())
    }
}

impl From<Address> for NativeValue {
    fn from(address: Address) -> Self {
        NativeValue::Pointer(address)
    }
}

/// A resolved native entry point.
///
/// Implementations must tolerate concurrent calls as far as the native routine
/// itself is reentrant; the bridge does not serialize calls.
pub trait NativeCallable: Send + Sync {
    fn call(&self, args: &[NativeValue]) -> Result<NativeValue, TransportError>;
}

impl<F> NativeCallable for F
where
    F: Fn(&[NativeValue]) -> Result<NativeValue, TransportError> + Send + Sync,
{
    fn call(&self, args: &[NativeValue]) -> Result<NativeValue, TransportError> {
        self(args)
    }
}

/// Shared handle to a resolved entry point
pub type NativeHandle = Arc<dyn NativeCallable>;

/// Turns a symbol name and signature into a callable handle.
///
/// Called at most once per symbol name per [`NativeContext`]; the result is
/// cached by the context's binding cache.
pub trait SymbolResolver: Send + Sync {
    fn resolve(
        &self,
        context: &NativeContext,
        name: &str,
        signature: &Signature,
    ) -> Result<NativeHandle, ResolveError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_pointer_accepts_pointers() {
        let value = NativeValue::Pointer(Address::from_raw(0x100));
        assert_eq!(value.as_pointer(), Ok(Address::from_raw(0x100)));
        assert_eq!(NativeValue::NULL.as_pointer(), Ok(Address::NULL));
    }

    #[test]
    fn test_as_pointer_rejects_other_kinds() {
        assert_eq!(
            NativeValue::UInt64(0x100).as_pointer(),
            Err(NotAPointer {
                found: NativeKind::UInt64
            })
        );
        assert_eq!(
            NativeValue::Void.as_pointer(),
            Err(NotAPointer {
                found: NativeKind::Void
            })
        );
    }

    #[test]
    fn test_is_null_pointer() {
        assert!(NativeValue::NULL.is_null_pointer());
        assert!(!NativeValue::Pointer(Address::from_raw(1)).is_null_pointer());
        assert!(!NativeValue::UInt64(0).is_null_pointer());
    }

    #[test]
    fn test_closure_is_callable() {
        let callable: NativeHandle =
            Arc::new(|args: &[NativeValue]| -> Result<NativeValue, TransportError> {
                Ok(NativeValue::UInt32(args.len() as u32))
            });
        let result = callable.call(&[NativeValue::Void, NativeValue::NULL]);
        assert_eq!(result, Ok(NativeValue::UInt32(2)));
    }
}
