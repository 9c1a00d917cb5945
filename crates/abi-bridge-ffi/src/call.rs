//! Calling resolved native functions through libffi.

use abi_bridge::{Address, NativeCallable, NativeKind, NativeValue, Signature, TransportError};
use libffi::middle::{Arg, Builder, Cif, CodePtr, Type, arg};
use std::ffi::c_void;
use std::fmt;

fn to_libffi_type(kind: NativeKind) -> Type {
    match kind {
        NativeKind::Void => Type::void(),
        NativeKind::Pointer => Type::pointer(),
        NativeKind::UInt8 => Type::u8(),
        NativeKind::UInt16 => Type::u16(),
        NativeKind::UInt32 => Type::u32(),
        NativeKind::UInt64 => Type::u64(),
        NativeKind::SInt8 => Type::i8(),
        NativeKind::SInt16 => Type::i16(),
        NativeKind::SInt32 => Type::i32(),
        NativeKind::SInt64 => Type::i64(),
        NativeKind::Float => Type::f32(),
        NativeKind::Double => Type::f64(),
    }
}

/// Argument storage that stays put while libffi reads from it
enum ArgSlot {
    Pointer(*mut c_void),
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

impl ArgSlot {
    fn marshal(
        index: usize,
        value: &NativeValue,
        expected: NativeKind,
    ) -> Result<Self, TransportError> {
        if value.kind() != expected {
            return Err(TransportError::ArgumentKind {
                index,
                expected,
                got: value.kind(),
            });
        }

        let slot = match *value {
            NativeValue::Pointer(address) => ArgSlot::Pointer(address.as_ptr()),
            NativeValue::UInt8(v) => ArgSlot::UInt8(v),
            NativeValue::UInt16(v) => ArgSlot::UInt16(v),
            NativeValue::UInt32(v) => ArgSlot::UInt32(v),
            NativeValue::UInt64(v) => ArgSlot::UInt64(v),
            NativeValue::SInt8(v) => ArgSlot::SInt8(v),
            NativeValue::SInt16(v) => ArgSlot::SInt16(v),
            NativeValue::SInt32(v) => ArgSlot::SInt32(v),
            NativeValue::SInt64(v) => ArgSlot::SInt64(v),
            NativeValue::Float(v) => ArgSlot::Float(v),
            NativeValue::Double(v) => ArgSlot::Double(v),
            NativeValue::Void => {
                return Err(TransportError::Unsupported(format!("argument {index} is VOID")));
            }
        };
        Ok(slot)
    }

    fn as_arg(&self) -> Arg {
        match self {
            ArgSlot::Pointer(v) => arg(v),
            ArgSlot::UInt8(v) => arg(v),
            ArgSlot::UInt16(v) => arg(v),
            ArgSlot::UInt32(v) => arg(v),
            ArgSlot::UInt64(v) => arg(v),
            ArgSlot::SInt8(v) => arg(v),
            ArgSlot::SInt16(v) => arg(v),
            ArgSlot::SInt32(v) => arg(v),
            ArgSlot::SInt64(v) => arg(v),
            ArgSlot::Float(v) => arg(v),
            ArgSlot::Double(v) => arg(v),
        }
    }
}

/// A native function with a call interface prepared for its signature
pub struct FfiFunction {
    symbol: String,
    signature: Signature,
    cif: Cif,
    code: CodePtr,
}

// SAFETY: the call interface is never mutated after construction and `code`
// points at immutable machine code; libffi only reads both during a call.
unsafe impl Send for FfiFunction {}
unsafe impl Sync for FfiFunction {}

impl FfiFunction {
    /// Prepare a call interface for the function at `address`.
    ///
    /// # Safety
    ///
    /// `address` must point to a function that follows the C calling
    /// convention with exactly `signature`, and must stay valid for as long as
    /// the returned value is used.
    pub unsafe fn new(
        symbol: impl Into<String>,
        address: *const c_void,
        signature: Signature,
    ) -> Self {
        let param_types: Vec<Type> = signature
            .params()
            .iter()
            .map(|&kind| to_libffi_type(kind))
            .collect();
        let cif = Builder::new()
            .args(param_types)
            .res(to_libffi_type(signature.ret()))
            .into_cif();

        FfiFunction {
            symbol: symbol.into(),
            signature,
            cif,
            code: CodePtr::from_ptr(address),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn address(&self) -> Address {
        Address::from_ptr(self.code.as_ptr())
    }
}

impl NativeCallable for FfiFunction {
    fn call(&self, args: &[NativeValue]) -> Result<NativeValue, TransportError> {
        let params = self.signature.params();
        if args.len() != params.len() {
            return Err(TransportError::ArgumentCount {
                expected: params.len(),
                got: args.len(),
            });
        }

        let slots = args
            .iter()
            .zip(params)
            .enumerate()
            .map(|(index, (value, &kind))| ArgSlot::marshal(index, value, kind))
            .collect::<Result<Vec<_>, _>>()?;
        let ffi_args: Vec<Arg> = slots.iter().map(ArgSlot::as_arg).collect();

        tracing::trace!(symbol = %self.symbol, address = %self.address(), "ffi call");

        // SAFETY: the argument kinds were checked against the signature the
        // call interface was built from, and `new` guarantees the function
        // matches that signature. Small integer results are widened to a full
        // register by libffi, so they are read as 64 bits and truncated.
        let result = unsafe {
            match self.signature.ret() {
                NativeKind::Void => {
                    let _: () = self.cif.call(self.code, &ffi_args);
                    NativeValue::Void
                }
                NativeKind::Pointer => {
                    let ptr: *mut c_void = self.cif.call(self.code, &ffi_args);
                    NativeValue::Pointer(Address::from_ptr(ptr as *const c_void))
                }
                NativeKind::UInt8 => NativeValue::UInt8(self.call_widened(&ffi_args) as u8),
                NativeKind::UInt16 => NativeValue::UInt16(self.call_widened(&ffi_args) as u16),
                NativeKind::UInt32 => NativeValue::UInt32(self.call_widened(&ffi_args) as u32),
                NativeKind::UInt64 => NativeValue::UInt64(self.cif.call(self.code, &ffi_args)),
                NativeKind::SInt8 => NativeValue::SInt8(self.call_widened(&ffi_args) as i8),
                NativeKind::SInt16 => NativeValue::SInt16(self.call_widened(&ffi_args) as i16),
                NativeKind::SInt32 => NativeValue::SInt32(self.call_widened(&ffi_args) as i32),
                NativeKind::SInt64 => NativeValue::SInt64(self.cif.call(self.code, &ffi_args)),
                NativeKind::Float => NativeValue::Float(self.cif.call(self.code, &ffi_args)),
                NativeKind::Double => NativeValue::Double(self.cif.call(self.code, &ffi_args)),
            }
        };
        Ok(result)
    }
}

impl FfiFunction {
    unsafe fn call_widened(&self, args: &[Arg]) -> u64 {
        unsafe { self.cif.call::<u64>(self.code, args) }
    }
}

impl fmt::Debug for FfiFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FfiFunction")
            .field("symbol", &self.symbol)
            .field("signature", &self.signature.to_string())
            .field("address", &self.address())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn add_u8(a: u8, b: u8) -> u8 {
        a.wrapping_add(b)
    }

    extern "C" fn negate(v: i16) -> i16 {
        -v
    }

    extern "C" fn scale(v: f64, factor: f32) -> f64 {
        v * factor as f64
    }

    extern "C" fn offset(ptr: *mut c_void, by: u64) -> *mut c_void {
        (ptr as usize + by as usize) as *mut c_void
    }

    fn negate_ptr() -> *const c_void {
        negate as extern "C" fn(i16) -> i16 as *const c_void
    }

    fn function(address: *const c_void, signature: &str) -> FfiFunction {
        unsafe { FfiFunction::new("test", address, Signature::parse(signature).unwrap()) }
    }

    #[test]
    fn test_small_integer_results() {
        let f = function(
            add_u8 as extern "C" fn(u8, u8) -> u8 as *const c_void,
            "(UINT8,UINT8):UINT8",
        );
        assert_eq!(
            f.call(&[NativeValue::UInt8(200), NativeValue::UInt8(100)]),
            Ok(NativeValue::UInt8(44))
        );

        let f = function(negate_ptr(), "(SINT16):SINT16");
        assert_eq!(f.call(&[NativeValue::SInt16(7)]), Ok(NativeValue::SInt16(-7)));
    }

    #[test]
    fn test_floating_point() {
        let f = function(
            scale as extern "C" fn(f64, f32) -> f64 as *const c_void,
            "(DOUBLE,FLOAT):DOUBLE",
        );
        assert_eq!(
            f.call(&[NativeValue::Double(1.5), NativeValue::Float(2.0)]),
            Ok(NativeValue::Double(3.0))
        );
    }

    #[test]
    fn test_pointer_round_trip() {
        let f = function(
            offset as extern "C" fn(*mut c_void, u64) -> *mut c_void as *const c_void,
            "(POINTER,UINT64):POINTER",
        );
        let result = f.call(&[
            NativeValue::Pointer(Address::from_raw(0x1000)),
            NativeValue::UInt64(0x20),
        ]);
        assert_eq!(result, Ok(NativeValue::Pointer(Address::from_raw(0x1020))));
    }

    #[test]
    fn test_argument_count_checked() {
        let f = function(negate_ptr(), "(SINT16):SINT16");
        assert_eq!(
            f.call(&[]),
            Err(TransportError::ArgumentCount {
                expected: 1,
                got: 0
            })
        );
    }

    #[test]
    fn test_argument_kind_checked() {
        let f = function(negate_ptr(), "(SINT16):SINT16");
        assert_eq!(
            f.call(&[NativeValue::SInt32(7)]),
            Err(TransportError::ArgumentKind {
                index: 0,
                expected: NativeKind::SInt16,
                got: NativeKind::SInt32,
            })
        );
    }
}
