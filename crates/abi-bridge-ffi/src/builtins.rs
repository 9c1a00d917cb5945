//! Support routines bundled with the resolver.

use std::ffi::c_void;
use std::ptr;

/// Native name of the bundled null-pointer routine
pub const GET_NULL_POINTER: &str = "getNullPointer";

/// Returns the platform's null pointer as compiled native code spells it.
pub extern "C" fn get_null_pointer() -> *mut c_void {
    ptr::null_mut()
}

/// Name/address pairs registered when builtins are enabled
pub fn builtin_symbols() -> [(&'static str, *const c_void); 1] {
    [(
        GET_NULL_POINTER,
        get_null_pointer as extern "C" fn() -> *mut c_void as *const c_void,
    )]
}
