//! libffi-backed [`SymbolResolver`](abi_bridge::SymbolResolver) for the native
//! ABI bridge.
//!
//! Symbols are looked up by their native name (the `@` global sigil is
//! stripped) in this order:
//! - symbols registered in-process, including the bundled builtins
//! - libraries listed in the [`FfiConfig`]
//! - the process's default symbol namespace
//!
//! # Safety
//!
//! Calling native code is inherently unsafe. The resolver trusts that a symbol
//! found under a name really has the signature it is resolved with; a wrong
//! signature corrupts memory rather than failing cleanly.

pub mod builtins;
pub mod call;
pub mod config;
pub mod resolver;
pub mod symbols;

pub use call::FfiFunction;
pub use config::{ConfigError, FfiConfig};
pub use resolver::FfiResolver;
pub use symbols::SymbolTable;
