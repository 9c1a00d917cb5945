//! The libffi implementation of the bridge's symbol resolver.

use crate::builtins;
use crate::call::FfiFunction;
use crate::config::FfiConfig;
use crate::symbols::SymbolTable;
use abi_bridge::{NativeContext, NativeHandle, ResolveError, Signature, SymbolResolver};
use std::collections::HashMap;
use std::ffi::c_void;
use std::sync::Arc;

pub struct FfiResolver {
    symbols: SymbolTable,
    aliases: HashMap<String, String>,
}

impl FfiResolver {
    /// Resolver with the default configuration: builtins plus the process's
    /// default namespace
    pub fn new() -> Self {
        let config = FfiConfig::default();
        let resolver = FfiResolver {
            symbols: SymbolTable::new(config.search_default),
            aliases: config.aliases,
        };
        resolver.register_builtins();
        resolver
    }

    /// Build a resolver, loading every configured library up front
    pub fn from_config(config: &FfiConfig) -> Result<Self, ResolveError> {
        let mut symbols = SymbolTable::new(config.search_default);
        for library in &config.libraries {
            symbols.load_library(library)?;
        }

        let resolver = FfiResolver {
            symbols,
            aliases: config.aliases.clone(),
        };
        if config.builtins {
            resolver.register_builtins();
        }
        Ok(resolver)
    }

    /// Provide a native routine from the embedding process.
    ///
    /// # Safety
    ///
    /// `address` must be a C-ABI function matching every signature it will be
    /// resolved with, and must stay valid for the lifetime of the resolver and
    /// of any binding created from it.
    pub unsafe fn register_symbol(&self, name: &str, address: *const c_void) {
        self.symbols.register(strip_sigil(name), address);
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// The name actually looked up for `name`: sigil stripped, alias applied
    pub fn native_name<'a>(&'a self, name: &'a str) -> &'a str {
        let name = strip_sigil(name);
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    fn register_builtins(&self) {
        for (name, address) in builtins::builtin_symbols() {
            self.symbols.register(name, address);
        }
    }
}

impl Default for FfiResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolResolver for FfiResolver {
    fn resolve(
        &self,
        _context: &NativeContext,
        name: &str,
        signature: &Signature,
    ) -> Result<NativeHandle, ResolveError> {
        let native_name = self.native_name(name);
        let (address, source) =
            self.symbols
                .lookup(native_name)
                .ok_or_else(|| ResolveError::SymbolNotFound {
                    name: name.to_string(),
                })?;

        tracing::debug!(
            symbol = name,
            native_name,
            ?source,
            signature = %signature,
            "bound native symbol"
        );

        // SAFETY: symbols are trusted to match the signature they are
        // requested with; see the crate-level safety notes.
        let function = unsafe { FfiFunction::new(name, address, signature.clone()) };
        Ok(Arc::new(function))
    }
}

/// Strip the `@` sigil bitcode uses for global names
fn strip_sigil(name: &str) -> &str {
    name.strip_prefix('@').unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_name_strips_sigil() {
        let resolver = FfiResolver::new();
        assert_eq!(resolver.native_name("@__dynamic_cast"), "__dynamic_cast");
        assert_eq!(resolver.native_name("malloc"), "malloc");
    }

    #[test]
    fn test_native_name_applies_alias() {
        let mut config = FfiConfig::default();
        config
            .aliases
            .insert("__cxa_free_exception".to_string(), "free".to_string());
        let resolver = FfiResolver::from_config(&config).unwrap();

        assert_eq!(resolver.native_name("@__cxa_free_exception"), "free");
    }

    #[test]
    fn test_builtins_can_be_disabled() {
        let config = FfiConfig {
            builtins: false,
            search_default: false,
            ..FfiConfig::default()
        };
        let resolver = FfiResolver::from_config(&config).unwrap();
        assert!(resolver.symbols().lookup(builtins::GET_NULL_POINTER).is_none());

        let resolver = FfiResolver::new();
        assert!(resolver.symbols().lookup(builtins::GET_NULL_POINTER).is_some());
    }
}
