//! Native symbol lookup across registered symbols, loaded libraries and the
//! process's default namespace.

use abi_bridge::ResolveError;
use libloading::Library;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::ffi::c_void;
use std::path::{Path, PathBuf};

/// Where a symbol address was found
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolSource {
    Registered,
    Library(usize),
    Default,
}

pub struct SymbolTable {
    /// Addresses stored as integers so the table stays `Send + Sync`
    registered: RwLock<HashMap<String, usize>>,
    libraries: Vec<(PathBuf, Library)>,
    search_default: bool,
}

impl SymbolTable {
    pub fn new(search_default: bool) -> Self {
        SymbolTable {
            registered: RwLock::new(HashMap::new()),
            libraries: Vec::new(),
            search_default,
        }
    }

    /// Load a shared library and append it to the search order
    pub fn load_library(&mut self, path: &Path) -> Result<(), ResolveError> {
        // Loading runs the library's initializers; configured libraries are trusted.
        let library = unsafe { Library::new(path) }.map_err(|e| ResolveError::LibraryLoad {
            library: path.display().to_string(),
            message: e.to_string(),
        })?;
        tracing::debug!(library = %path.display(), "loaded native library");
        self.libraries.push((path.to_path_buf(), library));
        Ok(())
    }

    pub fn libraries(&self) -> impl Iterator<Item = &Path> {
        self.libraries.iter().map(|(path, _)| path.as_path())
    }

    /// Make `address` resolvable under `name`, shadowing any library symbol
    pub fn register(&self, name: &str, address: *const c_void) {
        self.registered
            .write()
            .insert(name.to_string(), address as usize);
    }

    pub fn lookup(&self, name: &str) -> Option<(*const c_void, SymbolSource)> {
        if let Some(&address) = self.registered.read().get(name) {
            return Some((address as *const c_void, SymbolSource::Registered));
        }

        for (index, (_, library)) in self.libraries.iter().enumerate() {
            if let Ok(symbol) = unsafe { library.get::<*const c_void>(name.as_bytes()) } {
                let ptr = *symbol;
                if !ptr.is_null() {
                    return Some((ptr, SymbolSource::Library(index)));
                }
            }
        }

        if self.search_default {
            return default_symbol(name).map(|ptr| (ptr, SymbolSource::Default));
        }
        None
    }
}

/// Look `name` up in the symbols already loaded into the process
fn default_symbol(name: &str) -> Option<*const c_void> {
    #[cfg(unix)]
    {
        let name_cstr = std::ffi::CString::new(name).ok()?;
        let ptr = unsafe { libc::dlsym(libc::RTLD_DEFAULT, name_cstr.as_ptr()) };
        if ptr.is_null() { None } else { Some(ptr as *const c_void) }
    }

    #[cfg(windows)]
    {
        let this = libloading::os::windows::Library::this().ok()?;
        let symbol = unsafe { this.get::<*const c_void>(name.as_bytes()) }.ok()?;
        let ptr = *symbol;
        if ptr.is_null() { None } else { Some(ptr) }
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = name;
        None
    }
}
