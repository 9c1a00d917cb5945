//! Per-context memo of resolved native entry points.
//!
//! Every symbol name owns a once-cell. The map lock is held only long enough to
//! find or create that cell, so resolving one name never waits on another,
//! while concurrent first requests for the same name block on the cell and
//! observe a single resolution.

use crate::errors::ResolveError;
use crate::native::NativeHandle;
use crate::signature::Signature;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A symbol name bound to its resolved entry point
pub struct SymbolBinding {
    name: String,
    signature: Signature,
    /// Canonical text of `signature`, compared before parsing on a cache hit
    signature_text: String,
    callable: NativeHandle,
}

impl SymbolBinding {
    pub fn new(name: impl Into<String>, signature: Signature, callable: NativeHandle) -> Self {
        SymbolBinding {
            name: name.into(),
            signature_text: signature.to_string(),
            signature,
            callable,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The signature the symbol was first resolved with
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn arity(&self) -> usize {
        self.signature.arity()
    }

    pub fn callable(&self) -> &NativeHandle {
        &self.callable
    }

    /// Whether `requested` denotes the signature this binding was made with.
    /// Text equal to the canonical form is accepted without parsing.
    pub fn is_bound_with(&self, requested: &str) -> bool {
        if requested == self.signature_text {
            return true;
        }
        matches!(Signature::parse(requested), Ok(parsed) if parsed == self.signature)
    }
}

impl fmt::Debug for SymbolBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolBinding")
            .field("name", &self.name)
            .field("signature", &self.signature.to_string())
            .finish_non_exhaustive()
    }
}

type Slot = Arc<OnceCell<Arc<SymbolBinding>>>;

#[derive(Default)]
pub struct BindingCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl BindingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the binding for `name`, resolving it on first request.
    ///
    /// `signature` is handed to `resolve` only when no binding exists yet. On
    /// a hit the first binding is returned even if `signature` differs from
    /// the one it was bound with. A failed resolution leaves the name unbound
    /// so a later call can try again.
    pub fn get_or_resolve<F>(
        &self,
        name: &str,
        signature: &str,
        resolve: F,
    ) -> Result<Arc<SymbolBinding>, ResolveError>
    where
        F: FnOnce(&Signature) -> Result<NativeHandle, ResolveError>,
    {
        let slot = self.slot(name);

        if let Some(binding) = slot.get() {
            warn_on_conflict(binding, signature);
            return Ok(binding.clone());
        }

        let mut resolved_here = false;
        let result = slot.get_or_try_init(|| {
            resolved_here = true;
            let parsed = Signature::parse(signature)?;
            tracing::debug!(symbol = name, signature = %parsed, "resolving native symbol");
            let callable = resolve(&parsed)?;
            Ok::<_, ResolveError>(Arc::new(SymbolBinding::new(name, parsed, callable)))
        });
        let binding = match result {
            Ok(binding) => binding,
            Err(err) => {
                self.discard_unbound(name, &slot);
                return Err(err);
            }
        };

        if !resolved_here {
            warn_on_conflict(binding, signature);
        }
        Ok(binding.clone())
    }

    /// Look up an existing binding without resolving
    pub fn get(&self, name: &str) -> Option<Arc<SymbolBinding>> {
        let slots = self.slots.lock();
        slots.get(name).and_then(|slot| slot.get().cloned())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of resolved bindings
    pub fn len(&self) -> usize {
        let slots = self.slots.lock();
        slots.values().filter(|slot| slot.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of all resolved bindings, sorted
    pub fn names(&self) -> Vec<String> {
        let slots = self.slots.lock();
        let mut names: Vec<String> = slots
            .iter()
            .filter(|(_, slot)| slot.get().is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    fn slot(&self, name: &str) -> Slot {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get(name) {
            return slot.clone();
        }
        let slot = Slot::default();
        slots.insert(name.to_string(), slot.clone());
        slot
    }

    /// Drop the slot for `name` after a failed resolution, unless another
    /// request holds it or has since bound it. Slots are only cloned under
    /// the map lock, so two strong references means the map and `slot`.
    fn discard_unbound(&self, name: &str, slot: &Slot) {
        let mut slots = self.slots.lock();
        let unused = slots.get(name).is_some_and(|current| {
            Arc::ptr_eq(current, slot) && Arc::strong_count(slot) == 2 && slot.get().is_none()
        });
        if unused {
            slots.remove(name);
        }
    }
}

impl fmt::Debug for BindingCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingCache")
            .field("bound", &self.names())
            .finish()
    }
}

fn warn_on_conflict(binding: &SymbolBinding, requested: &str) {
    if !binding.is_bound_with(requested) {
        tracing::warn!(
            symbol = binding.name(),
            bound = %binding.signature(),
            requested,
            "signature differs from the one the symbol was bound with; keeping the first binding"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransportError;
    use crate::native::NativeValue;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    fn constant(value: NativeValue) -> NativeHandle {
        Arc::new(move |_: &[NativeValue]| -> Result<NativeValue, TransportError> { Ok(value) })
    }

    #[test]
    fn test_second_request_reuses_binding() {
        let cache = BindingCache::new();
        let calls = AtomicUsize::new(0);
        let resolve = |_: &Signature| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(constant(NativeValue::NULL))
        };

        let first = cache.get_or_resolve("@getNullPointer", "():POINTER", resolve).unwrap();
        let second = cache.get_or_resolve("@getNullPointer", "():POINTER", resolve).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_names_resolve_separately() {
        let cache = BindingCache::new();
        let calls = AtomicUsize::new(0);
        let resolve = |_: &Signature| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(constant(NativeValue::Void))
        };

        cache.get_or_resolve("@a", "():VOID", resolve).unwrap();
        cache.get_or_resolve("@b", "(POINTER):VOID", resolve).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.names(), vec!["@a".to_string(), "@b".to_string()]);
    }

    #[test]
    fn test_first_signature_is_authoritative() {
        let cache = BindingCache::new();
        cache
            .get_or_resolve("@f", "(POINTER):VOID", |_| Ok(constant(NativeValue::Void)))
            .unwrap();

        let binding = cache
            .get_or_resolve("@f", "(UINT64,UINT64):POINTER", |_| {
                panic!("resolver must not run on a cache hit")
            })
            .unwrap();

        assert_eq!(binding.signature().to_string(), "(POINTER):VOID");
        assert_eq!(binding.arity(), 1);
    }

    #[test]
    fn test_failed_resolution_is_not_cached() {
        let cache = BindingCache::new();
        let err = cache
            .get_or_resolve("@missing", "():VOID", |_| {
                Err(ResolveError::SymbolNotFound {
                    name: "@missing".to_string(),
                })
            })
            .unwrap_err();

        assert!(matches!(err, ResolveError::SymbolNotFound { .. }));
        assert!(!cache.contains("@missing"));
        assert!(cache.is_empty());

        let binding = cache
            .get_or_resolve("@missing", "():VOID", |_| Ok(constant(NativeValue::Void)))
            .unwrap();
        assert_eq!(binding.name(), "@missing");
        assert!(cache.contains("@missing"));
    }

    #[test]
    fn test_failed_names_leave_no_slots() {
        let cache = BindingCache::new();
        for name in ["@gone_a", "@gone_b", "@gone_c"] {
            let result = cache.get_or_resolve(name, "():VOID", |_| {
                Err(ResolveError::SymbolNotFound {
                    name: name.to_string(),
                })
            });
            assert!(result.is_err());
        }
        cache
            .get_or_resolve("@bad_signature", "VOID", |_| Ok(constant(NativeValue::Void)))
            .unwrap_err();

        assert!(cache.slots.lock().is_empty());

        cache
            .get_or_resolve("@kept", "():VOID", |_| Ok(constant(NativeValue::Void)))
            .unwrap();
        assert_eq!(cache.slots.lock().len(), 1);
    }

    #[test]
    fn test_is_bound_with() {
        let binding = SymbolBinding::new(
            "@__dynamic_cast",
            Signature::parse("(POINTER,POINTER,POINTER,UINT64):POINTER").unwrap(),
            constant(NativeValue::NULL),
        );

        assert!(binding.is_bound_with("(POINTER,POINTER,POINTER,UINT64):POINTER"));
        assert!(binding.is_bound_with(" (POINTER, POINTER, POINTER, UINT64) : POINTER"));
        assert!(!binding.is_bound_with("(POINTER):POINTER"));
        assert!(!binding.is_bound_with("not a signature"));
    }

    #[test]
    fn test_invalid_signature_skips_resolver() {
        let cache = BindingCache::new();
        let err = cache
            .get_or_resolve("@f", "POINTER->VOID", |_| {
                panic!("resolver must not run for an invalid signature")
            })
            .unwrap_err();
        assert!(matches!(err, ResolveError::InvalidSignature { .. }));
        assert!(cache.get("@f").is_none());
    }

    #[test]
    fn test_concurrent_first_requests_resolve_once() {
        const THREADS: usize = 8;
        let cache = BindingCache::new();
        let calls = AtomicUsize::new(0);
        let barrier = Barrier::new(THREADS);

        let bindings: Vec<Arc<SymbolBinding>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        cache
                            .get_or_resolve("@__dynamic_cast", "(POINTER):POINTER", |_| {
                                calls.fetch_add(1, Ordering::SeqCst);
                                thread::sleep(std::time::Duration::from_millis(5));
                                Ok(constant(NativeValue::NULL))
                            })
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for binding in &bindings[1..] {
            assert!(Arc::ptr_eq(&bindings[0], binding));
        }
    }
}
