//! Scriptable in-memory resolver for exercising the bridge without native code

use crate::context::NativeContext;
use crate::errors::{ResolveError, TransportError};
use crate::native::{NativeCallable, NativeHandle, NativeValue, SymbolResolver};
use crate::signature::{NativeKind, Signature};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

type Responder = Arc<dyn Fn(&[NativeValue]) -> Result<NativeValue, TransportError> + Send + Sync>;

/// One recorded native call
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedCall {
    pub symbol: String,
    pub args: Vec<NativeValue>,
}

/// Resolver that hands out recording callables.
///
/// Symbols answer with a scripted responder when one is registered, otherwise
/// with a default value for the signature's return kind (null for pointers).
/// Symbols listed with [`RecordingResolver::fail`] are reported as missing.
#[derive(Default)]
pub struct RecordingResolver {
    responders: Mutex<HashMap<String, Responder>>,
    missing: Mutex<Vec<String>>,
    resolutions: Mutex<Vec<String>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    resolve_count: AtomicUsize,
}

impl RecordingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the result of every call to `symbol`
    pub fn respond<F>(self, symbol: &str, responder: F) -> Self
    where
        F: Fn(&[NativeValue]) -> Result<NativeValue, TransportError> + Send + Sync + 'static,
    {
        self.responders
            .lock()
            .insert(symbol.to_string(), Arc::new(responder));
        self
    }

    /// Make resolution of `symbol` fail with `SymbolNotFound`
    pub fn fail(self, symbol: &str) -> Self {
        self.missing.lock().push(symbol.to_string());
        self
    }

    /// Total number of resolver invocations, including failed ones
    pub fn resolve_count(&self) -> usize {
        self.resolve_count.load(Ordering::SeqCst)
    }

    /// Symbol names in the order they were resolved
    pub fn resolutions(&self) -> Vec<String> {
        self.resolutions.lock().clone()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, symbol: &str) -> Vec<Vec<NativeValue>> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.symbol == symbol)
            .map(|call| call.args.clone())
            .collect()
    }
}

impl SymbolResolver for RecordingResolver {
    fn resolve(
        &self,
        _context: &NativeContext,
        name: &str,
        signature: &Signature,
    ) -> Result<NativeHandle, ResolveError> {
        self.resolve_count.fetch_add(1, Ordering::SeqCst);
        self.resolutions.lock().push(name.to_string());

        if self.missing.lock().iter().any(|missing| missing == name) {
            return Err(ResolveError::SymbolNotFound {
                name: name.to_string(),
            });
        }

        let responder = self.responders.lock().get(name).cloned();
        Ok(Arc::new(RecordingCallable {
            symbol: name.to_string(),
            signature: signature.clone(),
            responder,
            calls: self.calls.clone(),
        }))
    }
}

struct RecordingCallable {
    symbol: String,
    signature: Signature,
    responder: Option<Responder>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl NativeCallable for RecordingCallable {
    fn call(&self, args: &[NativeValue]) -> Result<NativeValue, TransportError> {
        self.calls.lock().push(RecordedCall {
            symbol: self.symbol.clone(),
            args: args.to_vec(),
        });

        match &self.responder {
            Some(responder) => responder(args),
            None => Ok(default_for(self.signature.ret())),
        }
    }
}

fn default_for(kind: NativeKind) -> NativeValue {
    match kind {
        NativeKind::Void => NativeValue::Void,
        NativeKind::Pointer => NativeValue::NULL,
        NativeKind::UInt8 => NativeValue::UInt8(0),
        NativeKind::UInt16 => NativeValue::UInt16(0),
        NativeKind::UInt32 => NativeValue::UInt32(0),
        NativeKind::UInt64 => NativeValue::UInt64(0),
        NativeKind::SInt8 => NativeValue::SInt8(0),
        NativeKind::SInt16 => NativeValue::SInt16(0),
        NativeKind::SInt32 => NativeValue::SInt32(0),
        NativeKind::SInt64 => NativeValue::SInt64(0),
        NativeKind::Float => NativeValue::Float(0.0),
        NativeKind::Double => NativeValue::Double(0.0),
    }
}
