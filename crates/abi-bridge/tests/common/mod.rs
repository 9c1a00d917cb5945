// Common test utilities for bridge integration tests

use abi_bridge::test_utils::RecordingResolver;
use abi_bridge::{Address, NativeContext, NativeValue};
use std::sync::Arc;

pub fn ptr(raw: u64) -> NativeValue {
    NativeValue::Pointer(Address::from_raw(raw))
}

/// A context backed by a fresh recording resolver
pub fn recording_context() -> (Arc<RecordingResolver>, NativeContext) {
    let resolver = Arc::new(RecordingResolver::new());
    let context = NativeContext::with_resolver(resolver.clone());
    (resolver, context)
}
