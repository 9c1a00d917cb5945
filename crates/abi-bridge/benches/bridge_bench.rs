use abi_bridge::{
    Address, NativeContext, NativeHandle, NativeValue, ResolveError, Signature, SymbolResolver,
    TransportError,
};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;

/// Resolves every symbol to a callable that echoes its first argument
struct EchoResolver;

impl SymbolResolver for EchoResolver {
    fn resolve(
        &self,
        _context: &NativeContext,
        _name: &str,
        _signature: &Signature,
    ) -> Result<NativeHandle, ResolveError> {
        Ok(Arc::new(
            |args: &[NativeValue]| -> Result<NativeValue, TransportError> {
                Ok(args.first().copied().unwrap_or(NativeValue::NULL))
            },
        ))
    }
}

fn bench_cached_op_request(c: &mut Criterion) {
    let context = NativeContext::new(EchoResolver);
    context.dynamic_cast_op().unwrap();

    c.bench_function("request cached dynamic_cast op", |b| {
        b.iter(|| black_box(context.dynamic_cast_op().unwrap()))
    });
}

fn bench_first_resolution(c: &mut Criterion) {
    c.bench_function("resolve dynamic_cast on fresh context", |b| {
        b.iter(|| {
            let context = NativeContext::new(EchoResolver);
            black_box(context.dynamic_cast_op().unwrap())
        })
    });
}

fn bench_dynamic_cast_invoke(c: &mut Criterion) {
    let context = NativeContext::new(EchoResolver);
    let op = context.dynamic_cast_op().unwrap();

    c.bench_function("invoke dynamic_cast", |b| {
        b.iter(|| {
            black_box(op.execute_cast(
                Address::from_raw(0x100),
                Address::from_raw(0x1),
                Address::from_raw(0x2),
                0,
            ))
        })
    });
}

criterion_group!(
    benches,
    bench_cached_op_request,
    bench_first_resolution,
    bench_dynamic_cast_invoke
);
criterion_main!(benches);
