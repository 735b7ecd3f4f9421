#![allow(unused)]
extern crate dotvtable;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use dotvtable::prelude::*;
use std::{hint::black_box, sync::Arc};

/// A linear inheritance chain of `depth` classes, each overriding every inherited method and
/// introducing one of its own, all implementing a shared interface
fn build_hierarchy(depth: usize) -> (Arc<TypeRegistry>, TypeDefinitionRc) {
    let registry = Arc::new(TypeRegistry::new());
    let iface = TypeBuilder::interface("Bench", "IVisitor")
        .method(MethodBuilder::abstract_method("Visit0").param(TypeSignature::Object))
        .method(MethodBuilder::abstract_method("Visit1").param(TypeSignature::Object))
        .build(&registry)
        .unwrap();

    let mut current = TypeBuilder::class("Bench", "Level0")
        .implements(iface.identity())
        .method(MethodBuilder::virtual_method("Visit0").param(TypeSignature::Object))
        .method(MethodBuilder::virtual_method("Visit1").param(TypeSignature::Object))
        .build(&registry)
        .unwrap();

    for level in 1..depth {
        let mut builder = TypeBuilder::class("Bench", &format!("Level{}", level))
            .extends(current.identity())
            .method(MethodBuilder::virtual_method(&format!("Visit{}", level + 1)).param(TypeSignature::Object));
        for inherited in 0..=level {
            builder = builder.method(
                MethodBuilder::override_method(&format!("Visit{}", inherited))
                    .param(TypeSignature::Object),
            );
        }
        current = builder.build(&registry).unwrap();
    }

    (registry, current)
}

/// Benchmark cold construction of a deep hierarchy, including every ancestor table
fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("vtable_construction");
    for depth in [4, 16, 64] {
        let (registry, leaf) = build_hierarchy(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                let mut storage = VTableStorage::new(registry.clone());
                let table = storage.get_vtable(black_box(&leaf.identity())).unwrap();
                black_box(table.len())
            });
        });
    }
    group.finish();
}

/// Benchmark projecting a generic definition onto fresh instantiations
fn bench_projection(c: &mut Criterion) {
    let registry = Arc::new(TypeRegistry::new());
    let mut builder = TypeBuilder::class("Bench", "Cache`2").generic_params(2);
    for index in 0..32 {
        builder = builder.method(
            MethodBuilder::virtual_method(&format!("Get{}", index))
                .returns(TypeSignature::GenericParamType(1))
                .param(TypeSignature::GenericParamType(0)),
        );
    }
    let cache = builder.build(&registry).unwrap();

    let mut storage = VTableStorage::new(registry.clone());
    storage.get_vtable(&cache.identity()).unwrap();

    let args = [
        TypeSignature::I4,
        TypeSignature::I8,
        TypeSignature::String,
        TypeSignature::Object,
        TypeSignature::R8,
    ];

    c.bench_function("vtable_projection", |b| {
        b.iter(|| {
            let mut fresh = VTableStorage::new(registry.clone());
            for key in &args {
                for value in &args {
                    let instance = TypeIdentity::instance(cache.token, vec![key.clone(), value.clone()]);
                    black_box(fresh.get_vtable(&instance).unwrap());
                }
            }
        });
    });
}

/// Benchmark warm lookups served from the cache
fn bench_cached_lookup(c: &mut Criterion) {
    let (registry, leaf) = build_hierarchy(16);
    let mut storage = VTableStorage::new(registry.clone());
    storage.get_vtable(&leaf.identity()).unwrap();

    c.bench_function("vtable_cached_lookup", |b| {
        b.iter(|| black_box(storage.get_vtable(black_box(&leaf.identity())).unwrap()));
    });
}

criterion_group!(benches, bench_construction, bench_projection, bench_cached_lookup);
criterion_main!(benches);
