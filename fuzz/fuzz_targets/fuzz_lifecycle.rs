#![no_main]

//! Fuzz target for the singleton lifecycle
//!
//! Checks the cache invariants under arbitrary bind/rebind/resolve
//! interleavings: singletons stay identical between resolutions, rebinding
//! drops the cached instance, and copies share cached payloads.

use arbitrary::Arbitrary;
use kiln::{Container, Parameters, TypeSpec};
use libfuzzer_sys::fuzz_target;

const TYPE_COUNT: u8 = 4;

#[derive(Debug, Arbitrary)]
enum LifecycleOp {
    BindSingleton(u8),
    BindTransient(u8),
    Resolve(u8),
    ResolveTwice(u8),
    SplitSharesCache(u8),
}

fn name(id: u8) -> String {
    format!("unit{}", id % TYPE_COUNT)
}

fuzz_target!(|ops: Vec<LifecycleOp>| {
    let container = Container::new();
    let types = container.types().expect("default registry");
    for id in 0..TYPE_COUNT {
        types.insert(TypeSpec::concrete(name(id)).constructor(move |_| Ok(u32::from(id))));
    }

    for op in ops {
        match op {
            LifecycleOp::BindSingleton(id) => {
                container
                    .bind(&name(id))
                    .expect("bind cannot fail for a non-empty name")
                    .singleton();
            }
            LifecycleOp::BindTransient(id) => {
                container
                    .bind(&name(id))
                    .expect("bind cannot fail for a non-empty name");
            }
            LifecycleOp::Resolve(id) => {
                let forged = container
                    .make(&name(id), Parameters::new(), &[])
                    .expect("described types always forge");
                assert!(forged.as_object().is_some());
            }
            LifecycleOp::ResolveTwice(id) => {
                let target = name(id);
                let first = container
                    .make(&target, Parameters::new(), &[])
                    .expect("described types always forge");
                let second = container
                    .make(&target, Parameters::new(), &[])
                    .expect("described types always forge");

                let first = first.as_object().expect("forged values are objects");
                let second = second.as_object().expect("forged values are objects");

                let singleton = container
                    .get(&target)
                    .map(|descriptor| descriptor.is_singleton())
                    .unwrap_or(false);
                if singleton {
                    assert!(first.shares_payload(second));
                }
            }
            LifecycleOp::SplitSharesCache(id) => {
                let target = name(id);
                container
                    .bind(&target)
                    .expect("bind cannot fail for a non-empty name")
                    .singleton();

                let original = container
                    .make(&target, Parameters::new(), &[])
                    .expect("described types always forge");

                let copy = container.split(&[]);
                let copied = copy
                    .make(&target, Parameters::new(), &[])
                    .expect("copies carry the bindings");

                assert!(original
                    .as_object()
                    .expect("forged values are objects")
                    .shares_payload(copied.as_object().expect("forged values are objects")));
            }
        }
    }
});
