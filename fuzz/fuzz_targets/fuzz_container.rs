#![no_main]

//! Fuzz target for binding registration and resolution
//!
//! Drives arbitrary sequences of container operations over a fixed set of
//! described types. Every operation must return a value or an error; none
//! may panic.

use arbitrary::Arbitrary;
use kiln::{Container, Parameters, TypeSpec, Value};
use libfuzzer_sys::fuzz_target;

const TYPE_COUNT: u8 = 8;

/// Operations to perform on the container
#[derive(Debug, Arbitrary)]
enum ContainerOp {
    Bind { id: u8 },
    BindSingleton { id: u8 },
    /// Bind id to its successor type (successors implement predecessors,
    /// and the chain is acyclic, so forging always terminates)
    BindAlias { id: u8 },
    BindInstance { id: u8, payload: u32 },
    BindUnsupported { id: u8, flag: bool },
    Make { id: u8 },
    MakeWithOverride { id: u8, tag: u32 },
    Has { id: u8 },
    Get { id: u8 },
    Split { ids: Vec<u8> },
    Expel { ids: Vec<u8> },
    Len,
}

fn name(id: u8) -> String {
    format!("svc{}", id % TYPE_COUNT)
}

fn describe_types(container: &Container) {
    let types = container.types().expect("default registry");
    for id in 0..TYPE_COUNT {
        let mut spec = TypeSpec::concrete(name(id)).constructor(move |_| Ok(id));
        if id > 0 {
            // Each type satisfies its predecessor's contract
            spec = spec.implements(name(id - 1));
        }
        types.insert(spec);
    }
}

fuzz_target!(|ops: Vec<ContainerOp>| {
    let container = Container::new();
    describe_types(&container);

    for op in ops {
        match op {
            ContainerOp::Bind { id } => {
                let _ = container.bind(&name(id));
            }
            ContainerOp::BindSingleton { id } => {
                if let Ok(binding) = container.bind(&name(id)) {
                    let _ = binding.singleton();
                }
            }
            ContainerOp::BindAlias { id } => {
                let id = id % (TYPE_COUNT - 1);
                let _ = container.bind_to(&name(id), Value::from(name(id + 1)));
            }
            ContainerOp::BindInstance { id, payload } => {
                let target = name(id);
                let _ = container.bind_to(&target, Value::object(target.as_str(), payload));
            }
            ContainerOp::BindUnsupported { id, flag } => {
                // Must fail, never panic
                assert!(container.bind_to(&name(id), Value::from(flag)).is_err());
            }
            ContainerOp::Make { id } => {
                let _ = container.make(&name(id), Parameters::new(), &[]);
            }
            ContainerOp::MakeWithOverride { id, tag } => {
                let mut parameters = Parameters::new();
                parameters.insert("tag", i64::from(tag));
                let _ = container.make(&name(id), parameters, &[]);
            }
            ContainerOp::Has { id } => {
                let bound = container.has([name(id)]);
                assert_eq!(bound, container.contains(&name(id)));
            }
            ContainerOp::Get { id } => {
                if let Ok(descriptor) = container.get(&name(id)) {
                    assert_eq!(descriptor.interface().as_str(), name(id));
                }
            }
            ContainerOp::Split { ids } => {
                let names: Vec<String> = ids.iter().map(|id| name(*id)).collect();
                let refs: Vec<&str> = names.iter().map(String::as_str).collect();
                let copy = container.split(&refs);
                assert!(copy.len() <= container.len());
            }
            ContainerOp::Expel { ids } => {
                let names: Vec<String> = ids.iter().map(|id| name(*id)).collect();
                let refs: Vec<&str> = names.iter().map(String::as_str).collect();
                let copy = container.expel(&refs);
                assert!(copy.len() <= container.len());
            }
            ContainerOp::Len => {
                assert_eq!(container.is_empty(), container.len() == 0);
            }
        }
    }
});
