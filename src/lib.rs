//! # Kiln - Name-Keyed Service Forging for Rust
//!
//! An inversion-of-control container that binds interface names to concrete
//! implementations and forges object graphs on demand by walking declared
//! parameter lists.
//!
//! ## Features
//!
//! - **Name-keyed bindings** - interfaces are addressed by normalized names,
//!   so a binding can be swapped without touching its consumers
//! - **Recursive forging** - constructor dependencies resolve through the
//!   container, bound or not (auto-wiring)
//! - **Singleton lifecycle** - first forged instance cached per container,
//!   invalidated on re-bind
//! - **Factories** - callables with declared parameter and return metadata
//! - **Partial overrides** - per-call parameters override pre-bound ones by
//!   position or name
//! - **Enforced optionals** - optional class-typed parameters are left to
//!   their defaults unless explicitly enforced
//! - **Split/expel** - carve independent container copies that still share
//!   cached singleton instances
//! - **Observable** - optional `tracing` integration with JSON or pretty
//!   output
//!
//! ## Quick Start
//!
//! Rust has no runtime constructor reflection, so forgeable types are
//! described explicitly in the container's [`TypeRegistry`]:
//!
//! ```rust
//! use kiln::{params, Container, ContainerError, ParamSpec, TypeSpec};
//! use std::sync::Arc;
//!
//! struct Database {
//!     dsn: String,
//! }
//!
//! struct UserRepo {
//!     db: Arc<Database>,
//! }
//!
//! let container = Container::new();
//! let types = container.types().unwrap();
//!
//! types.insert(
//!     TypeSpec::concrete("app::database")
//!         .param(ParamSpec::required("dsn"))
//!         .constructor(|args| {
//!             Ok(Database {
//!                 dsn: args[0].as_str().unwrap_or_default().to_string(),
//!             })
//!         }),
//! );
//! types.insert(
//!     TypeSpec::concrete("app::user_repo")
//!         .param(ParamSpec::required("db").of_type("app::database"))
//!         .constructor(|args| {
//!             let db = args[0]
//!                 .instance_of::<Database>()
//!                 .ok_or_else(|| ContainerError::forge("app::user_repo", "db argument"))?;
//!             Ok(UserRepo { db })
//!         }),
//! );
//!
//! container
//!     .bind("app::database")
//!     .unwrap()
//!     .singleton()
//!     .with_parameters(params! { "dsn" => "postgres://localhost" });
//!
//! // Never bound itself - auto-wired, with its database dependency
//! // resolved through the container
//! let repo = container.forge("app::user_repo").unwrap();
//! let repo = repo.as_object().unwrap().downcast::<UserRepo>().unwrap();
//! assert_eq!(repo.db.dsn, "postgres://localhost");
//! ```
//!
//! ## Parameter precedence
//!
//! For each parameter of a forged constructor or callable, the first match
//! wins: explicit value by position, explicit value by name, required
//! class-typed dependency (resolved through the container when bound,
//! auto-wired when not), enforced optional dependency, declared default.
//! Anything left unresolved fails, naming the parameter and its owner.
//!
//! ## Concurrency
//!
//! All operations are synchronous. Concurrent `make` calls against a
//! fully-bound container are safe; the singleton check-then-cache race is
//! settled so the first constructed instance wins. Concurrent re-binding is
//! memory-safe but not coordinated - callers needing bind/make interleaving
//! across threads should serialize binds themselves.

mod container;
mod descriptor;
mod error;
mod key;
#[cfg(feature = "logging")]
pub mod logging;
mod options;
mod provider;
mod reflect;
mod resolver;
mod storage;
mod value;

pub use container::*;
pub use descriptor::*;
pub use error::*;
pub use key::*;
pub use options::*;
pub use provider::*;
pub use reflect::*;
pub use value::*;

// Re-export tracing macros for convenience when logging is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Callable, Container, ContainerError, Key, Object, Options, ParamSpec, Parameters,
        Provider, Result, TypeIntrospector, TypeRegistry, TypeSpec, Value,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Config {
        options: Options,
    }

    struct Pool {
        size: i64,
    }

    struct Store {
        pool: Arc<Pool>,
    }

    struct Api {
        store: Arc<Store>,
    }

    fn describe_chain(container: &Container) {
        let types = container.types().unwrap();
        types.insert(
            TypeSpec::concrete("pool")
                .param(ParamSpec::optional("size", 4))
                .constructor(|args| {
                    Ok(Pool {
                        size: args[0].as_int().unwrap_or(4),
                    })
                }),
        );
        types.insert(
            TypeSpec::concrete("store")
                .param(ParamSpec::required("pool").of_type("pool"))
                .constructor(|args| {
                    let pool = args[0]
                        .instance_of::<Pool>()
                        .ok_or_else(|| ContainerError::forge("store", "pool argument"))?;
                    Ok(Store { pool })
                }),
        );
        types.insert(
            TypeSpec::concrete("api")
                .param(ParamSpec::required("store").of_type("store"))
                .constructor(|args| {
                    let store = args[0]
                        .instance_of::<Store>()
                        .ok_or_else(|| ContainerError::forge("api", "store argument"))?;
                    Ok(Api { store })
                }),
        );
    }

    #[test]
    fn test_three_level_dependency_chain() {
        let container = Container::new();
        describe_chain(&container);

        let api = container.forge("api").unwrap();
        let api = api.as_object().unwrap().downcast::<Api>().unwrap();
        assert_eq!(api.store.pool.size, 4);
    }

    #[test]
    fn test_bound_midpoint_parameters_flow_through_chain() {
        let container = Container::new();
        describe_chain(&container);

        container
            .bind("pool")
            .unwrap()
            .singleton()
            .with_parameters(params! { "size" => 32 });

        let api = container.forge("api").unwrap();
        let api = api.as_object().unwrap().downcast::<Api>().unwrap();
        assert_eq!(api.store.pool.size, 32);

        // The chain reused the cached pool singleton
        let pool = container.forge("pool").unwrap();
        let pool = pool.as_object().unwrap().downcast::<Pool>().unwrap();
        assert!(Arc::ptr_eq(&api.store.pool, &pool));
    }

    #[test]
    fn test_provider_wires_options_driven_bindings() {
        let mut options = Options::new();
        options.set("database.pool.size", 16);

        let container = Container::new();
        describe_chain(&container);
        container.types().unwrap().insert(
            TypeSpec::concrete("config").constructor(|_| {
                Ok(Config {
                    options: Options::new(),
                })
            }),
        );

        let wire = move |container: &Container| -> Result<()> {
            let size = options
                .get("database.pool.size")
                .and_then(Value::as_int)
                .unwrap_or(4);
            container
                .bind("pool")?
                .singleton()
                .with_parameters(params! { "size" => size });
            container.bind("config")?;
            Ok(())
        };

        container.register([&wire as &dyn Provider]).unwrap();

        let pool = container.forge("pool").unwrap();
        let pool = pool.as_object().unwrap().downcast::<Pool>().unwrap();
        assert_eq!(pool.size, 16);

        let config = container.forge("config").unwrap();
        let config = config.as_object().unwrap().downcast::<Config>().unwrap();
        assert!(config.options.as_map().is_empty());
    }

    #[test]
    fn test_split_copy_keeps_serving_while_original_rebinds() {
        let container = Container::new();
        describe_chain(&container);

        container.bind("pool").unwrap().singleton();
        let original = container.forge("pool").unwrap();
        let original = original.as_object().unwrap().downcast::<Pool>().unwrap();

        let copy = container.split(&[]);
        container
            .bind("pool")
            .unwrap()
            .with_parameters(params! { "size" => 99 });

        // The copy still serves the shared cached singleton
        let copied = copy.forge("pool").unwrap();
        let copied = copied.as_object().unwrap().downcast::<Pool>().unwrap();
        assert!(Arc::ptr_eq(&original, &copied));

        // The original rebind forged fresh with the new parameters
        let rebound = container.forge("pool").unwrap();
        let rebound = rebound.as_object().unwrap().downcast::<Pool>().unwrap();
        assert_eq!(rebound.size, 99);
    }

    #[test]
    fn test_call_level_enforcement_on_unbound_type() {
        struct Audit {
            pool: Option<Arc<Pool>>,
        }

        let container = Container::new();
        describe_chain(&container);
        container.types().unwrap().insert(
            TypeSpec::concrete("audit")
                .param(ParamSpec::optional("pool", Value::Null).of_type("pool"))
                .constructor(|args| {
                    Ok(Audit {
                        pool: args[0].instance_of::<Pool>(),
                    })
                }),
        );

        let bare = container.forge("audit").unwrap();
        let bare = bare.as_object().unwrap().downcast::<Audit>().unwrap();
        assert!(bare.pool.is_none());

        let enforced = container
            .make("audit", Parameters::new(), &["pool"])
            .unwrap();
        let enforced = enforced.as_object().unwrap().downcast::<Audit>().unwrap();
        assert!(enforced.pool.is_some());
    }
}
