//! Recursive parameter forging
//!
//! Each forging pass is stateless: given a target's parameter list, a value
//! bag and an enforced-name set, it produces a positional argument list or
//! fails naming the parameter it could not satisfy. Recursion depth equals
//! dependency-graph depth; cyclic graphs are not detected and exhaust the
//! stack.

use crate::container::Container;
use crate::error::{ContainerError, Result};
use crate::key::Key;
use crate::reflect::{Callable, ParamSpec, TypeKind};
use crate::value::{Object, Parameters, Value};

#[cfg(feature = "logging")]
use tracing::trace;

/// Forging pass over a target's parameter list, borrowing the container for
/// recursive dependency resolution.
pub(crate) struct Resolver<'a> {
    container: &'a Container,
}

impl<'a> Resolver<'a> {
    #[inline]
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    /// Forge an instance of `name` directly from its type metadata.
    ///
    /// Fails with `NotFound` when the introspector cannot describe the name,
    /// and with `Forge` when the described type is not instantiable.
    pub fn forge_type(
        &self,
        name: &Key,
        parameters: &Parameters,
        enforced: &[String],
    ) -> Result<Object> {
        let spec = self
            .container
            .introspector()
            .describe(name)
            .ok_or_else(|| ContainerError::not_found(name.as_str()))?;

        match spec.kind() {
            TypeKind::Interface => {
                return Err(ContainerError::forge(
                    name.as_str(),
                    "interfaces cannot be instantiated",
                ));
            }
            TypeKind::Abstract => {
                return Err(ContainerError::forge(
                    name.as_str(),
                    "abstract types cannot be instantiated",
                ));
            }
            TypeKind::Concrete => {}
        }

        let Some(construct) = spec.construct() else {
            return Err(ContainerError::forge(
                name.as_str(),
                "no constructor is registered for this type",
            ));
        };

        #[cfg(feature = "logging")]
        trace!(
            target: "kiln",
            ty = name.as_str(),
            params = spec.params().len(),
            "Forging type"
        );

        let args = self.forge_parameters(name.as_str(), spec.params(), parameters, enforced)?;
        construct(&args)
    }

    /// Forge a callable's arguments, then invoke it.
    pub fn forge_callable(
        &self,
        callable: &Callable,
        parameters: &Parameters,
        enforced: &[String],
    ) -> Result<Value> {
        #[cfg(feature = "logging")]
        trace!(
            target: "kiln",
            callable = callable.label(),
            params = callable.params().len(),
            "Forging callable"
        );

        let args = self.forge_parameters(callable.label(), callable.params(), parameters, enforced)?;
        callable.invoke(&args)
    }

    /// Produce a positional argument list for `specs`, applying the
    /// per-parameter precedence: explicit position, explicit name, required
    /// class-typed dependency (bound or auto-wired), enforced optional
    /// dependency, default value. Anything left over is unresolvable.
    pub fn forge_parameters(
        &self,
        owner: &str,
        specs: &[ParamSpec],
        parameters: &Parameters,
        enforced: &[String],
    ) -> Result<Vec<Value>> {
        let mut arguments = Vec::with_capacity(specs.len());

        for (position, param) in specs.iter().enumerate() {
            if let Some(value) = parameters.by_position(position) {
                arguments.push(value.clone());
                continue;
            }

            if let Some(value) = parameters.by_name(param.name()) {
                arguments.push(value.clone());
                continue;
            }

            if let Some(ty) = param.ty() {
                if !param.is_optional() || is_enforced(param, enforced) {
                    arguments.push(self.forge_dependency(ty)?);
                    continue;
                }
            }

            if let Some(default) = param.default() {
                arguments.push(default.clone());
                continue;
            }

            return Err(ContainerError::unresolved(owner, param.name()));
        }

        Ok(arguments)
    }

    /// A class-typed dependency: bound types go through `make`, unbound ones
    /// are auto-wired directly, both with empty parameter and enforced sets.
    fn forge_dependency(&self, ty: &Key) -> Result<Value> {
        if self.container.contains(ty.as_str()) {
            self.container.make(ty.as_str(), Parameters::new(), &[])
        } else {
            self.forge_type(ty, &Parameters::new(), &[]).map(Value::Object)
        }
    }
}

/// An enforced entry matches a parameter by its name or by its declared type
/// name (both case-insensitively).
fn is_enforced(param: &ParamSpec, enforced: &[String]) -> bool {
    enforced.iter().any(|entry| {
        if entry.eq_ignore_ascii_case(param.name()) {
            return true;
        }
        match param.ty() {
            Some(ty) => Key::new(entry) == *ty,
            None => false,
        }
    })
}
