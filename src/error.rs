//! Error types for binding registration and instance forging

use thiserror::Error;

/// Errors that can occur while registering bindings or forging instances
#[derive(Error, Debug, Clone)]
pub enum ContainerError {
    /// Lookup of an interface with no current binding, or a type name the
    /// introspector cannot describe
    #[error("unknown interface: {interface}")]
    NotFound {
        interface: String,
    },

    /// A binding or factory registration with an unsupported shape
    #[error("invalid binding for {interface}: {reason}")]
    InvalidBinding {
        interface: String,
        reason: String,
    },

    /// The resolver could not satisfy a required parameter
    #[error("cannot resolve parameter `{parameter}` of {owner}")]
    UnresolvedDependency {
        owner: String,
        parameter: String,
    },

    /// Instantiation ran but the result failed its post-condition, or the
    /// target is not an instantiable type
    #[error("cannot forge {target}: {reason}")]
    Forge {
        target: String,
        reason: String,
    },
}

impl ContainerError {
    /// Create a NotFound error for an interface name
    #[inline]
    pub fn not_found(interface: impl Into<String>) -> Self {
        Self::NotFound {
            interface: interface.into(),
        }
    }

    /// Create an InvalidBinding error
    #[inline]
    pub fn invalid_binding(interface: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidBinding {
            interface: interface.into(),
            reason: reason.into(),
        }
    }

    /// Create an UnresolvedDependency error naming the offending parameter
    #[inline]
    pub fn unresolved(owner: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::UnresolvedDependency {
            owner: owner.into(),
            parameter: parameter.into(),
        }
    }

    /// Create a Forge error
    #[inline]
    pub fn forge(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Forge {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for container operations
pub type Result<T> = std::result::Result<T, ContainerError>;
