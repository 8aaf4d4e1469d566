//! Unified error types for the idiot-index service.
//!
//! Every fallible operation in the crate returns [`Result`]. The variants are grouped
//! by how callers should react: missing records, rejected input, rejected graph
//! mutations, internal graph faults, and ambient failures (config, database, I/O).

use thiserror::Error;

/// All errors produced by the catalog, the composition graph, and the API layer.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced product does not exist
    #[error("Product {id} not found")]
    ProductNotFound {
        /// The missing product id
        id: i64,
    },

    /// No component edge exists between the given parent and component
    #[error("Product {parent_id} has no component {component_id}")]
    ComponentNotFound {
        /// Parent side of the missing edge
        parent_id: i64,
        /// Component side of the missing edge
        component_id: i64,
    },

    /// A request field is missing, malformed or out of range
    #[error("Invalid {field}: {message}")]
    InvalidArgument {
        /// Name of the offending field
        field: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// Adding the edge would make a product its own (transitive) component
    #[error("Adding component {component_id} to product {parent_id} would create a cycle")]
    CycleDetected {
        /// Candidate parent
        parent_id: i64,
        /// Candidate component
        component_id: i64,
    },

    /// The parent already lists this component
    #[error("Product {parent_id} already has component {component_id}")]
    DuplicateComponent {
        /// Parent product
        parent_id: i64,
        /// Component product
        component_id: i64,
    },

    /// The product is still used as a component and cannot be deleted
    #[error("Product {id} is still used as a component by {parents:?}")]
    ProductInUse {
        /// Product that was to be deleted
        id: i64,
        /// Products that still list it as a component
        parents: Vec<i64>,
    },

    /// The persisted graph violates an invariant (e.g. contains a cycle)
    #[error("Composition graph is corrupted: {message}")]
    GraphCorrupted {
        /// Description of the violation
        message: String,
    },

    /// A traversal went deeper than the configured limit
    #[error("Composition depth exceeds the limit of {limit}")]
    DepthExceeded {
        /// Configured maximum depth
        limit: usize,
    },

    /// Aggregated cost does not fit in a decimal
    #[error("Materials cost of product {product_id} is too large to represent")]
    CostOverflow {
        /// Product whose cost overflowed
        product_id: i64,
    },

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// Shorthand for building an [`Error::InvalidArgument`].
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            message: message.into(),
        }
    }

    /// Returns true for errors caused by the caller rather than by the service.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::ProductNotFound { .. }
                | Self::ComponentNotFound { .. }
                | Self::InvalidArgument { .. }
                | Self::CycleDetected { .. }
                | Self::DuplicateComponent { .. }
                | Self::ProductInUse { .. }
                | Self::DepthExceeded { .. }
                | Self::CostOverflow { .. }
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_names_field() {
        let err = Error::invalid("quantity", "must be greater than zero");
        assert_eq!(err.to_string(), "Invalid quantity: must be greater than zero");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_graph_corrupted_is_not_client_error() {
        let err = Error::GraphCorrupted {
            message: "cycle through 3".to_string(),
        };
        assert!(!err.is_client_error());
    }
}
