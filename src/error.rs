//! Error types of the condition compiler.

use crate::ast::Operator;
use thiserror::Error;

/// Failure of one compile call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("Entity not found in logical model: {0}")]
    EntityNotFound(String),
    #[error("Attribute '{attribute}' not found in entity '{entity}'")]
    AttributeNotFound { entity: String, attribute: String },
    #[error("{operator:?} expects {expected} value(s), found {found}")]
    MissingOperand {
        operator: Operator,
        expected: usize,
        found: usize,
    },
    #[error("{operator:?} takes {expected} value(s), got {found}")]
    TooManyOperands {
        operator: Operator,
        expected: usize,
        found: usize,
    },
    #[error("{operator:?} needs a literal value, got '{operand}'")]
    UnsupportedOperand { operator: Operator, operand: String },
    #[error("Malformed condition list: {0}")]
    Structural(#[from] StructuralError),
}

/// The item sequence does not describe a boolean expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("item {index} should be a {expected}")]
    NotAlternating { index: usize, expected: &'static str },
    #[error("junction '{junction}' at item {index} has no operand on one side")]
    DanglingJunction { index: usize, junction: String },
    #[error("junction '{junction}' found where a condition was expected")]
    MisplacedJunction { junction: String },
    #[error("{remaining} items never resolved up to level {level}")]
    Unresolved { remaining: usize, level: usize },
    #[error("condition list nested deeper than {max_depth} levels")]
    TooDeep { max_depth: usize },
}

/// Loading of the model configuration failed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file does not exist: {0}")]
    Missing(String),
    #[error("Unable to read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to parse configuration file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The preview renderer met a tree it cannot print.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("Parameter {0} is not bound in the variable table")]
    UnboundParameter(String),
}
