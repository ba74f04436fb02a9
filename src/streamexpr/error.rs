//! Error types for formula configuration and state handling.
//!
//! These errors cover the *setup* phase: building a function tree from a
//! name and parameters, and restoring generator state from a snapshot.
//! Faults that happen while evaluating a row are not errors in this sense;
//! they flow through the tree as [`Val::Error`](crate::Val) values.

use std::fmt;

/// Error produced while configuring a function tree or restoring state.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprError {
    /// No function with the requested name exists in the catalog
    UnknownFunction { name: String },
    /// The function exists but was given the wrong number of parameters
    Arity {
        function: String,
        min: usize,
        max: usize,
        actual: usize,
    },
    /// A parameter failed a function-specific static check
    Configuration { function: String, message: String },
    /// A state snapshot could not be written, read, or merged
    State { message: String },
}

impl ExprError {
    pub fn unknown_function(name: impl Into<String>) -> Self {
        ExprError::UnknownFunction { name: name.into() }
    }

    pub fn arity(function: impl Into<String>, min: usize, max: usize, actual: usize) -> Self {
        ExprError::Arity {
            function: function.into(),
            min,
            max,
            actual,
        }
    }

    pub fn configuration(function: impl Into<String>, message: impl Into<String>) -> Self {
        ExprError::Configuration {
            function: function.into(),
            message: message.into(),
        }
    }

    pub fn state(message: impl Into<String>) -> Self {
        ExprError::State {
            message: message.into(),
        }
    }
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprError::UnknownFunction { name } => {
                write!(f, "Unknown function: {}", name)
            }
            ExprError::Arity {
                function,
                min,
                max,
                actual,
            } => {
                if min == max {
                    write!(
                        f,
                        "Function {} requires {} parameter{}, got {}",
                        function,
                        min,
                        if *min == 1 { "" } else { "s" },
                        actual
                    )
                } else if *max == usize::MAX {
                    write!(
                        f,
                        "Function {} requires at least {} parameter{}, got {}",
                        function,
                        min,
                        if *min == 1 { "" } else { "s" },
                        actual
                    )
                } else {
                    write!(
                        f,
                        "Function {} requires between {} and {} parameters, got {}",
                        function, min, max, actual
                    )
                }
            }
            ExprError::Configuration { function, message } => {
                write!(f, "Function {}: {}", function, message)
            }
            ExprError::State { message } => {
                write!(f, "State error: {}", message)
            }
        }
    }
}

impl std::error::Error for ExprError {}

/// Result type for configuration and state operations.
pub type ExprResult<T> = Result<T, ExprError>;
