//! Step-chain evaluation pipeline shared by scalar operations.
//!
//! An [`Evaluator`] is built once per generator and applied to the evaluated
//! child values on every row. Steps run in the order they were added; the
//! first step to produce a value wins. An exhausted chain is a fault, which
//! surfaces as a `Val::Error` naming the function.

use crate::streamexpr::values::Val;
use std::fmt;

type Step = Box<dyn Fn(&[Val]) -> Option<Val> + Send + Sync>;

pub struct Evaluator {
    name: String,
    steps: Vec<Step>,
}

impl Evaluator {
    pub fn builder(name: impl Into<String>) -> EvaluatorBuilder {
        EvaluatorBuilder {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Applies the steps to the child values in order, returning the first
    /// produced value.
    pub fn evaluate(&self, values: &[Val]) -> Val {
        for step in &self.steps {
            if let Some(val) = step(values) {
                return val;
            }
        }
        Val::Error(format!(
            "No value after {} evaluation steps in function {}",
            self.steps.len(),
            self.name
        ))
    }
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("name", &self.name)
            .field("steps", &self.steps.len())
            .finish()
    }
}

pub struct EvaluatorBuilder {
    name: String,
    steps: Vec<Step>,
}

impl EvaluatorBuilder {
    /// Adds a custom step mapping the child values to an optional result.
    pub fn step<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Val]) -> Option<Val> + Send + Sync + 'static,
    {
        self.steps.push(Box::new(f));
        self
    }

    /// Short-circuits with the first `Error` among the child values.
    pub fn error_on_first_error(self) -> Self {
        self.step(|values| values.iter().find(|v| v.is_error()).cloned())
    }

    /// Short-circuits with an `Error` if any child value is `Null`.
    pub fn error_on_first_null(self) -> Self {
        self.step(|values| {
            values
                .iter()
                .find(|v| v.is_null())
                .map(|_| Val::Error("All values must be non-null".to_string()))
        })
    }

    /// Single-operand string transformation. The mapper receives `None` for
    /// an absent input and decides whether that maps to a string or stays
    /// absent (`None` result becomes `Null`).
    pub fn string_mapper<F>(self, f: F) -> Self
    where
        F: Fn(Option<&str>) -> Option<String> + Send + Sync + 'static,
    {
        self.step(move |values| {
            let input = values[0].to_string_value();
            match f(input.as_deref()) {
                Some(s) => Some(Val::String(s)),
                None => Some(Val::Null),
            }
        })
    }

    pub fn build(self) -> Evaluator {
        Evaluator {
            name: self.name,
            steps: self.steps,
        }
    }
}
