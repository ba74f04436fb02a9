//! Formula evaluation core: value model, function/param contract, generator
//! execution protocol, and the shared evaluation pipeline.

pub mod error;
pub mod expr;
pub mod values;
