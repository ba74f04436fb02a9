//! # streamexpr
//!
//! Evaluation core of a formula language used to compute derived columns over
//! streamed, grouped tabular data (e.g. an analytics dashboard). Formulas
//! reference row fields (`${field}`) and a library of scalar and aggregate
//! functions. A formula is configured once into a reusable [`Function`] tree,
//! then driven row-by-row through [`Generator`]s that can be read back at any
//! point, merged across independent partitions, and paused/resumed through
//! state serialization.
//!
//! ## Quick start
//!
//! ```rust
//! use streamexpr::{Function, Param, Val};
//!
//! // min(${val}) with ${val} resolved to slot 0 by an external field resolver
//! let func = Function::build(
//!     "min",
//!     vec![Param::Function(Function::field("val", 0))],
//! ).unwrap();
//!
//! let mut gen = func.create_generator();
//! gen.set(&[Val::Double(300.0)]);
//! gen.set(&[Val::Double(180.0)]);
//! assert_eq!(gen.eval().to_double(), Some(180.0));
//!
//! // Progressive readback: keep feeding rows after eval().
//! gen.set(&[Val::Double(13.0)]);
//! assert_eq!(gen.eval().to_double(), Some(13.0));
//! ```

pub mod streamexpr;

pub use crate::streamexpr::error::{ExprError, ExprResult};
pub use crate::streamexpr::expr::function::{Function, Param};
pub use crate::streamexpr::expr::generator::Generator;
pub use crate::streamexpr::expr::key::Key;
pub use crate::streamexpr::values::Val;
