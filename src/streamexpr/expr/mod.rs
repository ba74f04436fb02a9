//! Expression configuration and execution.
//!
//! [`function`] turns a name plus parameters into a validated, reusable
//! tree; [`generator`] runs that tree over rows. The remaining modules are
//! the machinery both lean on: the scalar catalog, aggregation states, the
//! step-chain evaluator, group keys, and the process-wide pattern caches.

pub mod aggregate;
pub mod cache;
pub mod evaluator;
pub mod function;
pub mod generator;
pub mod key;
pub mod scalar;
