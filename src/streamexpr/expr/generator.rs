//! Row-driven execution of a configured function tree.
//!
//! A [`Generator`] is the mutable counterpart of a
//! [`Function`](crate::Function): it observes rows through [`set`], can be
//! read back at any point with [`eval`], merged with a generator built from
//! the identical function over a disjoint partition, and paused/resumed
//! through [`write`]/[`read`] snapshots.
//!
//! Snapshots are versioned and carry only accumulation state; the tree
//! structure is re-supplied by the function when restoring.
//!
//! [`set`]: Generator::set
//! [`eval`]: Generator::eval
//! [`write`]: Generator::write
//! [`read`]: Generator::read

use crate::streamexpr::error::{ExprError, ExprResult};
use crate::streamexpr::expr::aggregate::{AggOp, AggState};
use crate::streamexpr::expr::evaluator::Evaluator;
use crate::streamexpr::expr::key::Key;
use crate::streamexpr::expr::scalar::ScalarOp;
use crate::streamexpr::values::Val;
use serde::{Deserialize, Serialize};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug)]
pub enum Generator {
    /// Folded constant or literal; ignores rows, merges and keys
    Constant { value: Val },
    /// `${field}` leaf holding the value from the most recent row
    Field { index: usize, current: Val },
    /// Per-row function; stateless apart from its children
    Scalar {
        evaluator: Evaluator,
        children: Vec<Generator>,
    },
    /// Accumulator folding each child's evaluation into its state per row
    Aggregate {
        op: AggOp,
        state: AggState,
        children: Vec<Generator>,
    },
}

impl Generator {
    pub(crate) fn constant(value: Val) -> Generator {
        Generator::Constant { value }
    }

    pub(crate) fn field(index: usize) -> Generator {
        Generator::Field {
            index,
            current: Val::Null,
        }
    }

    pub(crate) fn scalar(op: &ScalarOp, children: Vec<Generator>) -> Generator {
        Generator::Scalar {
            evaluator: op.evaluator(),
            children,
        }
    }

    pub(crate) fn aggregate(op: AggOp, children: Vec<Generator>) -> Generator {
        Generator::Aggregate {
            state: op.initial_state(),
            op,
            children,
        }
    }

    /// Observes one row. A field index beyond the row's length reads as
    /// `Null`, so short rows never fault.
    pub fn set(&mut self, row: &[Val]) {
        match self {
            Generator::Constant { .. } => {}
            Generator::Field { index, current } => {
                *current = row.get(*index).cloned().unwrap_or(Val::Null);
            }
            Generator::Scalar { children, .. } => {
                for child in children {
                    child.set(row);
                }
            }
            Generator::Aggregate {
                op,
                state,
                children,
            } => {
                if children.is_empty() {
                    // count() and countGroups() observe the row itself
                    state.accumulate(op, &Val::Null);
                } else {
                    for child in children.iter_mut() {
                        child.set(row);
                        let val = child.eval();
                        state.accumulate(op, &val);
                    }
                }
            }
        }
    }

    /// Current result. Idempotent: evaluating never consumes state, and
    /// further `set` calls may follow.
    pub fn eval(&self) -> Val {
        match self {
            Generator::Constant { value } => value.clone(),
            Generator::Field { current, .. } => current.clone(),
            Generator::Scalar {
                evaluator,
                children,
            } => {
                let vals: Vec<Val> = children.iter().map(Generator::eval).collect();
                evaluator.evaluate(&vals)
            }
            Generator::Aggregate { op, state, .. } => state.eval(op),
        }
    }

    /// Combines another generator's accumulated state into this one. The
    /// other generator must have been created from the identical function
    /// and observed a disjoint partition of rows.
    pub fn merge(&mut self, other: Generator) -> ExprResult<()> {
        match (self, other) {
            (Generator::Constant { .. }, Generator::Constant { .. }) => Ok(()),
            (Generator::Field { .. }, Generator::Field { .. }) => Ok(()),
            (
                Generator::Scalar {
                    evaluator,
                    children,
                },
                Generator::Scalar {
                    evaluator: other_evaluator,
                    children: other_children,
                },
            ) => {
                if evaluator.name() != other_evaluator.name() {
                    return Err(ExprError::state(
                        "cannot merge generators of different operations",
                    ));
                }
                merge_children(children, other_children)
            }
            (
                Generator::Aggregate {
                    op,
                    state,
                    children,
                },
                Generator::Aggregate {
                    op: other_op,
                    state: other_state,
                    children: other_children,
                },
            ) => {
                if *op != other_op {
                    return Err(ExprError::state(
                        "cannot merge generators of different aggregations",
                    ));
                }
                state.merge(op, other_state)?;
                merge_children(children, other_children)
            }
            _ => Err(ExprError::state(
                "cannot merge generators of different shapes",
            )),
        }
    }

    /// Records a contributing child group key, fanning to children.
    pub fn add_child_key(&mut self, key: &Key) {
        match self {
            Generator::Constant { .. } | Generator::Field { .. } => {}
            Generator::Scalar { children, .. } => {
                for child in children {
                    child.add_child_key(key);
                }
            }
            Generator::Aggregate {
                state, children, ..
            } => {
                state.add_key(key);
                for child in children {
                    child.add_child_key(key);
                }
            }
        }
    }

    /// Serializes the accumulation state to a versioned snapshot.
    pub fn write(&self) -> ExprResult<Vec<u8>> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            state: self.capture(),
        };
        serde_json::to_vec(&snapshot)
            .map_err(|e| ExprError::state(format!("unable to write snapshot: {}", e)))
    }

    /// Restores accumulation state from a snapshot previously produced by
    /// [`write`](Generator::write) on a generator of the identical function.
    pub fn read(&mut self, bytes: &[u8]) -> ExprResult<()> {
        let snapshot: Snapshot = serde_json::from_slice(bytes)
            .map_err(|e| ExprError::state(format!("unable to read snapshot: {}", e)))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(ExprError::state(format!(
                "snapshot version {} is not supported",
                snapshot.version
            )));
        }
        self.restore(snapshot.state)
    }

    fn capture(&self) -> GenState {
        match self {
            Generator::Constant { .. } => GenState::Empty,
            Generator::Field { current, .. } => GenState::Value(current.clone()),
            Generator::Scalar { children, .. } => {
                GenState::Children(children.iter().map(Generator::capture).collect())
            }
            Generator::Aggregate {
                state, children, ..
            } => GenState::Aggregate {
                state: state.clone(),
                children: children.iter().map(Generator::capture).collect(),
            },
        }
    }

    fn restore(&mut self, gen_state: GenState) -> ExprResult<()> {
        match (self, gen_state) {
            (Generator::Constant { .. }, GenState::Empty) => Ok(()),
            (Generator::Field { current, .. }, GenState::Value(value)) => {
                *current = value;
                Ok(())
            }
            (Generator::Scalar { children, .. }, GenState::Children(states)) => {
                restore_children(children, states)
            }
            (
                Generator::Aggregate {
                    state, children, ..
                },
                GenState::Aggregate {
                    state: new_state,
                    children: child_states,
                },
            ) => {
                if std::mem::discriminant(state) != std::mem::discriminant(&new_state) {
                    return Err(ExprError::state(
                        "snapshot does not match this aggregation",
                    ));
                }
                *state = new_state;
                restore_children(children, child_states)
            }
            _ => Err(ExprError::state("snapshot does not match this generator")),
        }
    }
}

fn merge_children(children: &mut [Generator], other: Vec<Generator>) -> ExprResult<()> {
    if children.len() != other.len() {
        return Err(ExprError::state(
            "cannot merge generators of different shapes",
        ));
    }
    for (child, other_child) in children.iter_mut().zip(other) {
        child.merge(other_child)?;
    }
    Ok(())
}

fn restore_children(children: &mut [Generator], states: Vec<GenState>) -> ExprResult<()> {
    if children.len() != states.len() {
        return Err(ExprError::state("snapshot does not match this generator"));
    }
    for (child, state) in children.iter_mut().zip(states) {
        child.restore(state)?;
    }
    Ok(())
}

/// Wire form of a generator's accumulation state.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
enum GenState {
    Empty,
    Value(Val),
    Children(Vec<GenState>),
    Aggregate {
        state: AggState,
        children: Vec<GenState>,
    },
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    state: GenState,
}
