//! Aggregation operations and their accumulated state.
//!
//! Each aggregate generator owns one [`AggState`] driven by one [`AggOp`].
//! State is deliberately separated from the operation so snapshots carry only
//! data; the operation is re-supplied by the function tree on restore.
//!
//! All states support a cross-partition [`AggState::merge`]. Counting, sum,
//! min, max, average, variance, standard deviation and distinct-count merge
//! commutatively and associatively. Joining is the documented exception: it
//! is row-order-sensitive, and merge appends the other partition's parts
//! after this one's.

use crate::streamexpr::error::{ExprError, ExprResult};
use crate::streamexpr::expr::key::Key;
use crate::streamexpr::values::Val;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An aggregation operation. Configuration (e.g. the joining delimiter) is
/// validated once at build time and carried here.
#[derive(Debug, Clone, PartialEq)]
pub enum AggOp {
    /// Number of rows observed
    Count,
    /// Number of distinct child group keys recorded
    CountGroups,
    Sum,
    Min,
    Max,
    Average,
    /// Sample variance (n - 1 denominator)
    Variance,
    /// Sample standard deviation
    StDev,
    /// Number of distinct rendered values
    Distinct,
    /// Delimiter-joined concatenation of rendered values, in arrival order
    Joining { delimiter: String },
}

impl AggOp {
    pub fn name(&self) -> &'static str {
        match self {
            AggOp::Count => "count",
            AggOp::CountGroups => "countGroups",
            AggOp::Sum => "sum",
            AggOp::Min => "min",
            AggOp::Max => "max",
            AggOp::Average => "average",
            AggOp::Variance => "variance",
            AggOp::StDev => "stDev",
            AggOp::Distinct => "distinct",
            AggOp::Joining { .. } => "joining",
        }
    }

    pub fn initial_state(&self) -> AggState {
        match self {
            AggOp::Count => AggState::Count { n: 0 },
            AggOp::CountGroups => AggState::Keys {
                keys: HashSet::new(),
            },
            AggOp::Sum | AggOp::Min | AggOp::Max => AggState::Fold { current: None },
            AggOp::Average => AggState::Average { sum: 0.0, n: 0 },
            AggOp::Variance | AggOp::StDev => AggState::Welford {
                n: 0,
                mean: 0.0,
                m2: 0.0,
            },
            AggOp::Distinct => AggState::Distinct {
                seen: HashSet::new(),
            },
            AggOp::Joining { .. } => AggState::Joining { parts: Vec::new() },
        }
    }

    /// The numeric combiner for fold-style aggregations.
    fn fold(&self, cur: f64, val: f64) -> f64 {
        match self {
            AggOp::Sum => cur + val,
            AggOp::Min => cur.min(val),
            AggOp::Max => cur.max(val),
            _ => val,
        }
    }
}

/// Accumulated aggregation state. Serializable as-is for snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AggState {
    Count { n: u64 },
    Keys { keys: HashSet<Key> },
    Fold { current: Option<Val> },
    Average { sum: f64, n: u64 },
    Welford { n: u64, mean: f64, m2: f64 },
    Distinct { seen: HashSet<String> },
    Joining { parts: Vec<String> },
}

impl AggState {
    /// Folds one observed value in. Values that cannot take part (e.g. a
    /// non-numeric string fed to `sum`) are skipped rather than erroring, so
    /// one bad row never poisons an aggregate.
    pub fn accumulate(&mut self, op: &AggOp, value: &Val) {
        match self {
            AggState::Count { n } => *n += 1,
            AggState::Keys { .. } => {}
            AggState::Fold { current } => {
                if value.to_double().is_some() {
                    *current = match current.take() {
                        // First observation keeps its original type
                        None => Some(value.clone()),
                        Some(cur) => {
                            // cur came through this same path, so it coerces
                            let c = cur.to_double().unwrap_or_default();
                            let v = value.to_double().unwrap_or_default();
                            Some(Val::Double(op.fold(c, v)))
                        }
                    };
                }
            }
            AggState::Average { sum, n } => {
                if let Some(x) = value.to_double() {
                    *sum += x;
                    *n += 1;
                }
            }
            AggState::Welford { n, mean, m2 } => {
                if let Some(x) = value.to_double() {
                    *n += 1;
                    let delta = x - *mean;
                    *mean += delta / *n as f64;
                    *m2 += delta * (x - *mean);
                }
            }
            AggState::Distinct { seen } => {
                if value.has_value() {
                    if let Some(s) = value.to_string_value() {
                        seen.insert(s);
                    }
                }
            }
            AggState::Joining { parts } => {
                if let Some(s) = value.to_string_value() {
                    parts.push(s);
                }
            }
        }
    }

    /// Records a contributing child group key. Only `countGroups` state
    /// reacts; everything else ignores keys.
    pub fn add_key(&mut self, key: &Key) {
        if let AggState::Keys { keys } = self {
            keys.insert(key.clone());
        }
    }

    /// Current result of the aggregation. Reading never consumes state, so
    /// readback stays idempotent and accumulation can continue afterwards.
    pub fn eval(&self, op: &AggOp) -> Val {
        match self {
            AggState::Count { n } => Val::Long(*n as i64),
            AggState::Keys { keys } => Val::Long(keys.len() as i64),
            AggState::Fold { current } => current.clone().unwrap_or(Val::Null),
            AggState::Average { sum, n } => {
                if *n == 0 {
                    Val::Null
                } else {
                    Val::Double(sum / *n as f64)
                }
            }
            AggState::Welford { n, m2, .. } => {
                if *n < 2 {
                    return Val::Null;
                }
                let variance = m2 / (*n - 1) as f64;
                match op {
                    AggOp::StDev => Val::Double(variance.sqrt()),
                    _ => Val::Double(variance),
                }
            }
            AggState::Distinct { seen } => Val::Long(seen.len() as i64),
            AggState::Joining { parts } => {
                let delimiter = match op {
                    AggOp::Joining { delimiter } => delimiter.as_str(),
                    _ => "",
                };
                Val::String(parts.join(delimiter))
            }
        }
    }

    /// Combines another partition's state into this one. Both states must
    /// have the same shape (they were built from identical function trees).
    pub fn merge(&mut self, op: &AggOp, other: AggState) -> ExprResult<()> {
        match (self, other) {
            (AggState::Count { n }, AggState::Count { n: n2 }) => {
                *n += n2;
                Ok(())
            }
            (AggState::Keys { keys }, AggState::Keys { keys: k2 }) => {
                keys.extend(k2);
                Ok(())
            }
            (AggState::Fold { current }, AggState::Fold { current: c2 }) => {
                if let Some(v2) = c2 {
                    *current = match current.take() {
                        None => Some(v2),
                        Some(cur) => {
                            let c = cur.to_double().unwrap_or_default();
                            let v = v2.to_double().unwrap_or_default();
                            Some(Val::Double(op.fold(c, v)))
                        }
                    };
                }
                Ok(())
            }
            (AggState::Average { sum, n }, AggState::Average { sum: s2, n: n2 }) => {
                *sum += s2;
                *n += n2;
                Ok(())
            }
            (
                AggState::Welford { n, mean, m2 },
                AggState::Welford {
                    n: n2,
                    mean: mean2,
                    m2: m2_2,
                },
            ) => {
                // Parallel combination of Welford states (Chan et al.)
                if n2 > 0 {
                    if *n == 0 {
                        *n = n2;
                        *mean = mean2;
                        *m2 = m2_2;
                    } else {
                        let n1 = *n as f64;
                        let nb = n2 as f64;
                        let total = n1 + nb;
                        let delta = mean2 - *mean;
                        *mean += delta * nb / total;
                        *m2 += m2_2 + delta * delta * n1 * nb / total;
                        *n += n2;
                    }
                }
                Ok(())
            }
            (AggState::Distinct { seen }, AggState::Distinct { seen: s2 }) => {
                seen.extend(s2);
                Ok(())
            }
            (AggState::Joining { parts }, AggState::Joining { parts: p2 }) => {
                parts.extend(p2);
                Ok(())
            }
            _ => Err(ExprError::state(
                "cannot merge aggregation states of different shapes",
            )),
        }
    }
}
