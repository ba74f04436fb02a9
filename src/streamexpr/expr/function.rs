//! Function tree configuration: catalog lookup, static validation, and
//! constant folding.
//!
//! A [`Function`] is the configured, reusable form of a formula expression.
//! Building one performs every check that can be done without row data:
//! arity, literal regex compilation, hash algorithm and time zone lookup,
//! and rejection of nested aggregation. Scalar sub-trees whose parameters
//! are all literals are folded to constants at build time, so per-row
//! evaluation never recomputes them.

use crate::streamexpr::error::{ExprError, ExprResult};
use crate::streamexpr::expr::aggregate::AggOp;
use crate::streamexpr::expr::cache::{cached_formatter, cached_regex, lookup_zone};
use crate::streamexpr::expr::generator::Generator;
use crate::streamexpr::expr::scalar::ScalarOp;
use crate::streamexpr::values::Val;

/// A parameter supplied to [`Function::build`]: either a literal value or a
/// nested function.
#[derive(Debug, Clone)]
pub enum Param {
    Val(Val),
    Function(Function),
}

/// A configured formula expression node. Immutable once built; any number of
/// [`Generator`]s can be created from it.
#[derive(Debug, Clone)]
pub enum Function {
    /// A literal or a folded scalar sub-tree
    Constant { value: Val },
    /// A `${field}` reference resolved to a row slot
    Field { name: String, index: usize },
    Scalar { op: ScalarOp, params: Vec<Function> },
    Aggregate { op: AggOp, params: Vec<Function> },
}

impl Function {
    /// Looks up `name` in the catalog and configures it with `params`.
    pub fn build(name: &str, params: Vec<Param>) -> ExprResult<Function> {
        let params: Vec<Function> = params
            .into_iter()
            .map(|p| match p {
                Param::Val(value) => Function::Constant { value },
                Param::Function(f) => f,
            })
            .collect();

        let function = match name {
            "count" => build_aggregate(name, AggOp::Count, params, 0, 0)?,
            "countGroups" => build_aggregate(name, AggOp::CountGroups, params, 0, 0)?,
            "sum" => build_aggregate(name, AggOp::Sum, params, 1, usize::MAX)?,
            "min" => build_aggregate(name, AggOp::Min, params, 1, usize::MAX)?,
            "max" => build_aggregate(name, AggOp::Max, params, 1, usize::MAX)?,
            "average" | "mean" => build_aggregate(name, AggOp::Average, params, 1, usize::MAX)?,
            "variance" => build_aggregate(name, AggOp::Variance, params, 1, usize::MAX)?,
            "stDev" => build_aggregate(name, AggOp::StDev, params, 1, usize::MAX)?,
            "distinct" => build_aggregate(name, AggOp::Distinct, params, 1, usize::MAX)?,
            "joining" => build_joining(params)?,
            _ => build_scalar(name, params)?,
        };
        log::debug!("configured formula {}", function.to_formula_string());
        Ok(function)
    }

    /// A `${field}` reference. The index is the row slot assigned by the
    /// caller's field resolver.
    pub fn field(name: impl Into<String>, index: usize) -> Function {
        Function::Field {
            name: name.into(),
            index,
        }
    }

    pub fn constant(value: Val) -> Function {
        Function::Constant { value }
    }

    /// True when this tree accumulates across rows anywhere within it.
    pub fn has_aggregate(&self) -> bool {
        match self {
            Function::Constant { .. } | Function::Field { .. } => false,
            Function::Scalar { params, .. } => params.iter().any(Function::has_aggregate),
            Function::Aggregate { .. } => true,
        }
    }

    /// True only when this node is itself an accumulator.
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Function::Aggregate { .. })
    }

    /// Creates a fresh generator with empty accumulation state.
    pub fn create_generator(&self) -> Generator {
        match self {
            Function::Constant { value } => Generator::constant(value.clone()),
            Function::Field { index, .. } => Generator::field(*index),
            Function::Scalar { op, params } => {
                Generator::scalar(op, params.iter().map(Function::create_generator).collect())
            }
            Function::Aggregate { op, params } => Generator::aggregate(
                op.clone(),
                params.iter().map(Function::create_generator).collect(),
            ),
        }
    }

    /// Renders this tree back to formula text.
    pub fn to_formula_string(&self) -> String {
        let mut out = String::new();
        self.append(&mut out);
        out
    }

    fn append(&self, out: &mut String) {
        match self {
            Function::Constant { value } => value.append_literal(out),
            Function::Field { name, .. } => {
                out.push_str("${");
                out.push_str(name);
                out.push('}');
            }
            Function::Scalar { op, params } => {
                if op.is_operator() {
                    out.push('(');
                    for (i, p) in params.iter().enumerate() {
                        if i > 0 {
                            out.push_str(op.name());
                        }
                        p.append(out);
                    }
                    out.push(')');
                } else {
                    out.push_str(op.name());
                    out.push('(');
                    for (i, p) in params.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        p.append(out);
                    }
                    out.push(')');
                }
            }
            Function::Aggregate { op, params } => {
                out.push_str(op.name());
                out.push('(');
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    p.append(out);
                }
                if let AggOp::Joining { delimiter } = op {
                    if !delimiter.is_empty() {
                        out.push_str(", ");
                        Val::String(delimiter.clone()).append_literal(out);
                    }
                }
                out.push(')');
            }
        }
    }

    fn literal(&self) -> Option<&Val> {
        match self {
            Function::Constant { value } => Some(value),
            _ => None,
        }
    }
}

fn check_arity(name: &str, actual: usize, min: usize, max: usize) -> ExprResult<()> {
    if actual < min || actual > max {
        return Err(ExprError::arity(name, min, max, actual));
    }
    Ok(())
}

fn build_aggregate(
    name: &str,
    op: AggOp,
    params: Vec<Function>,
    min: usize,
    max: usize,
) -> ExprResult<Function> {
    check_arity(name, params.len(), min, max)?;
    reject_nested_aggregates(name, &params)?;
    Ok(Function::Aggregate { op, params })
}

fn build_joining(mut params: Vec<Function>) -> ExprResult<Function> {
    check_arity("joining", params.len(), 1, 2)?;
    let delimiter = if params.len() == 2 {
        match params.pop() {
            Some(Function::Constant {
                value: Val::String(s),
            }) => s,
            _ => {
                return Err(ExprError::configuration(
                    "joining",
                    "string expected as second parameter",
                ));
            }
        }
    } else {
        String::new()
    };
    reject_nested_aggregates("joining", &params)?;
    Ok(Function::Aggregate {
        op: AggOp::Joining { delimiter },
        params,
    })
}

fn reject_nested_aggregates(name: &str, params: &[Function]) -> ExprResult<()> {
    if params.iter().any(Function::has_aggregate) {
        return Err(ExprError::configuration(
            name,
            "nested aggregation is not allowed",
        ));
    }
    Ok(())
}

fn build_scalar(name: &str, params: Vec<Function>) -> ExprResult<Function> {
    let op = match name {
        "+" => ScalarOp::Add,
        "-" => ScalarOp::Subtract,
        "*" => ScalarOp::Multiply,
        "/" => ScalarOp::Divide,
        "%" => ScalarOp::Modulo,
        "=" | "equals" => ScalarOp::Equals,
        "!=" | "notEquals" => ScalarOp::NotEquals,
        ">" | "greaterThan" => ScalarOp::GreaterThan,
        ">=" | "greaterThanOrEqualTo" => ScalarOp::GreaterThanOrEqualTo,
        "<" | "lessThan" => ScalarOp::LessThan,
        "<=" | "lessThanOrEqualTo" => ScalarOp::LessThanOrEqualTo,
        "not" => ScalarOp::Not,
        "if" => ScalarOp::If,
        "concat" => ScalarOp::Concat,
        "upperCase" => ScalarOp::UpperCase,
        "lowerCase" => ScalarOp::LowerCase,
        "stringLength" => ScalarOp::StringLength,
        "substring" => ScalarOp::Substring,
        "substringBefore" => ScalarOp::SubstringBefore,
        "substringAfter" => ScalarOp::SubstringAfter,
        "indexOf" => ScalarOp::IndexOf,
        "replace" => ScalarOp::Replace,
        "decode" => ScalarOp::Decode {
            literal_tests: decode_literal_tests(&params),
        },
        "include" => ScalarOp::Include,
        "exclude" => ScalarOp::Exclude,
        "match" => ScalarOp::Match,
        "hash" => ScalarOp::Hash,
        "toInteger" => ScalarOp::ToInteger,
        "toLong" => ScalarOp::ToLong,
        "toDouble" => ScalarOp::ToDouble,
        "toString" => ScalarOp::ToString,
        "parseDate" => ScalarOp::ParseDate,
        "formatDate" => ScalarOp::FormatDate,
        _ => return Err(ExprError::unknown_function(name)),
    };

    let (min, max) = op.arity();
    check_arity(op.name(), params.len(), min, max)?;
    validate(&op, &params)?;

    // Uniform constant folding: scalar operations are pure, so an
    // all-literal sub-tree evaluates once at configuration time.
    if params.iter().all(|p| p.literal().is_some()) {
        let vals: Vec<Val> = params
            .iter()
            .filter_map(|p| p.literal().cloned())
            .collect();
        let value = op.evaluator().evaluate(&vals);
        return Ok(Function::Constant { value });
    }

    Ok(Function::Scalar { op, params })
}

/// Which decode test positions were authored as literals. Tests sit at
/// parameter positions 1, 3, 5, ... ahead of the trailing default.
fn decode_literal_tests(params: &[Function]) -> Vec<bool> {
    if params.len() < 4 {
        return Vec::new();
    }
    params[1..params.len() - 1]
        .chunks(2)
        .map(|pair| pair[0].literal().is_some())
        .collect()
}

/// Parameters in configuration positions (positions, patterns, algorithms,
/// date patterns) must be pure per-row expressions, never accumulators.
fn reject_aggregate_args(function: &str, params: &[Function]) -> ExprResult<()> {
    if params.iter().any(Function::has_aggregate) {
        return Err(ExprError::configuration(
            function,
            "argument must not be an aggregating function",
        ));
    }
    Ok(())
}

/// Function-specific static checks: aggregate-safety of configuration
/// positions and validation of literal parameters.
fn validate(op: &ScalarOp, params: &[Function]) -> ExprResult<()> {
    match op {
        ScalarOp::Substring
        | ScalarOp::SubstringBefore
        | ScalarOp::SubstringAfter
        | ScalarOp::IndexOf
        | ScalarOp::Decode { .. }
        | ScalarOp::Include
        | ScalarOp::Exclude
        | ScalarOp::Match
        | ScalarOp::Hash
        | ScalarOp::ParseDate
        | ScalarOp::FormatDate
        | ScalarOp::Replace => reject_aggregate_args(op.name(), &params[1..])?,
        _ => {}
    }
    match op {
        ScalarOp::If => {
            if let Some(condition) = params[0].literal() {
                if condition.to_boolean().is_none() {
                    return Err(ExprError::configuration(
                        "if",
                        "expecting a condition as the first parameter",
                    ));
                }
            }
        }
        ScalarOp::Replace => {
            if let Some(pattern) = params[1].literal() {
                compile_literal_pattern("replace", pattern, false)?;
            }
        }
        ScalarOp::Decode { .. } => {
            if params.len() % 2 != 0 {
                return Err(ExprError::configuration(
                    "decode",
                    "expects an even number of parameters: input, test/result pairs, default",
                ));
            }
            for pair in params[1..params.len() - 1].chunks(2) {
                if let Some(test) = pair[0].literal() {
                    compile_literal_pattern("decode", test, true)?;
                }
            }
        }
        ScalarOp::Include | ScalarOp::Exclude => {
            for p in &params[1..] {
                if let Some(pattern) = p.literal() {
                    compile_literal_pattern(op.name(), pattern, true)?;
                }
            }
        }
        ScalarOp::Match => {
            if let Some(pattern) = params[1].literal() {
                compile_literal_pattern("match", pattern, true)?;
            }
        }
        ScalarOp::Hash => {
            if let Some(algorithm) = params.get(1).and_then(|p| p.literal()) {
                let name = algorithm.to_string().to_ascii_uppercase().replace('-', "");
                if !matches!(name.as_str(), "SHA224" | "SHA256" | "SHA384" | "SHA512") {
                    return Err(ExprError::configuration(
                        "hash",
                        format!("unsupported hash algorithm '{}'", algorithm),
                    ));
                }
            }
        }
        ScalarOp::ParseDate | ScalarOp::FormatDate => {
            let zone = params
                .get(2)
                .and_then(|p| p.literal())
                .and_then(Val::to_string_value);
            if let Some(zone) = &zone {
                lookup_zone(op.name(), zone)?;
            }
            if let Some(pattern) = params.get(1).and_then(|p| p.literal()) {
                let zone = zone.unwrap_or_else(|| "UTC".to_string());
                cached_formatter(op.name(), &pattern.to_string(), &zone)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn compile_literal_pattern(function: &str, pattern: &Val, reject_empty: bool) -> ExprResult<()> {
    let text = pattern.to_string_value().unwrap_or_default();
    if reject_empty && text.is_empty() {
        return Err(ExprError::configuration(
            function,
            "regex pattern must not be empty",
        ));
    }
    cached_regex(function, &text).map(|_| ())
}
