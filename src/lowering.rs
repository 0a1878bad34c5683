//! Lowers one atomic condition into a leaf filter node.
//!
//! ```text
//! lower()
//!   ├─ sanitize values   sentinel markers, arrays, attribute / subquery operands
//!   ├─ dispatch on the effective operator
//!   │    ├─ EQUAL_TO      coerce to column type, bind        → Binary  =
//!   │    ├─ ONE_OF        bind every element                 → Binary  IN
//!   │    ├─ BETWEEN       bind both bounds                   → Trinary BETWEEN
//!   │    ├─ LIKE family   inline quoted pattern              → Binary  LIKE
//!   │    ├─ NULL                                             → Unary   IS NULL
//!   │    └─ LESS/GREATER  bind                               → Binary  < <= > >=
//!   └─ apply negation    is_not only, shape untouched
//! ```

use crate::ast::{Condition, ConditionValue, Operator, SqlType, Value};
use crate::config::{CompilerConfig, Dialect, SentinelMarkers};
use crate::error::CompileError;
use crate::filter::{Expression, FilterNode, FilterOp, VariableTable};
use crate::model::QueryContext;
use crate::resolver::{ExpressionResolver, ResolvedAttribute};
use tracing::{debug, warn};

/// A condition value after the sentinel pre-pass.
#[derive(Debug, Clone, PartialEq)]
enum Operand {
    /// Becomes a bound parameter.
    Value(Value),
    /// Used in place, never bound.
    Expr(Expression),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sentinel {
    Null,
    EmptyString,
    NullString,
}

/// Turns conditions into leaf nodes, binding literals into a variable table.
///
/// Parameter names are `prefix + counter`; the counter lives as long as the
/// handler, so one handler never hands out the same name twice.
#[derive(Debug, Clone)]
pub struct ConditionLowering {
    dialect: Dialect,
    parameter_prefix: String,
    markers: SentinelMarkers,
    resolver: ExpressionResolver,
    counter: usize,
}

impl ConditionLowering {
    pub fn new(config: &CompilerConfig) -> Self {
        Self {
            dialect: config.dialect,
            parameter_prefix: config.parameter_prefix.clone(),
            markers: config.markers.clone(),
            resolver: ExpressionResolver::new(),
            counter: 0,
        }
    }

    /// Lowers `condition` applied to `target`.
    ///
    /// `ctx` is only consulted for values that reference another attribute.
    pub fn lower(
        &mut self,
        target: &ResolvedAttribute,
        condition: &Condition,
        ctx: &mut QueryContext,
        vars: &mut VariableTable,
    ) -> Result<FilterNode, CompileError> {
        let (operator, operands) = self.sanitize(condition, ctx)?;
        let expr = target.expr.clone();

        let mut node = match operator {
            Operator::EqualTo => {
                let operand = Self::take_one(operator, operands)?;
                let value = match operand {
                    Operand::Value(value) => {
                        let value = coerce(value, target.sql_type);
                        let time = matches!(value, Value::Time(_));
                        let param = self.bind(value, vars);

                        if time && self.dialect == Dialect::MySql {
                            Expression::Literal(format!("time({})", param))
                        } else {
                            param
                        }
                    }
                    Operand::Expr(other) => other,
                };
                FilterNode::binary(expr, value, FilterOp::Eq)
            }
            Operator::OneOf => {
                if operands.is_empty() {
                    return Err(CompileError::MissingOperand {
                        operator,
                        expected: 1,
                        found: 0,
                    });
                }

                let subquery = match operands.as_slice() {
                    [Operand::Expr(Expression::Subquery(sql))] => Some(sql.clone()),
                    _ => None,
                };
                let list = match subquery {
                    Some(sql) => Expression::Subquery(sql),
                    None => {
                        let params: Vec<String> = operands
                            .into_iter()
                            .map(|operand| self.operand_expr(operand, vars).to_string())
                            .collect();
                        Expression::Literal(format!("({})", params.join(",")))
                    }
                };
                FilterNode::binary(expr, list, FilterOp::In)
            }
            Operator::Between => {
                let found = operands.len();
                if found > 2 {
                    return Err(CompileError::TooManyOperands {
                        operator,
                        expected: 2,
                        found,
                    });
                }
                let mut operands = operands.into_iter();
                let (Some(low), Some(high)) = (operands.next(), operands.next()) else {
                    return Err(CompileError::MissingOperand {
                        operator,
                        expected: 2,
                        found,
                    });
                };

                let low = self.operand_expr(low, vars);
                let high = self.operand_expr(high, vars);
                FilterNode::trinary(expr, low, high, FilterOp::Between)
            }
            Operator::StartingWith | Operator::Contains | Operator::Like => {
                let operand = Self::take_one(operator, operands)?;
                // patterns are inlined text; a column or subquery has no text to match
                let text = match operand {
                    Operand::Value(value) => value.text(),
                    Operand::Expr(other) => {
                        return Err(CompileError::UnsupportedOperand {
                            operator,
                            operand: other.to_string(),
                        })
                    }
                };
                let pattern = self.escape_pattern(strip_quotes(&text));
                let pattern = match operator {
                    Operator::StartingWith => format!("'{}%'", pattern),
                    Operator::Contains => format!("'%{}%'", pattern),
                    _ => format!("'{}'", pattern),
                };
                FilterNode::binary(expr, Expression::Literal(pattern), FilterOp::Like)
            }
            Operator::Null => FilterNode::unary(expr, FilterOp::IsNull),
            Operator::LessThan | Operator::GreaterThan => {
                let operand = Self::take_one(operator, operands)?;
                let value = self.operand_expr(operand, vars);
                let op = match (operator, condition.equal_inclusive) {
                    (Operator::LessThan, true) => FilterOp::Lte,
                    (Operator::LessThan, false) => FilterOp::Lt,
                    (_, true) => FilterOp::Gte,
                    (_, false) => FilterOp::Gt,
                };
                FilterNode::binary(expr, value, op)
            }
        };

        node.set_not(condition.negated);
        Ok(node)
    }

    /// Applies the sentinel rules and flattens arrays into operands.
    fn sanitize(
        &self,
        condition: &Condition,
        ctx: &mut QueryContext,
    ) -> Result<(Operator, Vec<Operand>), CompileError> {
        let mut operator = condition.operator;
        let mut operands = Vec::with_capacity(condition.values.len());

        for value in &condition.values {
            match value {
                ConditionValue::Literal(value) => {
                    self.push_scalar(value, &mut operator, &mut operands);
                }
                ConditionValue::Array(items) if items.len() == 1 => {
                    self.push_scalar(&items[0], &mut operator, &mut operands);
                }
                ConditionValue::Array(items) => {
                    for item in items {
                        match self.sentinel(item) {
                            Some(marker) => {
                                warn!(?marker, "dropping sentinel marker from multi-value list");
                            }
                            None => operands.push(Operand::Value(item.clone())),
                        }
                    }
                }
                ConditionValue::Attribute(attribute) => {
                    let expr = self.resolver.resolve(attribute, ctx)?;
                    operands.push(Operand::Expr(expr));
                }
                ConditionValue::Subquery(sql) => {
                    operands.push(Operand::Expr(Expression::Subquery(sql.clone())));
                }
            }
        }

        Ok((operator, operands))
    }

    fn push_scalar(&self, value: &Value, operator: &mut Operator, operands: &mut Vec<Operand>) {
        match self.sentinel(value) {
            Some(Sentinel::Null) => *operator = Operator::Null,
            Some(Sentinel::EmptyString) => operands.push(Operand::Value(Value::string(""))),
            Some(Sentinel::NullString) => operands.push(Operand::Value(Value::string("null"))),
            None => operands.push(Operand::Value(value.clone())),
        }
    }

    fn sentinel(&self, value: &Value) -> Option<Sentinel> {
        let text = value.as_str()?;
        if text == self.markers.null {
            Some(Sentinel::Null)
        } else if text == self.markers.empty_string {
            Some(Sentinel::EmptyString)
        } else if text == self.markers.null_string {
            Some(Sentinel::NullString)
        } else {
            None
        }
    }

    /// The single operand of a one-value operator; zero or several is an error.
    fn take_one(operator: Operator, operands: Vec<Operand>) -> Result<Operand, CompileError> {
        let found = operands.len();
        if found > 1 {
            return Err(CompileError::TooManyOperands {
                operator,
                expected: 1,
                found,
            });
        }
        operands.into_iter().next().ok_or(CompileError::MissingOperand {
            operator,
            expected: 1,
            found,
        })
    }

    fn operand_expr(&mut self, operand: Operand, vars: &mut VariableTable) -> Expression {
        match operand {
            Operand::Value(value) => self.bind(value, vars),
            Operand::Expr(expr) => expr,
        }
    }

    /// Registers `value` under a fresh parameter name.
    fn bind(&mut self, value: Value, vars: &mut VariableTable) -> Expression {
        self.counter += 1;
        let name = format!("{}{}", self.parameter_prefix, self.counter);
        debug!(parameter = %name, ?value, "binding parameter");
        vars.insert(name.clone(), value);
        Expression::Variable(name)
    }

    /// Quotes user text for a single-quoted pattern. The result stays inside
    /// the quotes, where `$(...)` is never read as a parameter reference.
    fn escape_pattern(&self, text: &str) -> String {
        let text = if self.dialect == Dialect::MySql {
            text.replace('\\', "\\\\")
        } else {
            text.to_string()
        };
        text.replace('\'', "''")
    }
}

/// Removes one pair of surrounding single quotes.
fn strip_quotes(text: &str) -> &str {
    if text.len() >= 2 && text.starts_with('\'') && text.ends_with('\'') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// Best-effort conversion of an equality literal to the column's type.
///
/// Only boolean, varchar and integer columns coerce; a literal that does not
/// convert is returned unchanged.
fn coerce(value: Value, sql_type: Option<SqlType>) -> Value {
    let target = match sql_type {
        Some(target @ (SqlType::Boolean | SqlType::Varchar | SqlType::Integer)) => target,
        _ => return value,
    };

    let coerced = match (target, &value) {
        (SqlType::Boolean, Value::Boolean(_))
        | (SqlType::Varchar, Value::String(_))
        | (SqlType::Integer, Value::Integer(_)) => Some(value.clone()),
        (SqlType::Boolean, Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "1" => Some(Value::Boolean(true)),
            "false" | "0" => Some(Value::Boolean(false)),
            _ => None,
        },
        (SqlType::Boolean, Value::Integer(n)) if *n == 0 || *n == 1 => Some(Value::Boolean(*n == 1)),
        (SqlType::Varchar, other) => Some(Value::String(other.text())),
        (SqlType::Integer, Value::String(s)) => s.trim().parse().ok().map(Value::Integer),
        (SqlType::Integer, Value::Double(d))
            if d.fract() == 0.0 && *d >= i64::MIN as f64 && *d < i64::MAX as f64 =>
        {
            Some(Value::Integer(*d as i64))
        }
        _ => None,
    };

    coerced.unwrap_or_else(|| {
        debug!(?value, ?target, "keeping literal uncoerced");
        value
    })
}
