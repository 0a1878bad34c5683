//! Output model: the boolean filter tree handed to the SQL renderer.

use crate::ast::{Relation, Value};
use serde::Serialize;
use std::fmt;

/// An operand of a filter node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Expression {
    /// A (possibly qualified) column, e.g. `orders.status`.
    Field(String),
    /// SQL text emitted verbatim. May embed parameter references.
    Literal(String),
    /// Reference to a bound parameter in the variable table.
    Variable(String),
    Subquery(String),
}

impl Expression {
    pub fn variable_reference(name: &str) -> String {
        format!("$({})", name)
    }

    /// Names of every parameter this expression refers to, in order.
    pub fn variable_refs(&self) -> Vec<&str> {
        match self {
            Expression::Variable(name) => vec![name.as_str()],
            Expression::Literal(text) => scan_variable_refs(text),
            Expression::Field(_) | Expression::Subquery(_) => Vec::new(),
        }
    }

    /// SQL text of the expression with every parameter reference replaced
    /// by `f(name)`. Replacement text is never scanned again.
    pub fn substitute<E>(&self, mut f: impl FnMut(&str) -> Result<String, E>) -> Result<String, E> {
        match self {
            Expression::Variable(name) => f(name),
            Expression::Literal(text) => substitute_variable_refs(text, f),
            Expression::Field(_) | Expression::Subquery(_) => Ok(self.to_string()),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Field(name) => f.write_str(name),
            Expression::Literal(text) => f.write_str(text),
            Expression::Variable(name) => f.write_str(&Expression::variable_reference(name)),
            Expression::Subquery(sql) => write!(f, "({})", sql),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Reference(&'a str),
}

/// Splits SQL text into verbatim text and `$(name)` references.
///
/// Anything inside a single-quoted string literal is text: inlined LIKE
/// patterns carry user data and never hold references. A doubled `''`
/// toggles the quote state twice and so stays inside the literal.
fn segments(text: &str) -> Vec<Segment<'_>> {
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut in_quote = false;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => in_quote = !in_quote,
            b'$' if !in_quote && bytes.get(i + 1) == Some(&b'(') => {
                let after = &text[i + 2..];
                if let Some(end) = after.find(')') {
                    let name = &after[..end];
                    if is_parameter_name(name) {
                        if start < i {
                            segments.push(Segment::Text(&text[start..i]));
                        }
                        segments.push(Segment::Reference(name));
                        i += 2 + end + 1;
                        start = i;
                        continue;
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }

    if start < text.len() {
        segments.push(Segment::Text(&text[start..]));
    }
    segments
}

fn is_parameter_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Finds `$(name)` references in SQL text, outside quoted literals.
pub(crate) fn scan_variable_refs(text: &str) -> Vec<&str> {
    segments(text)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Reference(name) => Some(name),
            Segment::Text(_) => None,
        })
        .collect()
}

/// Rewrites every `$(name)` reference of `text` in one pass.
pub(crate) fn substitute_variable_refs<E>(
    text: &str,
    mut f: impl FnMut(&str) -> Result<String, E>,
) -> Result<String, E> {
    let mut out = String::with_capacity(text.len());
    for segment in segments(text) {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Reference(name) => out.push_str(&f(name)?),
        }
    }
    Ok(out)
}

/// Operators of leaf nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FilterOp {
    Eq,
    In,
    Between,
    Like,
    IsNull,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl FilterOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::In => "IN",
            FilterOp::Between => "BETWEEN",
            FilterOp::Like => "LIKE",
            FilterOp::IsNull => "IS NULL",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A node of the boolean expression tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum FilterNode {
    Unary {
        expr: Expression,
        op: FilterOp,
        is_not: bool,
    },
    Binary {
        expr1: Expression,
        expr2: Expression,
        op: FilterOp,
        is_not: bool,
    },
    Trinary {
        expr1: Expression,
        expr2: Expression,
        expr3: Expression,
        op: FilterOp,
        is_not: bool,
    },
    Set(FilterSet),
}

/// AND / OR over an ordered list of children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterSet {
    pub relation: Relation,
    /// Built from a NOT AND / NOT OR junction.
    pub negated: bool,
    pub children: Vec<FilterNode>,
    pub grouped: bool,
    pub is_not: bool,
}

impl FilterSet {
    pub fn new(relation: Relation, negated: bool) -> Self {
        Self {
            relation,
            negated,
            children: Vec::new(),
            grouped: false,
            is_not: false,
        }
    }
}

impl FilterNode {
    pub fn unary(expr: Expression, op: FilterOp) -> Self {
        FilterNode::Unary {
            expr,
            op,
            is_not: false,
        }
    }

    pub fn binary(expr1: Expression, expr2: Expression, op: FilterOp) -> Self {
        FilterNode::Binary {
            expr1,
            expr2,
            op,
            is_not: false,
        }
    }

    pub fn trinary(expr1: Expression, expr2: Expression, expr3: Expression, op: FilterOp) -> Self {
        FilterNode::Trinary {
            expr1,
            expr2,
            expr3,
            op,
            is_not: false,
        }
    }

    pub fn is_not(&self) -> bool {
        match self {
            FilterNode::Unary { is_not, .. }
            | FilterNode::Binary { is_not, .. }
            | FilterNode::Trinary { is_not, .. } => *is_not,
            FilterNode::Set(set) => set.is_not,
        }
    }

    pub fn set_not(&mut self, not: bool) {
        match self {
            FilterNode::Unary { is_not, .. }
            | FilterNode::Binary { is_not, .. }
            | FilterNode::Trinary { is_not, .. } => *is_not = not,
            FilterNode::Set(set) => set.is_not = not,
        }
    }

    /// The leaf operator, `None` for sets.
    pub fn op(&self) -> Option<FilterOp> {
        match self {
            FilterNode::Unary { op, .. }
            | FilterNode::Binary { op, .. }
            | FilterNode::Trinary { op, .. } => Some(*op),
            FilterNode::Set(_) => None,
        }
    }

    /// Number of operands of a leaf, children count of a set.
    pub fn arity(&self) -> usize {
        match self {
            FilterNode::Unary { .. } => 1,
            FilterNode::Binary { .. } => 2,
            FilterNode::Trinary { .. } => 3,
            FilterNode::Set(set) => set.children.len(),
        }
    }

    pub fn as_set(&self) -> Option<&FilterSet> {
        match self {
            FilterNode::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn operands(&self) -> Vec<&Expression> {
        match self {
            FilterNode::Unary { expr, .. } => vec![expr],
            FilterNode::Binary { expr1, expr2, .. } => vec![expr1, expr2],
            FilterNode::Trinary {
                expr1,
                expr2,
                expr3,
                ..
            } => vec![expr1, expr2, expr3],
            FilterNode::Set(_) => Vec::new(),
        }
    }
}

/// Parameter values bound during one compile pass, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VariableTable {
    entries: Vec<(String, Value)>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a binding. Names come from a per-handler counter and never repeat.
    pub fn insert(&mut self, name: String, value: Value) {
        debug_assert!(self.get(&name).is_none(), "duplicate parameter {}", name);
        self.entries.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_refs_in_literal() {
        let expr = Expression::Literal("($(p1),$(p2),$(p3))".to_string());
        assert_eq!(expr.variable_refs(), vec!["p1", "p2", "p3"]);

        let wrapped = Expression::Literal("time($(p7))".to_string());
        assert_eq!(wrapped.variable_refs(), vec!["p7"]);

        let pattern = Expression::Literal("'$(not a ref)%'".to_string());
        assert!(pattern.variable_refs().is_empty());

        let quoted = Expression::Literal("'%$(p1)%'".to_string());
        assert!(quoted.variable_refs().is_empty());

        let escaped = Expression::Literal("'it''s $(p1)'".to_string());
        assert!(escaped.variable_refs().is_empty());
    }

    #[test]
    fn test_substitute_is_single_pass() {
        let list = Expression::Literal("($(p1),$(p2))".to_string());
        let text = list
            .substitute(|name| -> Result<String, ()> {
                Ok(match name {
                    "p1" => "'$(p2)'".to_string(),
                    _ => "'x'".to_string(),
                })
            })
            .unwrap();
        assert_eq!(text, "('$(p2)','x')");

        let pattern = Expression::Literal("'%$(p1)%'".to_string());
        let text = pattern.substitute(|_| Err("unexpected reference")).unwrap();
        assert_eq!(text, "'%$(p1)%'");

        let variable = Expression::Variable("p3".to_string());
        assert_eq!(variable.substitute(|name| Ok::<_, ()>(name.to_uppercase())), Ok("P3".to_string()));
    }

    #[test]
    fn test_expression_display() {
        assert_eq!(Expression::Field("t.c".into()).to_string(), "t.c");
        assert_eq!(Expression::Variable("p1".into()).to_string(), "$(p1)");
        assert_eq!(Expression::Subquery("select 1".into()).to_string(), "(select 1)");
    }

    #[test]
    fn test_set_not_keeps_shape() {
        let mut node = FilterNode::trinary(
            Expression::Field("a".into()),
            Expression::Variable("p1".into()),
            Expression::Variable("p2".into()),
            FilterOp::Between,
        );
        node.set_not(true);
        assert!(node.is_not());
        assert_eq!(node.arity(), 3);
        assert_eq!(node.op(), Some(FilterOp::Between));
    }

    #[test]
    fn test_variable_table_keeps_registration_order() {
        let mut vars = VariableTable::new();
        vars.insert("p1".to_string(), Value::Integer(1));
        vars.insert("p2".to_string(), Value::string("x"));

        let names: Vec<_> = vars.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["p1", "p2"]);
        assert_eq!(vars.get("p2"), Some(&Value::string("x")));
        assert_eq!(vars.get("p3"), None);
        assert_eq!(vars.len(), 2);
    }
}
