//! Input model: the flat, leveled condition list produced by the condition editor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One entry of a hierarchy list.
///
/// The payload `C` is the condition carried by a leaf. The editor hands over
/// `HierarchyItem<ConditionItem>`; after lowering, the tree builder works on
/// `HierarchyItem<FilterNode>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HierarchyItem<C> {
    Condition { level: usize, item: C },
    Junction(JunctionOperator),
}

/// The ordered item sequence as authored in the editor.
pub type HierarchyList = Vec<HierarchyItem<ConditionItem>>;

impl<C> HierarchyItem<C> {
    /// Grouping depth established by explicit parenthesization.
    pub fn level(&self) -> usize {
        match self {
            HierarchyItem::Condition { level, .. } => *level,
            HierarchyItem::Junction(junction) => junction.level,
        }
    }

    pub fn is_junction(&self) -> bool {
        matches!(self, HierarchyItem::Junction(_))
    }

    pub fn as_junction(&self) -> Option<&JunctionOperator> {
        match self {
            HierarchyItem::Junction(junction) => Some(junction),
            HierarchyItem::Condition { .. } => None,
        }
    }

    /// Replaces the condition payload, keeping levels and junctions intact.
    pub fn try_map<D, E, F>(&self, f: F) -> Result<HierarchyItem<D>, E>
    where
        F: FnOnce(&C) -> Result<D, E>,
    {
        Ok(match self {
            HierarchyItem::Condition { level, item } => HierarchyItem::Condition {
                level: *level,
                item: f(item)?,
            },
            HierarchyItem::Junction(junction) => HierarchyItem::Junction(junction.clone()),
        })
    }
}

/// An atomic predicate: which attribute, tested how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionItem {
    pub attribute: AttributeRef,
    pub condition: Condition,
}

/// AND / OR combinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    And,
    Or,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::And => f.write_str("and"),
            Relation::Or => f.write_str("or"),
        }
    }
}

/// Joins the two items adjacent to it in the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JunctionOperator {
    pub level: usize,
    pub relation: Relation,
    #[serde(default)]
    pub negated: bool,
}

impl JunctionOperator {
    pub fn new(relation: Relation, negated: bool, level: usize) -> Self {
        Self {
            level,
            relation,
            negated,
        }
    }

    pub fn and(level: usize) -> Self {
        Self::new(Relation::And, false, level)
    }

    pub fn or(level: usize) -> Self {
        Self::new(Relation::Or, false, level)
    }

    pub fn not_and(level: usize) -> Self {
        Self::new(Relation::And, true, level)
    }

    pub fn not_or(level: usize) -> Self {
        Self::new(Relation::Or, true, level)
    }
}

impl fmt::Display for JunctionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "not {}", self.relation)
        } else {
            write!(f, "{}", self.relation)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidJunction(pub String);

impl fmt::Display for InvalidJunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized junction '{}'", self.0)
    }
}

impl std::error::Error for InvalidJunction {}

/// Parses the rendered junction form at level 0, e.g. `"NOT  And"`.
impl FromStr for JunctionOperator {
    type Err = InvalidJunction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        match normalized.as_str() {
            "and" => Ok(Self::and(0)),
            "or" => Ok(Self::or(0)),
            "not and" => Ok(Self::not_and(0)),
            "not or" => Ok(Self::not_or(0)),
            _ => Err(InvalidJunction(s.to_string())),
        }
    }
}

/// Comparison operators offered by the condition editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    #[default]
    EqualTo,
    OneOf,
    Between,
    StartingWith,
    Contains,
    Like,
    Null,
    LessThan,
    GreaterThan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub operator: Operator,
    #[serde(default)]
    pub values: Vec<ConditionValue>,
    #[serde(default)]
    pub equal_inclusive: bool,
    #[serde(default)]
    pub negated: bool,
}

impl Condition {
    pub fn new(operator: Operator, values: Vec<ConditionValue>) -> Self {
        Self {
            operator,
            values,
            equal_inclusive: false,
            negated: false,
        }
    }

    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn inclusive(mut self) -> Self {
        self.equal_inclusive = true;
        self
    }
}

/// A value slot of a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionValue {
    Literal(Value),
    /// A multi-value slot, e.g. the selection list of ONE_OF.
    Array(Vec<Value>),
    Attribute(AttributeRef),
    Subquery(String),
}

impl From<Value> for ConditionValue {
    fn from(value: Value) -> Self {
        ConditionValue::Literal(value)
    }
}

/// Literal values as entered in the editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    String(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    Date(String),
    Time(String),
    Timestamp(String),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Raw text of the value, without any SQL quoting.
    pub fn text(&self) -> String {
        match self {
            Value::String(s) | Value::Date(s) | Value::Time(s) | Value::Timestamp(s) => s.clone(),
            Value::Integer(n) => n.to_string(),
            Value::Double(d) => d.to_string(),
            Value::Boolean(b) => b.to_string(),
        }
    }
}

/// Declared SQL type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlType {
    Boolean,
    Varchar,
    Integer,
    Double,
    Date,
    Time,
    Timestamp,
}

/// Reference to a field: `entity.attribute`, or a computed expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeRef {
    #[serde(default)]
    pub entity: Option<String>,
    pub attribute: String,
    /// Expression text of a computed reference.
    #[serde(default)]
    pub expression: Option<String>,
    #[serde(default)]
    pub sql_type: Option<SqlType>,
}

impl AttributeRef {
    pub fn new(entity: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            entity: Some(entity.into()),
            attribute: attribute.into(),
            expression: None,
            sql_type: None,
        }
    }

    /// A bare column name with no qualifying entity.
    pub fn column(attribute: impl Into<String>) -> Self {
        Self {
            entity: None,
            attribute: attribute.into(),
            expression: None,
            sql_type: None,
        }
    }

    pub fn expression(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            entity: None,
            attribute: name.into(),
            expression: Some(expression.into()),
            sql_type: None,
        }
    }

    pub fn with_type(mut self, sql_type: SqlType) -> Self {
        self.sql_type = Some(sql_type);
        self
    }
}

impl fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entity {
            Some(entity) => write!(f, "{}.{}", entity, self.attribute),
            None => f.write_str(&self.attribute),
        }
    }
}
